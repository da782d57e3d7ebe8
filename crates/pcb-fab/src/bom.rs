//! Assembly BOM aggregation.
//!
//! Components pass through a chain of exclusion filters and the survivors are
//! grouped by [`BomKey`]. Groups keep the order in which they were first
//! seen, so the same component list always yields the same BOM.

use std::collections::{BTreeSet, HashMap};
use std::io::Write;

use log::debug;
use serde::Serialize;

use crate::archive_name::sanitize_footprint_name;
use crate::component::Component;
use crate::natural_string::sort_designators;
use crate::Result;

/// Reference prefixes of power symbols and fiducial-like flags.
pub const RESERVED_PREFIXES: &[&str] = &["#PWR", "#FL"];

/// Field listing the variants in which a component is not populated.
pub const DEFAULT_VARIANT_DNP_FIELD: &str = "KIKIT_VARIANT_DNP";

/// Max designators per BOM row. Vendors reject rows well above this.
pub const BOM_CHUNK_SIZE: usize = 100;

pub const BOM_CSV_HEADER: [&str; 4] = ["Comment", "Designator", "Footprint", "LCSC"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BomKey {
    pub value: String,
    pub footprint: String,
    /// `None` when no order-code field was filled in.
    pub order_code: Option<String>,
}

impl BomKey {
    pub fn is_missing_order_code(&self) -> bool {
        self.order_code.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BomGroup {
    #[serde(flatten)]
    pub key: BomKey,
    pub references: Vec<String>,
}

impl BomGroup {
    /// References in natural order, split into rows of at most
    /// [`BOM_CHUNK_SIZE`].
    pub fn chunks(&self) -> Vec<Vec<String>> {
        let mut sorted = self.references.clone();
        sort_designators(&mut sorted);
        sorted
            .chunks(BOM_CHUNK_SIZE)
            .map(<[String]>::to_vec)
            .collect()
    }
}

/// Grouped BOM in first-seen group order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bom {
    groups: Vec<BomGroup>,
    index: HashMap<BomKey, usize>,
}

impl Bom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: BomKey, reference: impl Into<String>) {
        let reference = reference.into();
        match self.index.get(&key) {
            Some(&i) => {
                let references = &mut self.groups[i].references;
                if !references.contains(&reference) {
                    references.push(reference);
                }
            }
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(BomGroup {
                    key,
                    references: vec![reference],
                });
            }
        }
    }

    pub fn groups(&self) -> &[BomGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every reference across all groups.
    pub fn references(&self) -> BTreeSet<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.references.iter().map(String::as_str))
            .collect()
    }

    /// Keep only references that received placement data. Groups left
    /// without references are dropped.
    pub fn retain_placed<S>(&self, placed: &BTreeSet<S>) -> Bom
    where
        S: Ord + std::borrow::Borrow<str>,
    {
        let mut reconciled = Bom::new();
        for group in &self.groups {
            for reference in &group.references {
                if placed.contains(reference.as_str()) {
                    reconciled.insert(group.key.clone(), reference.clone());
                } else {
                    debug!("{reference} has no placement data, dropping it from the BOM");
                }
            }
        }
        reconciled
    }

    /// Groups without a resolved order code.
    pub fn missing_order_code(&self) -> Bom {
        let mut missing = Bom::new();
        for group in self.groups.iter().filter(|g| g.key.is_missing_order_code()) {
            for reference in &group.references {
                missing.insert(group.key.clone(), reference.clone());
            }
        }
        missing
    }

    /// References of groups without a resolved order code, in BOM order.
    pub fn missing_order_code_references(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter(|g| g.key.is_missing_order_code())
            .flat_map(|g| g.references.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BomConfig {
    /// Order-code fields in priority order; the first non-empty one wins.
    pub order_code_fields: Vec<String>,
    /// References excluded explicitly.
    pub ignore: BTreeSet<String>,
    /// Drop components without any order code instead of reporting them.
    pub skip_missing: bool,
    /// Active build variant.
    pub variant: Option<String>,
    /// Vendor-specific "leave this out" field.
    pub ignore_field: String,
    pub variant_dnp_field: String,
}

impl Default for BomConfig {
    fn default() -> Self {
        Self {
            order_code_fields: vec!["LCSC".to_string()],
            ignore: BTreeSet::new(),
            skip_missing: false,
            variant: None,
            ignore_field: "JLCPCB_IGNORE".to_string(),
            variant_dnp_field: DEFAULT_VARIANT_DNP_FIELD.to_string(),
        }
    }
}

/// Why a component did not make it into the BOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    SecondaryUnit,
    ReservedPrefix,
    Ignored,
    VendorIgnore,
    MissingOrderCode,
    AssemblyFlags,
    VariantDnp,
}

impl BomConfig {
    /// First filter of the chain that rejects `component`, if any.
    pub fn exclusion(&self, component: &Component) -> Option<Exclusion> {
        let reference = component.reference.as_str();

        if component.unit != 1 {
            return Some(Exclusion::SecondaryUnit);
        }
        if RESERVED_PREFIXES.iter().any(|p| reference.starts_with(p)) {
            return Some(Exclusion::ReservedPrefix);
        }
        if self.ignore.contains(reference) {
            return Some(Exclusion::Ignored);
        }
        if component.non_empty_field(&self.ignore_field).is_some() {
            return Some(Exclusion::VendorIgnore);
        }
        if self.skip_missing && self.order_code(component).is_none() {
            return Some(Exclusion::MissingOrderCode);
        }
        if component.flags.excludes() {
            return Some(Exclusion::AssemblyFlags);
        }
        if self.is_variant_dnp(component) {
            return Some(Exclusion::VariantDnp);
        }
        None
    }

    pub fn order_code(&self, component: &Component) -> Option<String> {
        component
            .first_non_empty(&self.order_code_fields)
            .map(str::to_string)
    }

    fn is_variant_dnp(&self, component: &Component) -> bool {
        let (Some(variant), Some(dnp_variants)) =
            (&self.variant, component.field(&self.variant_dnp_field))
        else {
            return false;
        };
        dnp_variants.split(',').any(|v| v.trim() == variant.as_str())
    }

    pub fn key(&self, component: &Component) -> BomKey {
        BomKey {
            value: component.value.clone(),
            footprint: component.footprint.clone(),
            order_code: self.order_code(component),
        }
    }
}

/// Filter `components` and group the survivors.
pub fn collect_bom(components: &[Component], config: &BomConfig) -> Bom {
    let mut bom = Bom::new();
    for component in components {
        if let Some(reason) = config.exclusion(component) {
            debug!("Excluding {} from BOM: {reason:?}", component.reference);
            continue;
        }
        bom.insert(config.key(component), component.reference.clone());
    }
    bom
}

/// Write the vendor BOM CSV. Each group becomes one row per chunk of
/// designators.
pub fn write_bom_csv<W: Write>(
    bom: &Bom,
    footprint_replacements: &[(&str, &str)],
    writer: W,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(BOM_CSV_HEADER)?;
    for group in bom.groups() {
        let footprint = sanitize_footprint_name(&group.key.footprint, footprint_replacements);
        let order_code = group.key.order_code.as_deref().unwrap_or("");
        for chunk in group.chunks() {
            csv.write_record([
                group.key.value.as_str(),
                chunk.join(",").as_str(),
                footprint.as_str(),
                order_code,
            ])?;
        }
    }
    csv.flush()?;
    Ok(())
}

/// Write a left-aligned table of groups (value, footprint, references).
pub fn write_unassigned_report<W: Write>(bom: &Bom, mut writer: W) -> std::io::Result<()> {
    for group in bom.groups() {
        writeln!(
            writer,
            "{:<40} {:<60} {}",
            group.key.value,
            group.key.footprint,
            group.references.join(",")
        )?;
    }
    writer.flush()
}
