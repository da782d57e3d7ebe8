//! Schematic-derived component records.
//!
//! Components arrive from an external extractor (a JSON list or
//! `kicad-cli sch export bom`). Optional assembly flags are carried by
//! [`AssemblyFlags`] with explicit defaults, so filters never have to probe
//! whether the source knew about a flag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name used for the component value.
pub const FIELD_VALUE: &str = "Value";
/// Field name used for the footprint identifier.
pub const FIELD_FOOTPRINT: &str = "Footprint";

/// Assembly-related flags of a schematic symbol.
///
/// A source that does not know a flag leaves it at its default, which never
/// excludes the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyFlags {
    pub in_bom: bool,
    pub on_board: bool,
    pub dnp: bool,
}

impl Default for AssemblyFlags {
    fn default() -> Self {
        Self {
            in_bom: true,
            on_board: true,
            dnp: false,
        }
    }
}

impl AssemblyFlags {
    /// True if any flag removes the component from assembly.
    pub fn excludes(&self) -> bool {
        !self.in_bom || !self.on_board || self.dnp
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub reference: String,
    #[serde(default = "default_unit")]
    pub unit: u32,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub footprint: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(flatten)]
    pub flags: AssemblyFlags,
}

fn default_unit() -> u32 {
    1
}

impl Component {
    pub fn new(
        reference: impl Into<String>,
        value: impl Into<String>,
        footprint: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            unit: 1,
            value: value.into(),
            footprint: footprint.into(),
            fields: BTreeMap::new(),
            flags: AssemblyFlags::default(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_unit(mut self, unit: u32) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_flags(mut self, flags: AssemblyFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Look up a field by name. `Value` and `Footprint` resolve to the
    /// dedicated attributes.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            FIELD_VALUE => Some(self.value.as_str()),
            FIELD_FOOTPRINT => Some(self.footprint.as_str()),
            _ => self.fields.get(name).map(String::as_str),
        }
    }

    /// Look up a field, treating blank values as absent.
    pub fn non_empty_field(&self, name: &str) -> Option<&str> {
        self.field(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// First non-empty field out of `names`, in priority order.
    pub fn first_non_empty<'a, I, S>(&'a self, names: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .find_map(|name| self.non_empty_field(name.as_ref()))
    }
}

/// Load a JSON array of components.
pub fn load_components(path: &std::path::Path) -> crate::Result<Vec<Component>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
