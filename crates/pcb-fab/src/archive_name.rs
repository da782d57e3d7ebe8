//! Substring rewriting for names vendor portals would otherwise reject.

use log::warn;

/// Upper bound on rewrite passes. A well-formed table converges after one.
pub const MAX_PASSES: usize = 16;

/// Rewrite `name` with `table` until a full pass changes nothing.
///
/// Entries are applied in table order and every occurrence of an entry's
/// pattern is replaced. Iteration stops after [`MAX_PASSES`] even if a
/// table keeps reintroducing its own patterns.
pub fn sanitize_archive_name(name: &str, table: &[(&str, &str)]) -> String {
    let mut name = name.to_string();
    for _ in 0..MAX_PASSES {
        let mut changed = false;
        for (old, new) in table {
            if !old.is_empty() && name.contains(old) {
                name = name.replace(old, new);
                changed = true;
            }
        }
        if !changed {
            return name;
        }
    }
    warn!("Archive name did not settle after {MAX_PASSES} passes: {name}");
    name
}

/// Apply footprint substitutions a vendor needs for part assignment to work.
pub fn sanitize_footprint_name(footprint: &str, table: &[(&str, &str)]) -> String {
    table
        .iter()
        .fold(footprint.to_string(), |acc, (old, new)| acc.replace(old, new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::JLCPCB;

    #[test]
    fn test_reserved_words_replaced() {
        let table = JLCPCB.archive_name_replacements;
        assert_eq!(
            sanitize_archive_name("eval-board-Copy-convert", table),
            "evl-board-cp-cvt"
        );
        assert_eq!(sanitize_archive_name("confirm_copy", table), "cfm_cp");
        assert_eq!(sanitize_archive_name("plain-gerbers", table), "plain-gerbers");
    }

    #[test]
    fn test_fixed_point() {
        let table = JLCPCB.archive_name_replacements;
        for name in ["evaluation-copy", "copycopy", "Copyconfirmeval", ""] {
            let once = sanitize_archive_name(name, table);
            assert_eq!(sanitize_archive_name(&once, table), once);
        }
    }

    #[test]
    fn test_multi_pass_rewrite_settles() {
        // The second entry creates a match for the first one
        let table = [("ab", "x"), ("c", "b")];
        assert_eq!(sanitize_archive_name("acc", &table), "xb");
    }

    #[test]
    fn test_cyclic_table_terminates() {
        let table = [("a", "b"), ("b", "a")];
        let result = sanitize_archive_name("ab", &table);
        assert!(result == "aa" || result == "bb");
    }

    #[test]
    fn test_footprint_sanitized() {
        let table = JLCPCB.footprint_replacements;
        assert_eq!(
            sanitize_footprint_name("Connector:Barrel_Jack_footprint", table),
            "Connector:Barrel_Jack_handprint"
        );
        assert_eq!(sanitize_footprint_name("R_0603", table), "R_0603");
    }
}
