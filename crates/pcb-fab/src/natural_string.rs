//! Natural ordering of reference designators (C1 < C2 < C10).

use std::cmp::Ordering;

pub fn compare_designators(a: &str, b: &str) -> Ordering {
    natord::compare(a, b)
}

/// Sort designators in place using natural ordering.
pub fn sort_designators<S: AsRef<str>>(designators: &mut [S]) {
    designators.sort_by(|a, b| compare_designators(a.as_ref(), b.as_ref()));
}

/// Sort items by a designator they carry.
pub fn sort_by_designator<T>(items: &mut [T], designator: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| compare_designators(designator(a), designator(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_designators() {
        let mut refs = vec!["U100", "U9", "U10", "U1"];
        sort_designators(&mut refs);
        assert_eq!(refs, vec!["U1", "U9", "U10", "U100"]);
    }

    #[test]
    fn test_prefix_before_number() {
        let mut refs = vec!["R10".to_string(), "R2".into(), "C1".into(), "R1".into()];
        sort_designators(&mut refs);
        assert_eq!(refs, vec!["C1", "R1", "R2", "R10"]);
    }

    #[test]
    fn test_sort_by_designator() {
        let mut rows = vec![("J10", 1), ("J2", 2)];
        sort_by_designator(&mut rows, |row| row.0);
        assert_eq!(rows, vec![("J2", 2), ("J10", 1)]);
    }
}
