//! Matching wanted base names against the remote index.

use crate::listing::{RemoteFile, RemoteIndex};

/// Wanted names split by availability on the mirror, both in DAT order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Remote files to download.
    pub found: Vec<RemoteFile>,
    /// Wanted names with no remote counterpart.
    pub missing: Vec<String>,
}

impl Reconciliation {
    /// Number of wanted names that were considered.
    #[must_use]
    pub fn wanted(&self) -> usize {
        self.found.len() + self.missing.len()
    }

    /// True when every wanted name was found.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Partitions `wanted` into files present in `index` and names that are not.
///
/// `wanted` is expected to be free of duplicates, as produced by the DAT
/// parser.
#[must_use]
pub fn reconcile(wanted: &[String], index: &RemoteIndex) -> Reconciliation {
    wanted
        .iter()
        .fold(Reconciliation::default(), |mut acc, name| {
            match index.get(name) {
                Some(file) => acc.found.push(file.clone()),
                None => acc.missing.push(name.clone()),
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str) -> RemoteFile {
        RemoteFile {
            name: name.to_string(),
            file: format!("{name}.zip"),
            url: format!("https://m/{name}.zip"),
        }
    }

    fn index_of(names: &[&str]) -> RemoteIndex {
        names.iter().map(|n| ((*n).to_string(), remote(n))).collect()
    }

    fn wanted(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn splits_found_and_missing_in_wanted_order() {
        let index = index_of(&["C", "A"]);
        let result = reconcile(&wanted(&["A", "B", "C", "D"]), &index);

        assert_eq!(result.found, vec![remote("A"), remote("C")]);
        assert_eq!(result.missing, vec!["B", "D"]);
        assert_eq!(result.wanted(), 4);
        assert!(!result.is_complete());
    }

    #[test]
    fn empty_wanted_list() {
        let result = reconcile(&[], &index_of(&["A"]));
        assert!(result.found.is_empty());
        assert!(result.is_complete());
    }

    #[test]
    fn empty_index_marks_everything_missing() {
        let result = reconcile(&wanted(&["A", "B"]), &RemoteIndex::new());
        assert!(result.found.is_empty());
        assert_eq!(result.missing, vec!["A", "B"]);
    }

    #[test]
    fn matching_is_exact() {
        let result = reconcile(&wanted(&["foo"]), &index_of(&["Foo"]));
        assert_eq!(result.missing, vec!["foo"]);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        proptest! {
            #[test]
            fn reconcile_partitions_exactly(
                wanted in proptest::collection::hash_set("[a-e]{1,3}", 0..20),
                remote_names in proptest::collection::vec("[a-e]{1,3}", 0..20),
            ) {
                let wanted: Vec<String> = wanted.into_iter().collect();
                let index: RemoteIndex = remote_names
                    .iter()
                    .map(|n| (n.clone(), remote(n)))
                    .collect();

                let result = reconcile(&wanted, &index);
                prop_assert_eq!(result.found.len() + result.missing.len(), wanted.len());

                let found: HashSet<&str> = result.found.iter().map(|f| f.name.as_str()).collect();
                let missing: HashSet<&str> = result.missing.iter().map(String::as_str).collect();
                prop_assert_eq!(found.len(), result.found.len());
                prop_assert!(found.is_disjoint(&missing));

                let mut cursor = (result.found.iter(), result.missing.iter());
                for name in &wanted {
                    if index.contains_key(name) {
                        prop_assert_eq!(&cursor.0.next().unwrap().name, name);
                    } else {
                        prop_assert_eq!(cursor.1.next().unwrap(), name);
                    }
                }
            }
        }
    }
}
