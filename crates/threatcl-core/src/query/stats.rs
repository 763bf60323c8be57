//! Corpus-wide aggregates, recomputed from a snapshot on every call

use crate::store::Snapshot;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_threat_models: usize,
    pub total_files: usize,
    pub total_threats: usize,
    pub total_controls: usize,
    pub implemented_controls: usize,
    pub total_information_assets: usize,
    pub total_use_cases: usize,
    pub total_third_party_dependencies: usize,
    pub internet_facing_models: usize,
    /// Models per author, sorted by author
    pub by_author: Vec<(String, usize)>,
    /// Threats per impact category, sorted by category
    pub by_impact: Vec<(String, usize)>,
    /// Threats per STRIDE category, sorted by category
    pub by_stride: Vec<(String, usize)>,
}

impl Stats {
    pub fn collect(snapshot: &Snapshot<'_>) -> Self {
        let mut stats = Stats {
            total_threat_models: snapshot.len(),
            total_files: snapshot.file_count(),
            ..Self::default()
        };
        let mut by_author: BTreeMap<&str, usize> = BTreeMap::new();
        let mut by_impact: BTreeMap<&str, usize> = BTreeMap::new();
        let mut by_stride: BTreeMap<&str, usize> = BTreeMap::new();

        for model in snapshot.iter() {
            *by_author.entry(model.author.as_str()).or_default() += 1;
            stats.total_threats += model.threat_count();
            stats.total_controls += model.control_count();
            stats.implemented_controls += model.implemented_control_count();
            stats.total_information_assets += model.information_assets.len();
            stats.total_use_cases += model.use_cases.len();
            stats.total_third_party_dependencies += model.third_party_dependencies.len();
            if model.is_internet_facing() {
                stats.internet_facing_models += 1;
            }
            for threat in &model.threats {
                for impact in &threat.impacts {
                    *by_impact.entry(impact.as_str()).or_default() += 1;
                }
                for category in &threat.stride {
                    *by_stride.entry(category.as_str()).or_default() += 1;
                }
            }
        }

        stats.by_author = owned(by_author);
        stats.by_impact = owned(by_impact);
        stats.by_stride = owned(by_stride);
        stats
    }
}

fn owned(counts: BTreeMap<&str, usize>) -> Vec<(String, usize)> {
    counts
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_counts() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.hcl"),
            r#"
threatmodel "Alpha" {
  author = "x"
  attributes {
    internet_facing = true
  }
  usecase {
    description = "checkout"
  }
  threat {
    description = "card data leak"
    impacts = ["Confidentiality", "Integrity"]
    stride = ["Info Disclosure"]
    control "Encrypt" {
      implemented = true
    }
    control "Audit" {}
  }
}

threatmodel "Beta" {
  author = "y"
}
"#,
        )
        .unwrap();
        let store = DocumentStore::open(dir.path());
        store.load_all().unwrap();

        let stats = Stats::collect(&store.snapshot());
        assert_eq!(stats.total_threat_models, 2);
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_threats, 1);
        assert_eq!(stats.total_controls, 2);
        assert_eq!(stats.implemented_controls, 1);
        assert_eq!(stats.total_use_cases, 1);
        assert_eq!(stats.internet_facing_models, 1);
        assert_eq!(
            stats.by_author,
            vec![("x".to_string(), 1), ("y".to_string(), 1)]
        );
        assert_eq!(
            stats.by_impact,
            vec![("Confidentiality".to_string(), 1), ("Integrity".to_string(), 1)]
        );
        assert_eq!(stats.by_stride, vec![("Info Disclosure".to_string(), 1)]);
    }

    #[test]
    fn test_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path());
        store.load_all().unwrap();
        assert_eq!(Stats::collect(&store.snapshot()), Stats::default());
    }
}
