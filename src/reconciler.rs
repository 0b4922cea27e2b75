//! Cluster-to-activity reconciliation
//!
//! Clusterers and topic models emit opaque cluster ids. To score them against
//! ground truth, the training predictions are cross-tabulated with the true
//! activities and every activity claims the cluster it co-occurs with most.
//!
//! This is the greedy argmax assignment, not an optimal bipartite matching.
//! Clusters that no activity claims stay unmapped.

use crate::error::PipelineError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Co-occurrence counts of (activity, cluster id), rows and columns sorted
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable<L> {
    activities: Vec<L>,
    clusters: Vec<usize>,
    counts: Vec<Vec<usize>>,
}

impl<L: Ord + Clone> ContingencyTable<L> {
    /// Cross-tabulate true labels against predicted cluster ids
    pub fn from_assignments(labels: &[L], clusters: &[usize]) -> Result<Self, PipelineError> {
        if labels.len() != clusters.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} labels but {} cluster assignments",
                labels.len(),
                clusters.len()
            )));
        }
        if labels.is_empty() {
            return Err(PipelineError::EmptyInput(
                "no assignments to cross-tabulate".to_string(),
            ));
        }

        let activities: Vec<L> = labels.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        let cluster_ids: Vec<usize> = clusters.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

        let mut counts = vec![vec![0usize; cluster_ids.len()]; activities.len()];
        for (label, cluster) in labels.iter().zip(clusters) {
            // Both searches succeed: the axes were built from these values
            if let (Ok(row), Ok(col)) = (
                activities.binary_search(label),
                cluster_ids.binary_search(cluster),
            ) {
                counts[row][col] += 1;
            }
        }

        Ok(Self {
            activities,
            clusters: cluster_ids,
            counts,
        })
    }

    pub fn activities(&self) -> &[L] {
        &self.activities
    }

    pub fn clusters(&self) -> &[usize] {
        &self.clusters
    }

    /// Count for an (activity, cluster) pair; unseen pairs are zero
    pub fn count(&self, activity: &L, cluster: usize) -> usize {
        match (
            self.activities.binary_search(activity),
            self.clusters.binary_search(&cluster),
        ) {
            (Ok(row), Ok(col)) => self.counts[row][col],
            _ => 0,
        }
    }

    /// Total count of one activity row
    pub fn row_total(&self, activity: &L) -> usize {
        self.activities
            .binary_search(activity)
            .map(|row| self.counts[row].iter().sum())
            .unwrap_or(0)
    }
}

impl<L: fmt::Display> fmt::Display for ContingencyTable<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "activity")?;
        for cluster in &self.clusters {
            write!(f, "\t{cluster}")?;
        }
        for (activity, row) in self.activities.iter().zip(&self.counts) {
            write!(f, "\n{activity}")?;
            for count in row {
                write!(f, "\t{count}")?;
            }
        }
        Ok(())
    }
}

/// Cluster id → activity, derived once from training data
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterActivityMap<L> {
    mapping: BTreeMap<usize, L>,
}

impl<L: Ord + Clone> ClusterActivityMap<L> {
    /// Greedy argmax assignment.
    ///
    /// Each activity claims its highest-count cluster, the lowest cluster id
    /// winning ties. When activities claim the same cluster the larger count
    /// keeps it, and on equal counts the activity sorted first keeps it.
    pub fn from_table(table: &ContingencyTable<L>) -> Self {
        let mut claims: BTreeMap<usize, (usize, L)> = BTreeMap::new();

        for (activity, row) in table.activities.iter().zip(&table.counts) {
            let mut best: Option<(usize, usize)> = None;
            for (col, &count) in row.iter().enumerate() {
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((col, count));
                }
            }
            let Some((col, count)) = best else { continue };
            if count == 0 {
                continue;
            }

            let cluster = table.clusters[col];
            match claims.get(&cluster) {
                Some((held, _)) if *held >= count => {}
                _ => {
                    claims.insert(cluster, (count, activity.clone()));
                }
            }
        }

        Self {
            mapping: claims
                .into_iter()
                .map(|(cluster, (_, activity))| (cluster, activity))
                .collect(),
        }
    }

    pub fn get(&self, cluster: usize) -> Option<&L> {
        self.mapping.get(&cluster)
    }

    /// Translate cluster predictions; unmapped clusters yield `None`
    pub fn apply(&self, predictions: &[usize]) -> Vec<Option<L>> {
        predictions
            .iter()
            .map(|cluster| self.mapping.get(cluster).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_contingency_counts() {
        let labels = ["a", "a", "b", "b", "b"];
        let clusters = [2, 2, 0, 2, 0];
        let table = ContingencyTable::from_assignments(&labels, &clusters).unwrap();

        assert_eq!(table.activities(), &["a", "b"]);
        assert_eq!(table.clusters(), &[0, 2]);
        assert_eq!(table.count(&"a", 2), 2);
        assert_eq!(table.count(&"a", 0), 0);
        assert_eq!(table.count(&"b", 0), 2);
        assert_eq!(table.count(&"b", 9), 0);
        assert_eq!(table.row_total(&"b"), 3);
    }

    #[test]
    fn test_length_mismatch() {
        let result = ContingencyTable::from_assignments(&["a"], &[0, 1]);
        assert!(matches!(result, Err(PipelineError::ShapeMismatch(_))));
    }

    #[test]
    fn test_strict_maximum_maps_cluster() {
        // Activity A peaks strictly in cluster 3
        let labels = ["A", "A", "A", "A", "B", "B", "B"];
        let clusters = [3, 3, 3, 1, 1, 1, 0];
        let table = ContingencyTable::from_assignments(&labels, &clusters).unwrap();
        let map = ClusterActivityMap::from_table(&table);

        assert_eq!(map.get(3), Some(&"A"));
        assert_eq!(map.get(1), Some(&"B"));
        assert_eq!(map.get(0), None);
    }

    #[test]
    fn test_row_tie_picks_lowest_cluster() {
        let labels = ["A", "A", "A", "A"];
        let clusters = [5, 5, 2, 2];
        let table = ContingencyTable::from_assignments(&labels, &clusters).unwrap();
        let map = ClusterActivityMap::from_table(&table);

        assert_eq!(map.get(2), Some(&"A"));
        assert_eq!(map.get(5), None);
    }

    #[test]
    fn test_conflict_goes_to_larger_count() {
        let labels = ["A", "A", "B", "B", "B", "B"];
        let clusters = [0, 0, 0, 0, 0, 1];
        let table = ContingencyTable::from_assignments(&labels, &clusters).unwrap();
        let map = ClusterActivityMap::from_table(&table);

        assert_eq!(map.get(0), Some(&"B"));
        assert_eq!(map.get(1), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_conflict_tie_goes_to_first_activity() {
        let labels = ["A", "B"];
        let clusters = [4, 4];
        let table = ContingencyTable::from_assignments(&labels, &clusters).unwrap();
        let map = ClusterActivityMap::from_table(&table);

        assert_eq!(map.get(4), Some(&"A"));
    }

    #[test]
    fn test_apply_leaves_unmapped_clusters_empty() {
        let table = ContingencyTable::from_assignments(&["A", "B"], &[0, 1]).unwrap();
        let map = ClusterActivityMap::from_table(&table);

        assert_eq!(map.apply(&[1, 0, 7]), vec![Some("B"), Some("A"), None]);
    }

    #[test]
    fn test_display_renders_pivot() {
        let table = ContingencyTable::from_assignments(&["A", "B"], &[0, 1]).unwrap();
        assert_eq!(table.to_string(), "activity\t0\t1\nA\t1\t0\nB\t0\t1");
    }
}
