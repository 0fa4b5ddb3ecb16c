//! Renderable dendrogram structure.
//!
//! Turns a [`MergeTree`] into what a plotting backend needs: leaves in a
//! non-crossing left-to-right order, the x position and height of every link
//! and a colour group for the tight clusters. Links below
//! `color_threshold_ratio × max height` belong to a group; the topmost
//! sub-threshold link of each branch opens a new group, numbered left to
//! right. Links at or above the threshold are background links without a
//! group. Drawing is left to the consumer.

use crate::linkage::MergeTree;
use crate::{ClusterError, Result};
use serde::{Deserialize, Serialize};

/// Ratio of the maximum merge height under which clusters are coloured.
pub const DEFAULT_COLOR_THRESHOLD_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DendrogramConfig {
    pub color_threshold_ratio: f64,
}

impl Default for DendrogramConfig {
    fn default() -> Self {
        Self {
            color_threshold_ratio: DEFAULT_COLOR_THRESHOLD_RATIO,
        }
    }
}

/// A leaf as placed on the x axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DendrogramLeaf {
    /// Index of the document in the corpus.
    pub index: usize,
    pub label: String,
    pub position: f64,
    pub group: Option<usize>,
}

/// A merge as drawn: an inverted U joining `left` and `right` at `height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DendrogramLink {
    pub cluster_id: usize,
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub size: usize,
    /// x-centre of the link.
    pub position: f64,
    pub group: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    pub title: String,
    pub color_threshold: f64,
    /// Leaves in display order.
    pub leaves: Vec<DendrogramLeaf>,
    /// Links in merge order.
    pub links: Vec<DendrogramLink>,
}

impl Dendrogram {
    /// Lays out `tree` with one label per leaf.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidFormat`] when `tree` is structurally invalid,
    /// [`ClusterError::Config`] when the label count does not match the leaf count.
    pub fn build(
        tree: &MergeTree,
        labels: &[String],
        title: impl Into<String>,
        config: DendrogramConfig,
    ) -> Result<Self> {
        tree.validate()?;
        let n = tree.leaves();
        if labels.len() != n {
            return Err(ClusterError::Config(format!(
                "{} labels for {n} leaves",
                labels.len()
            )));
        }

        let color_threshold = config.color_threshold_ratio * tree.max_height();
        let root = tree
            .root()
            .ok_or_else(|| ClusterError::InvalidFormat("empty merge tree".to_string()))?;
        let order = tree.leaf_members(root);

        // Leaf i of the display order sits at 5 + 10 i.
        let mut positions = vec![0.0; n + tree.merges().len()];
        for (rank, &leaf) in order.iter().enumerate() {
            positions[leaf] = 5.0 + 10.0 * rank as f64;
        }
        for (k, merge) in tree.merges().iter().enumerate() {
            positions[n + k] = (positions[merge.left] + positions[merge.right]) / 2.0;
        }

        let groups = assign_groups(tree, root, color_threshold);

        let leaves = order
            .iter()
            .map(|&leaf| DendrogramLeaf {
                index: leaf,
                label: labels[leaf].clone(),
                position: positions[leaf],
                group: groups[leaf],
            })
            .collect();
        let links = tree
            .merges()
            .iter()
            .enumerate()
            .map(|(k, merge)| DendrogramLink {
                cluster_id: n + k,
                left: merge.left,
                right: merge.right,
                height: merge.height,
                size: merge.size,
                position: positions[n + k],
                group: groups[n + k],
            })
            .collect();

        Ok(Self {
            title: title.into(),
            color_threshold,
            leaves,
            links,
        })
    }

    /// Corpus indices in display order.
    pub fn leaf_order(&self) -> Vec<usize> {
        self.leaves.iter().map(|leaf| leaf.index).collect()
    }

    pub fn group_count(&self) -> usize {
        self.links
            .iter()
            .filter_map(|link| link.group)
            .max()
            .map_or(0, |g| g + 1)
    }
}

/// Group of every node (leaves then merges), walking from the root in
/// left-first pre-order so group ids grow left to right.
fn assign_groups(tree: &MergeTree, root: usize, threshold: f64) -> Vec<Option<usize>> {
    let n = tree.leaves();
    let mut groups = vec![None; n + tree.merges().len()];
    let mut next_group = 0;
    let mut stack = vec![(root, None)];

    while let Some((node, inherited)) = stack.pop() {
        let Some((left, right)) = tree.children(node) else {
            groups[node] = inherited;
            continue;
        };
        let group = inherited.or_else(|| {
            (tree.merges()[node - n].height < threshold).then(|| {
                next_group += 1;
                next_group - 1
            })
        });
        groups[node] = group;
        stack.push((right, group));
        stack.push((left, group));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkage::{Linkage, cluster};
    use crate::similarity::DistanceMatrix;
    use pretty_assertions::assert_eq;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("doc {i}")).collect()
    }

    fn two_pair_tree() -> MergeTree {
        let m = DistanceMatrix::from_rows(vec![
            vec![0.0, 0.9, 0.2, 1.0],
            vec![0.9, 0.0, 1.0, 0.3],
            vec![0.2, 1.0, 0.0, 0.9],
            vec![1.0, 0.3, 0.9, 0.0],
        ])
        .unwrap();
        cluster(&m, Linkage::Average).unwrap()
    }

    #[test]
    fn test_leaf_order_does_not_cross() {
        let tree = two_pair_tree();
        let dendrogram =
            Dendrogram::build(&tree, &labels(4), "Test", DendrogramConfig::default()).unwrap();

        assert_eq!(dendrogram.leaf_order(), vec![0, 2, 1, 3]);
        let positions: Vec<f64> = dendrogram.leaves.iter().map(|l| l.position).collect();
        assert_eq!(positions, vec![5.0, 15.0, 25.0, 35.0]);
        assert_eq!(dendrogram.leaves[1].label, "doc 2");

        // every link sits between its children
        assert_eq!(dendrogram.links[0].position, 10.0);
        assert_eq!(dendrogram.links[1].position, 30.0);
        assert_eq!(dendrogram.links[2].position, 20.0);
    }

    #[test]
    fn test_groups_follow_threshold() {
        let tree = two_pair_tree();
        let dendrogram =
            Dendrogram::build(&tree, &labels(4), "Test", DendrogramConfig::default()).unwrap();

        assert!((dendrogram.color_threshold - 0.6 * 0.95).abs() < 1e-12);
        let link_groups: Vec<_> = dendrogram.links.iter().map(|l| l.group).collect();
        assert_eq!(link_groups, vec![Some(0), Some(1), None]);
        let leaf_groups: Vec<_> = dendrogram.leaves.iter().map(|l| l.group).collect();
        assert_eq!(leaf_groups, vec![Some(0), Some(0), Some(1), Some(1)]);
        assert_eq!(dendrogram.group_count(), 2);
    }

    #[test]
    fn test_singleton_above_threshold_is_ungrouped() {
        let m = DistanceMatrix::from_rows(vec![
            vec![0.0, 0.1, 1.0],
            vec![0.1, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
        ])
        .unwrap();
        let tree = cluster(&m, Linkage::Average).unwrap();
        let dendrogram =
            Dendrogram::build(&tree, &labels(3), "T", DendrogramConfig::default()).unwrap();

        let leaf_groups: Vec<_> = dendrogram.leaves.iter().map(|l| (l.index, l.group)).collect();
        // the root joins leaf 2 (left, lower id) with cluster 3
        assert_eq!(leaf_groups, vec![(2, None), (0, Some(0)), (1, Some(0))]);
    }

    #[test]
    fn test_flat_tree_has_no_groups() {
        let tree = cluster(&DistanceMatrix::zeros(4), Linkage::Ward).unwrap();
        let dendrogram =
            Dendrogram::build(&tree, &labels(4), "T", DendrogramConfig::default()).unwrap();
        assert_eq!(dendrogram.color_threshold, 0.0);
        assert_eq!(dendrogram.group_count(), 0);
        assert_eq!(dendrogram.leaf_order(), vec![3, 2, 0, 1]);
    }

    #[cfg(feature = "json")]
    #[rstest::rstest]
    #[case::empty(r#"{"leaves":0,"merges":[]}"#, 0)]
    #[case::child_out_of_range(
        r#"{"leaves":2,"merges":[{"left":0,"right":7,"height":0.5,"size":2}]}"#,
        2
    )]
    #[case::missing_merge(
        r#"{"leaves":3,"merges":[{"left":0,"right":1,"height":0.5,"size":2}]}"#,
        3
    )]
    fn test_malformed_tree_is_rejected(#[case] json: &str, #[case] leaves: usize) {
        let tree: MergeTree = serde_json::from_str(json).unwrap();
        assert!(matches!(
            Dendrogram::build(&tree, &labels(leaves), "T", DendrogramConfig::default()),
            Err(ClusterError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_label_count_must_match() {
        let tree = two_pair_tree();
        assert!(
            Dendrogram::build(&tree, &labels(3), "T", DendrogramConfig::default()).is_err()
        );
    }
}
