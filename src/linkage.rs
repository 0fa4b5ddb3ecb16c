//! Agglomerative hierarchical clustering over a precomputed distance matrix.
//!
//! Starting from one cluster per document, the two closest clusters are merged
//! until a single cluster remains. After each merge the distance from the new
//! cluster to every other cluster is derived with the Lance–Williams
//! recurrence of the chosen [`Linkage`]:
//!
//! ```text
//! average: d(k, i∪j) = (n_i d(k,i) + n_j d(k,j)) / (n_i + n_j)
//! ward:    d(k, i∪j) = sqrt(((n_i+n_k) d(k,i)² + (n_j+n_k) d(k,j)² - n_k d(i,j)²)
//!                           / (n_i + n_j + n_k))
//! ```
//!
//! # Tie-breaking
//!
//! When several pairs share the minimum distance, the pair whose smallest
//! member leaves `(a, b)` with `a < b` is lexicographically smallest is merged
//! first. On an all-zero matrix the merges are therefore
//! `(0, 1), (2, N), (3, N + 1), …`.
//!
//! # Example
//!
//! ```
//! use bibcluster::linkage::{cluster, Linkage};
//! use bibcluster::similarity::DistanceMatrix;
//!
//! let matrix = DistanceMatrix::from_rows(vec![
//!     vec![0.0, 0.1, 0.9],
//!     vec![0.1, 0.0, 0.8],
//!     vec![0.9, 0.8, 0.0],
//! ]).unwrap();
//!
//! let tree = cluster(&matrix, Linkage::Average).unwrap();
//! assert_eq!((tree.merges()[0].left, tree.merges()[0].right), (0, 1));
//! assert!((tree.merges()[1].height - 0.85).abs() < 1e-12);
//! ```

use crate::similarity::DistanceMatrix;
use crate::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule for the distance between two clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Mean of all pairwise leaf distances (UPGMA).
    Average,
    /// Minimum increase of within-cluster variance.
    Ward,
}

impl Linkage {
    /// Title-cased name, as shown on rendered dendrograms.
    pub fn display_name(&self) -> &'static str {
        match self {
            Linkage::Average => "Average",
            Linkage::Ward => "Ward",
        }
    }

    /// Distance from cluster `k` to the union of `i` and `j`.
    fn update(&self, d_ki: f64, d_kj: f64, d_ij: f64, n_i: f64, n_j: f64, n_k: f64) -> f64 {
        match self {
            Linkage::Average => (n_i * d_ki + n_j * d_kj) / (n_i + n_j),
            Linkage::Ward => {
                let numerator = (n_i + n_k) * d_ki * d_ki + (n_j + n_k) * d_kj * d_kj
                    - n_k * d_ij * d_ij;
                (numerator.max(0.0) / (n_i + n_j + n_k)).sqrt()
            }
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linkage::Average => write!(f, "average"),
            Linkage::Ward => write!(f, "ward"),
        }
    }
}

impl FromStr for Linkage {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "average" => Ok(Linkage::Average),
            "ward" => Ok(Linkage::Ward),
            other => Err(ClusterError::Config(format!(
                "unknown linkage strategy '{other}', expected 'average' or 'ward'"
            ))),
        }
    }
}

/// One agglomeration step.
///
/// Ids below the leaf count are leaves; id `N + k` is the cluster formed by
/// merge `k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// The smaller of the two merged cluster ids.
    pub left: usize,
    pub right: usize,
    pub height: f64,
    /// Number of leaves in the merged cluster.
    pub size: usize,
}

/// The full merge sequence for `leaves` documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeTree {
    leaves: usize,
    merges: Vec<Merge>,
}

impl MergeTree {
    pub fn leaves(&self) -> usize {
        self.leaves
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Id of the cluster holding every leaf, `None` for an empty tree.
    pub fn root(&self) -> Option<usize> {
        (self.leaves + self.merges.len()).checked_sub(1)
    }

    pub fn max_height(&self) -> f64 {
        self.merges.iter().map(|m| m.height).fold(0.0, f64::max)
    }

    /// Heights in merge order.
    pub fn heights(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.height).collect()
    }

    /// Children of a merged cluster, `None` for leaves and unknown ids.
    pub fn children(&self, id: usize) -> Option<(usize, usize)> {
        id.checked_sub(self.leaves)
            .and_then(|k| self.merges.get(k))
            .map(|m| (m.left, m.right))
    }

    /// Leaves contained in cluster `id`, in left-to-right order.
    pub fn leaf_members(&self, id: usize) -> Vec<usize> {
        let mut members = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            match self.children(node) {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None if node < self.leaves => members.push(node),
                None => {}
            }
        }
        members
    }

    /// Checks the structural invariants: `N - 1` merges, every leaf and
    /// every intermediate cluster absorbed exactly once, child ids formed
    /// before their parent, sizes consistent and heights non-decreasing.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidFormat`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(ClusterError::InvalidFormat(message));
        if self.leaves < 2 || self.merges.len() != self.leaves - 1 {
            return fail(format!(
                "{} merges for {} leaves",
                self.merges.len(),
                self.leaves
            ));
        }
        let mut used = vec![false; self.leaves + self.merges.len()];
        let mut sizes: Vec<usize> = vec![1; self.leaves];
        let mut previous = f64::NEG_INFINITY;
        for (k, merge) in self.merges.iter().enumerate() {
            let id = self.leaves + k;
            for child in [merge.left, merge.right] {
                if child >= id || used[child] {
                    return fail(format!("merge {k} references cluster {child} invalidly"));
                }
                used[child] = true;
            }
            if merge.size != sizes[merge.left] + sizes[merge.right] {
                return fail(format!("merge {k} has size {}", merge.size));
            }
            if merge.height < previous {
                return fail(format!("merge {k} height decreases"));
            }
            previous = merge.height;
            sizes.push(merge.size);
        }
        Ok(())
    }

    /// Flat cluster labels obtained by cutting the tree at `height`.
    ///
    /// Leaves joined by merges at or below `height` share a label. Labels
    /// are numbered from 0 in order of their first leaf.
    pub fn cut(&self, height: f64) -> Vec<usize> {
        let mut parent: Vec<usize> = (0..self.leaves).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }
        for (k, merge) in self.merges.iter().enumerate() {
            if merge.height > height {
                continue;
            }
            let members = self.leaf_members(self.leaves + k);
            let root = find(&mut parent, members[0]);
            for &leaf in &members[1..] {
                let other = find(&mut parent, leaf);
                parent[other] = root;
            }
        }

        let mut labels = vec![usize::MAX; self.leaves];
        let mut root_labels = std::collections::HashMap::new();
        for leaf in 0..self.leaves {
            let root = find(&mut parent, leaf);
            let next = root_labels.len();
            labels[leaf] = *root_labels.entry(root).or_insert(next);
        }
        labels
    }
}

/// Clusters the rows of `matrix` under `linkage`.
///
/// # Errors
///
/// - [`ClusterError::InsufficientData`] when the matrix has fewer than 2 rows.
/// - [`ClusterError::InvalidLinkageInput`] when the matrix is not symmetric,
///   has a non-zero diagonal or holds negative or non-finite values.
pub fn cluster(matrix: &DistanceMatrix, linkage: Linkage) -> Result<MergeTree> {
    let n = matrix.len();
    if n < 2 {
        return Err(ClusterError::insufficient(
            n,
            "clustering needs at least 2 documents",
        ));
    }
    matrix.validate()?;

    // Slot `s` holds the cluster whose smallest leaf is `s`, so scanning
    // slots in order enforces the tie-break.
    let mut distances: Vec<Vec<f64>> = (0..n).map(|i| matrix.row(i).to_vec()).collect();
    let mut active = vec![true; n];
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1usize; n];
    let mut merges = Vec::with_capacity(n - 1);

    for step in 0..n - 1 {
        let mut best: Option<(usize, usize, f64)> = None;
        for a in (0..n).filter(|&a| active[a]) {
            for b in ((a + 1)..n).filter(|&b| active[b]) {
                let d = distances[a][b];
                if best.is_none_or(|(_, _, min)| d < min) {
                    best = Some((a, b, d));
                }
            }
        }
        let Some((a, b, height)) = best else {
            break;
        };

        let size = sizes[a] + sizes[b];
        merges.push(Merge {
            left: ids[a].min(ids[b]),
            right: ids[a].max(ids[b]),
            height,
            size,
        });

        let (n_a, n_b) = (sizes[a] as f64, sizes[b] as f64);
        for k in (0..n).filter(|&k| active[k] && k != a && k != b) {
            let updated = linkage
                .update(
                    distances[k][a],
                    distances[k][b],
                    height,
                    n_a,
                    n_b,
                    sizes[k] as f64,
                )
                // both rules are monotone; clamp rounding below the merge height
                .max(height);
            distances[k][a] = updated;
            distances[a][k] = updated;
        }

        active[b] = false;
        sizes[a] = size;
        ids[a] = n + step;
    }

    Ok(MergeTree { leaves: n, merges })
}
