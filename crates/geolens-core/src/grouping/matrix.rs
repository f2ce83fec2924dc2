//! Pairwise cosine similarity and first-seen greedy partitioning.

use ndarray::Array2;

/// Slack on the threshold comparison so identical images still meet a
/// threshold of 1.0 after f32 rounding. Only applied to thresholds within
/// this distance of 1.0; lower thresholds are compared exactly.
const THRESHOLD_TOLERANCE: f32 = 1e-6;

/// Similarity a pair must reach to join a group at `threshold`.
fn effective_cutoff(threshold: f32) -> f32 {
    if threshold >= 1.0 - THRESHOLD_TOLERANCE {
        threshold - THRESHOLD_TOLERANCE
    } else {
        threshold
    }
}

/// Square, symmetric cosine similarity matrix.
///
/// Diagonal entries are exactly 1.0 and every entry lies in [-1, 1].
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    n: usize,
    values: Array2<f32>,
}

impl SimilarityMatrix {
    /// Build the matrix from unit-normalized rows of equal length.
    pub fn from_normalized(rows: &[Vec<f32>]) -> Self {
        let n = rows.len();
        let dim = rows.first().map_or(0, Vec::len);
        let embeddings = Array2::from_shape_fn((n, dim), |(i, j)| rows[i][j]);

        let mut values = embeddings.dot(&embeddings.t());
        for ((i, j), v) in values.indexed_iter_mut() {
            *v = if i == j { 1.0 } else { v.clamp(-1.0, 1.0) };
        }

        Self { n, values }
    }

    /// Build from raw row-major values. Caller guarantees symmetry.
    #[cfg(test)]
    pub(crate) fn from_values(n: usize, values: Vec<f32>) -> Self {
        Self {
            n,
            values: Array2::from_shape_vec((n, n), values).unwrap(),
        }
    }

    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Similarity between items `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[[i, j]]
    }

    /// Mean similarity over every unordered pair of `members`.
    ///
    /// Returns 0.0 for fewer than two members.
    pub fn mean_pairwise(&self, members: &[usize]) -> f32 {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for (a, &i) in members.iter().enumerate() {
            for &j in &members[a + 1..] {
                sum += f64::from(self.get(i, j));
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            (sum / count as f64) as f32
        }
    }
}

/// Indices of one group plus its mean pairwise similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexGroup {
    /// Seed first, then members in ascending index order
    pub members: Vec<usize>,
    pub avg_similarity: f32,
}

/// Single-pass greedy partition in index order.
///
/// Each unvisited index becomes a seed and claims every other unvisited index
/// whose similarity to the seed is at least `threshold`. A seed that claims
/// nothing is marked visited and produces no group. Membership is judged
/// against the seed only, never transitively.
///
/// Groups are returned in seed order, unsorted.
pub fn greedy_partition(matrix: &SimilarityMatrix, threshold: f32) -> Vec<IndexGroup> {
    let n = matrix.len();
    let cutoff = effective_cutoff(threshold);
    let mut visited = vec![false; n];
    let mut groups = Vec::new();

    for seed in 0..n {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;

        let claimed: Vec<usize> = (0..n)
            .filter(|&j| j != seed && !visited[j] && matrix.get(seed, j) >= cutoff)
            .collect();
        if claimed.is_empty() {
            continue;
        }

        let mut members = Vec::with_capacity(claimed.len() + 1);
        members.push(seed);
        members.extend(claimed);
        for &m in &members {
            visited[m] = true;
        }

        let avg_similarity = matrix.mean_pairwise(&members);
        groups.push(IndexGroup {
            members,
            avg_similarity,
        });
    }

    groups
}
