//! Cosine similarity ranking over the embedded cover set.
//!
//! Builds the full pairwise similarity matrix for one pipeline run and turns
//! each row into a ranked neighbor list. The matrix is small (one row per
//! cover with detected text), so the dense representation is fine.

use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("{keys} keys for a {n}x{n} matrix")]
    KeyCountMismatch { keys: usize, n: usize },
}

/// Square, symmetric cosine-similarity matrix over one embedding set.
///
/// Entry (i, j) is in [-1, 1]. The diagonal is exactly 1.0 and is excluded
/// from ranking. Each off-diagonal pair is computed once and mirrored, so
/// symmetry holds bit-for-bit.
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    pub fn from_embeddings(embeddings: &[Vec<f32>]) -> Result<Self, RankError> {
        let n = embeddings.len();
        if n == 0 {
            return Ok(Self { n, values: vec![] });
        }

        let dims = embeddings[0].len();
        for vector in embeddings {
            if vector.len() != dims {
                return Err(RankError::DimensionMismatch {
                    expected: dims,
                    got: vector.len(),
                });
            }
        }

        let norms: Vec<f32> = embeddings.iter().map(|v| l2_norm(v)).collect();

        let mut values = vec![0.0_f32; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let score = cosine(&embeddings[i], &embeddings[j], norms[i], norms[j]);
                values[i * n + j] = score;
                values[j * n + i] = score;
            }
        }

        Ok(Self { n, values })
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.n + j]
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}

/// Rank each row of the matrix into a neighbor list of up to `top_k` keys.
///
/// All scores in a row are enumerated and stable-sorted descending, so equal
/// scores keep the original key-enumeration order. The row's own key is
/// dropped wherever it sorts, which caps list length at min(top_k, N-1);
/// short lists are never padded.
pub fn recommendations(
    keys: &[String],
    matrix: &SimilarityMatrix,
    top_k: usize,
) -> Result<BTreeMap<String, Vec<String>>, RankError> {
    if keys.len() != matrix.len() {
        return Err(RankError::KeyCountMismatch {
            keys: keys.len(),
            n: matrix.len(),
        });
    }

    let mut result = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        let mut scored: Vec<(usize, f32)> =
            (0..matrix.len()).map(|j| (j, matrix.get(i, j))).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let neighbors: Vec<String> = scored
            .into_iter()
            .filter(|(j, _)| *j != i)
            .take(top_k)
            .map(|(j, _)| keys[j].clone())
            .collect();

        result.insert(key.clone(), neighbors);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matrix_symmetric_with_unit_diagonal() {
        let embeddings = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.6, 0.8, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let matrix = SimilarityMatrix::from_embeddings(&embeddings).unwrap();

        for i in 0..3 {
            assert!((matrix.get(i, i) - 1.0).abs() < 1e-6);
            for j in 0..3 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
                assert!(matrix.get(i, j) >= -1.0 - 1e-6);
                assert!(matrix.get(i, j) <= 1.0 + 1e-6);
            }
        }
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        let result = SimilarityMatrix::from_embeddings(&embeddings);
        assert!(matches!(
            result,
            Err(RankError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_neighbors_ranked_by_similarity() {
        // b is nearly parallel to a, c is orthogonal to both
        let embeddings = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.1, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let matrix = SimilarityMatrix::from_embeddings(&embeddings).unwrap();
        let recs = recommendations(&keys(&["a.jpg", "b.jpg", "c.jpg"]), &matrix, 3).unwrap();

        assert_eq!(recs["a.jpg"], keys(&["b.jpg", "c.jpg"]));
        assert_eq!(recs["b.jpg"], keys(&["a.jpg", "c.jpg"]));
    }

    #[test]
    fn test_never_contains_self_even_under_perfect_ties() {
        // identical vectors: every pairwise score is 1.0, tied with self
        let embeddings = vec![vec![1.0, 0.0]; 3];
        let matrix = SimilarityMatrix::from_embeddings(&embeddings).unwrap();
        let recs = recommendations(&keys(&["a", "b", "c"]), &matrix, 3).unwrap();

        for (key, neighbors) in &recs {
            assert!(!neighbors.contains(key));
            assert_eq!(neighbors.len(), 2);
        }
        // stable sort keeps enumeration order among the tied entries
        assert_eq!(recs["b"], keys(&["a", "c"]));
    }

    #[test]
    fn test_list_clamped_to_population() {
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let matrix = SimilarityMatrix::from_embeddings(&embeddings).unwrap();
        let recs = recommendations(&keys(&["a", "b"]), &matrix, 3).unwrap();

        // N=2 caps lists at one entry, never padded
        assert_eq!(recs["a"], keys(&["b"]));
        assert_eq!(recs["b"], keys(&["a"]));
    }

    #[test]
    fn test_single_image_has_no_neighbors() {
        let embeddings = vec![vec![1.0, 0.0]];
        let matrix = SimilarityMatrix::from_embeddings(&embeddings).unwrap();
        let recs = recommendations(&keys(&["only.jpg"]), &matrix, 3).unwrap();

        assert!(recs["only.jpg"].is_empty());
    }

    #[test]
    fn test_empty_set_yields_empty_map() {
        let matrix = SimilarityMatrix::from_embeddings(&[]).unwrap();
        assert!(matrix.is_empty());
        assert!(recommendations(&[], &matrix, 3).unwrap().is_empty());
    }

    #[test]
    fn test_scores_non_increasing_along_list() {
        let embeddings = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.8, 0.6, 0.0],
            vec![0.6, 0.8, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.6, 0.8],
        ];
        let names = keys(&["a", "b", "c", "d", "e"]);
        let matrix = SimilarityMatrix::from_embeddings(&embeddings).unwrap();
        let recs = recommendations(&names, &matrix, 3).unwrap();

        for (key, neighbors) in &recs {
            let i = names.iter().position(|k| k == key).unwrap();
            assert!(neighbors.len() <= 3);
            let scores: Vec<f32> = neighbors
                .iter()
                .map(|n| matrix.get(i, names.iter().position(|k| k == n).unwrap()))
                .collect();
            for pair in scores.windows(2) {
                assert!(pair[0] >= pair[1]);
            }
        }
    }

    #[test]
    fn test_key_count_mismatch_rejected() {
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let matrix = SimilarityMatrix::from_embeddings(&embeddings).unwrap();
        let result = recommendations(&keys(&["a"]), &matrix, 3);
        assert!(matches!(result, Err(RankError::KeyCountMismatch { .. })));
    }

    #[test]
    fn test_zero_norm_vector_scores_zero_against_others() {
        let embeddings = vec![vec![0.0, 0.0], vec![1.0, 0.0]];
        let matrix = SimilarityMatrix::from_embeddings(&embeddings).unwrap();

        assert_eq!(matrix.get(0, 1), 0.0);
        // diagonal stays defined even for the degenerate vector
        assert_eq!(matrix.get(0, 0), 1.0);
    }
}
