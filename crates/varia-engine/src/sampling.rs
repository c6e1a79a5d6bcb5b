//! Weighted sampling without replacement.

use rand::Rng;

/// Locates the bucket a draw falls into, given running cumulative
/// weights.
///
/// `draw` is expected in `[0, total)`; accumulated float rounding can
/// push it to or past the final edge, in which case the last candidate
/// is the documented fallback pick.
pub(crate) fn pick_index(cumulative: &[f64], draw: f64) -> Option<usize> {
    if cumulative.is_empty() {
        return None;
    }

    let bucket = cumulative.partition_point(|&edge| edge <= draw);
    Some(bucket.min(cumulative.len() - 1))
}

/// Draws up to `count` distinct indices from `weights`, removing each
/// pick and recomputing the running total.
///
/// Rounds where the remaining weight mass is zero fall back to a uniform
/// draw over what is left, so callers always receive
/// `min(count, weights.len())` indices.
pub(crate) fn sample_without_replacement<R: Rng>(
    weights: &[f64],
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..weights.len()).collect();
    let target = count.min(weights.len());
    let mut picked = Vec::with_capacity(target);

    while picked.len() < target {
        let total: f64 = remaining.iter().map(|&index| weights[index]).sum();

        let position = if total > 0.0 {
            let draw = rng.random_range(0.0..total);
            let mut cumulative = Vec::with_capacity(remaining.len());
            let mut sum = 0.0;
            for &index in &remaining {
                sum += weights[index];
                cumulative.push(sum);
            }
            match pick_index(&cumulative, draw) {
                Some(position) => position,
                None => break,
            }
        } else {
            rng.random_range(0..remaining.len())
        };

        picked.push(remaining.remove(position));
    }

    picked
}
