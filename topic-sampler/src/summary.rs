//! Ranked probability lists for rendering distribution snapshots.

/// Score every item in `0..num_items` and return `(item, probability)`
/// pairs sorted by probability descending, ties broken by ascending item
/// id (insertion order).
///
/// `top` caps the list length (`None` = all items); entries with zero
/// probability or below `threshold` are cut, along with everything after
/// them, matching the rendering convention of the distribution dumps.
pub fn top_items(
    num_items: usize,
    top: Option<usize>,
    threshold: f64,
    score: impl Fn(usize) -> f64,
) -> Vec<(usize, f64)> {
    let mut probs: Vec<(usize, f64)> = (0..num_items).map(|i| (i, score(i))).collect();
    probs.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let cap = top.unwrap_or(num_items).min(num_items);
    probs.truncate(cap);

    if let Some(cut) = probs.iter().position(|&(_, p)| p == 0.0 || p < threshold) {
        probs.truncate(cut);
    }

    probs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_descending_with_index_ties() {
        let weights = [0.2, 0.5, 0.2, 0.1];
        let top = top_items(4, None, 0.0, |i| weights[i]);
        let order: Vec<usize> = top.iter().map(|&(i, _)| i).collect();
        assert_eq!(order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn threshold_and_cap_truncate() {
        let weights = [0.5, 0.3, 0.15, 0.05];
        let top = top_items(4, Some(3), 0.1, |i| weights[i]);
        assert_eq!(top.len(), 3);

        let top = top_items(4, None, 0.1, |i| weights[i]);
        assert_eq!(top.len(), 3, "below-threshold tail cut");

        let with_zero = [0.9, 0.0, 0.1];
        let top = top_items(3, None, 0.0, |i| with_zero[i]);
        assert_eq!(top.iter().map(|&(i, _)| i).collect::<Vec<_>>(), vec![0, 2]);
    }
}
