//! Centered rolling-window statistics and gap filling
//!
//! Rolling windows follow a fixed placement: for width `w` the window labelled
//! at row `i` covers rows `[i + o + 1 - w, i + o]` where `o = (w - 1) / 2`.
//! Rows whose window is incomplete, or contains a missing value, get no value
//! and are filled afterwards (backward fill, then forward fill).

use std::collections::HashMap;

/// Statistic computed over each window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingStat {
    Mean,
    Max,
    /// Sample standard deviation (n - 1 denominator)
    Std,
}

impl RollingStat {
    /// Evaluate over a window; `None` if the window holds a missing value
    fn apply(&self, window: &[f64]) -> Option<f64> {
        if window.is_empty() || window.iter().any(|v| v.is_nan()) {
            return None;
        }
        let n = window.len() as f64;

        match self {
            RollingStat::Mean => Some(window.iter().sum::<f64>() / n),
            RollingStat::Max => window.iter().copied().reduce(f64::max),
            RollingStat::Std => {
                if window.len() < 2 {
                    return None;
                }
                let mean = window.iter().sum::<f64>() / n;
                let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
                Some(variance.sqrt())
            }
        }
    }

    /// Value used when no complete window exists anywhere in the sequence
    fn fallback(&self, values: &[f64]) -> f64 {
        let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        match self {
            RollingStat::Std if present.len() < 2 => 0.0,
            _ => self.apply(&present).unwrap_or(0.0),
        }
    }
}

/// Distance from the labelled row to the last row of its window
pub fn center_offset(width: usize) -> usize {
    width.saturating_sub(1) / 2
}

/// Centered rolling statistic without any filling
pub fn centered(values: &[f64], width: usize, stat: RollingStat) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if width == 0 || values.len() < width {
        return out;
    }

    let offset = center_offset(width);
    for (start, window) in values.windows(width).enumerate() {
        let last = start + width - 1;
        out[last - offset] = stat.apply(window);
    }
    out
}

/// Centered rolling statistic with edges filled from the nearest computed value.
///
/// When no window is ever satisfied (sequence shorter than the window, or
/// every window holds a gap) the statistic over all present values is
/// broadcast instead.
pub fn centered_filled(values: &[f64], width: usize, stat: RollingStat) -> Vec<f64> {
    let raw = centered(values, width, stat);
    match fill_both(raw) {
        Some(filled) => filled,
        None => {
            if !values.is_empty() {
                log::warn!(
                    "no complete {:?} window of width {} over {} rows; using whole-sequence value",
                    stat,
                    width,
                    values.len()
                );
            }
            vec![stat.fallback(values); values.len()]
        }
    }
}

/// Same as [`centered_filled`] but restarting the window at every group
pub fn centered_filled_grouped(
    values: &[f64],
    groups: &[Vec<usize>],
    width: usize,
    stat: RollingStat,
) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for rows in groups {
        let gathered: Vec<f64> = rows.iter().map(|&i| values[i]).collect();
        for (&i, value) in rows.iter().zip(centered_filled(&gathered, width, stat)) {
            out[i] = value;
        }
    }
    out
}

/// Centered rolling statistic with edges filled, but no whole-sequence
/// fallback: when no window is satisfied every row stays missing.
pub fn centered_filled_sparse(
    values: &[f64],
    width: usize,
    stat: RollingStat,
) -> Vec<Option<f64>> {
    let mut out = centered(values, width, stat);
    backward_fill(&mut out);
    forward_fill(&mut out);
    out
}

/// Same as [`centered_filled_sparse`] but restarting the window at every group
pub fn centered_filled_sparse_grouped(
    values: &[f64],
    groups: &[Vec<usize>],
    width: usize,
    stat: RollingStat,
) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for rows in groups {
        let gathered: Vec<f64> = rows.iter().map(|&i| values[i]).collect();
        for (&i, value) in rows.iter().zip(centered_filled_sparse(&gathered, width, stat)) {
            out[i] = value;
        }
    }
    out
}

/// Copy the next present value backward over gaps
pub fn backward_fill(values: &mut [Option<f64>]) {
    let mut next = None;
    for value in values.iter_mut().rev() {
        match value {
            Some(v) => next = Some(*v),
            None => *value = next,
        }
    }
}

/// Copy the previous present value forward over gaps
pub fn forward_fill(values: &mut [Option<f64>]) {
    let mut prev = None;
    for value in values.iter_mut() {
        match value {
            Some(v) => prev = Some(*v),
            None => *value = prev,
        }
    }
}

/// Backward fill then forward fill; `None` if nothing was present at all
pub fn fill_both(mut values: Vec<Option<f64>>) -> Option<Vec<f64>> {
    backward_fill(&mut values);
    forward_fill(&mut values);
    values.into_iter().collect()
}

/// `values[i] - values[i - periods]`, `None` where the lag is not available
pub fn lagged_diff(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if i < periods {
                return None;
            }
            let d = v - values[i - periods];
            if d.is_nan() {
                None
            } else {
                Some(d)
            }
        })
        .collect()
}

/// Row indices per series key, groups in order of first appearance
pub fn group_rows<'a, I>(keys: I) -> Vec<Vec<usize>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut slots: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (row, key) in keys.into_iter().enumerate() {
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_centered_placement_even_width() {
        // width 2: window labelled at i covers [i-1, i]
        let out = centered(&[0.0, 1.0, 2.0, 3.0], 2, RollingStat::Mean);
        assert_eq!(out, vec![None, Some(0.5), Some(1.5), Some(2.5)]);
    }

    #[test]
    fn test_centered_placement_width_four() {
        // width 4: offset 1, window at i covers [i-2, i+1]
        let out = centered(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 4, RollingStat::Max);
        assert_eq!(out, vec![None, None, Some(4.0), Some(5.0), Some(6.0), None]);
    }

    #[test]
    fn test_centered_edges_count_for_feature_width() {
        let values: Vec<f64> = (0..50).map(f64::from).collect();
        let out = centered(&values, 20, RollingStat::Mean);
        let leading = out.iter().take_while(|v| v.is_none()).count();
        let trailing = out.iter().rev().take_while(|v| v.is_none()).count();
        assert_eq!(leading, 10);
        assert_eq!(trailing, 9);
    }

    #[test]
    fn test_filled_edges_take_nearest_interior_value() {
        let values: Vec<f64> = (0..30).map(f64::from).collect();
        let raw = centered(&values, 20, RollingStat::Mean);
        let filled = centered_filled(&values, 20, RollingStat::Mean);

        let first = raw.iter().flatten().next().copied().unwrap();
        let last = raw.iter().rev().flatten().next().copied().unwrap();

        assert!(filled.iter().all(|v| !v.is_nan()));
        assert_eq!(filled[0], first);
        assert_eq!(filled[9], first);
        assert_eq!(filled[29], last);
        assert_eq!(filled[21], last);
    }

    #[test]
    fn test_sample_std() {
        let out = centered(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8, RollingStat::Std);
        let std = out.into_iter().flatten().next().unwrap();
        // sample variance of this set is 32 / 7
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_window_with_gap_is_not_satisfied() {
        let out = centered(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2, RollingStat::Mean);
        assert_eq!(out, vec![None, None, None, Some(3.5), Some(4.5)]);
    }

    #[test]
    fn test_short_sequence_uses_whole_sequence_value() {
        let filled = centered_filled(&[1.0, 2.0, 3.0], 20, RollingStat::Mean);
        assert_eq!(filled, vec![2.0, 2.0, 2.0]);

        let std = centered_filled(&[4.0], 20, RollingStat::Std);
        assert_eq!(std, vec![0.0]);

        assert!(centered_filled(&[], 20, RollingStat::Max).is_empty());
    }

    #[test]
    fn test_fill_order_is_backward_then_forward() {
        let filled = fill_both(vec![None, Some(1.0), None, Some(3.0), None]).unwrap();
        assert_eq!(filled, vec![1.0, 1.0, 3.0, 3.0, 3.0]);
        assert!(fill_both(vec![None, None]).is_none());
    }

    #[test]
    fn test_lagged_diff() {
        let out = lagged_diff(&[1.0, 2.0, 4.0, 8.0], 2);
        assert_eq!(out, vec![None, None, Some(3.0), Some(6.0)]);
    }

    #[test]
    fn test_group_rows_handles_interleaving() {
        let groups = group_rows(["a", "b", "a", "c", "b"]);
        assert_eq!(groups, vec![vec![0, 2], vec![1, 4], vec![3]]);
    }

    #[test]
    fn test_grouped_windows_restart_per_group() {
        let values = [1.0, 1.0, 1.0, 9.0, 9.0, 9.0];
        let groups = vec![vec![0, 1, 2], vec![3, 4, 5]];
        let out = centered_filled_grouped(&values, &groups, 2, RollingStat::Max);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_sparse_fill_leaves_unsatisfied_rows_missing() {
        let out = centered_filled_sparse(&[1.0, 2.0, 3.0], 20, RollingStat::Mean);
        assert_eq!(out, vec![None, None, None]);

        let out = centered_filled_sparse(&[1.0, 3.0, 5.0], 2, RollingStat::Mean);
        assert_eq!(out, vec![Some(2.0), Some(2.0), Some(4.0)]);
    }

    #[test]
    fn test_sparse_fill_per_group() {
        // first group is long enough for a width-3 window, second is not
        let values = [1.0, 2.0, 3.0, 4.0, 9.0, 9.0];
        let groups = vec![vec![0, 1, 2, 3], vec![4, 5]];
        let out = centered_filled_sparse_grouped(&values, &groups, 3, RollingStat::Mean);
        assert_eq!(
            out,
            vec![Some(2.0), Some(2.0), Some(3.0), Some(3.0), None, None]
        );
    }
}
