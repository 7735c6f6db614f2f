//! Run-length event segmentation
//!
//! The smoothed signal is split into maximal runs where both the series and
//! the signal state stay constant. A row without a smoothed value is
//! inactive. Rows of an inactive run, and a lone active row, are labelled
//! onset. An active run of two or more rows is labelled
//! wakeup at its first and last row and onset in between.

use crate::types::EventKind;
use std::iter;

/// Stateless run-length segmenter
#[derive(Debug, Clone, Copy, Default)]
pub struct EventSegmenter;

impl EventSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// Label every `(series_id, smooth)` pair, preserving order
    pub fn segment<'a, I>(&self, signal: I) -> Vec<EventKind>
    where
        I: IntoIterator<Item = (&'a str, Option<f64>)>,
    {
        let mut labels = Vec::new();
        let mut current: Option<(&'a str, bool)> = None;
        let mut run_len = 0;

        for (series_id, smooth) in signal {
            let key = (series_id, is_active(smooth));
            if current != Some(key) {
                if let Some((_, active)) = current {
                    flush_run(&mut labels, active, run_len);
                }
                current = Some(key);
                run_len = 0;
            }
            run_len += 1;
        }
        if let Some((_, active)) = current {
            flush_run(&mut labels, active, run_len);
        }

        labels
    }
}

fn is_active(smooth: Option<f64>) -> bool {
    matches!(smooth, Some(v) if v != 0.0 && !v.is_nan())
}

fn flush_run(labels: &mut Vec<EventKind>, active: bool, len: usize) {
    if !active || len < 2 {
        labels.extend(iter::repeat(EventKind::Onset).take(len));
        return;
    }
    labels.push(EventKind::Wakeup);
    labels.extend(iter::repeat(EventKind::Onset).take(len - 2));
    labels.push(EventKind::Wakeup);
}
