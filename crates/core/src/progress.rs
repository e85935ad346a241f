//! Reconciles the server's inconsistent progress reporting into one stable
//! percentage for display.
//!
//! Some backend revisions report `progressPercent` as a 0..1 fraction, others
//! as a 0..100 value, and either may disagree with the answered/correct
//! counts. The counts are treated as ground truth when the disagreement is
//! two points or more.

/// The three untrusted inputs, already coerced to finite-or-absent numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressInputs {
    pub progress_percent: Option<f64>,
    pub correct: Option<f64>,
    pub total: Option<f64>,
}

/// Minimum disagreement, in percentage points, at which the counts override
/// the reported percentage.
const COUNT_OVERRIDE_THRESHOLD: f64 = 2.0;

/// Produce one trustworthy percentage in 0..=100.
#[must_use]
pub fn compute(inputs: ProgressInputs) -> u8 {
    let correct = finite(inputs.correct);
    let total = finite(inputs.total);

    let from_counts = match (correct, total) {
        (Some(correct), Some(total)) if total > 0.0 => Some((correct / total * 100.0).round()),
        _ => None,
    };

    let Some(raw) = finite(inputs.progress_percent) else {
        return clamp(from_counts.unwrap_or(0.0));
    };

    let scaled = if (0.0..=1.0).contains(&raw) { raw * 100.0 } else { raw };
    let rounded = scaled.round();

    if let Some(counts) = from_counts {
        if (counts - rounded).abs() >= COUNT_OVERRIDE_THRESHOLD {
            return clamp(counts);
        }
    }

    clamp(rounded)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp(value: f64) -> u8 {
    value.clamp(0.0, 100.0) as u8
}
