use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum NormalizeError {
    #[error("score inputs must be finite (score={score}, best={best}, worst={worst})")]
    NonFinite { score: f64, best: f64, worst: f64 },

    #[error("degenerate range: best and worst are both {0}")]
    DegenerateRange(f64),
}

/// Maps a raw score onto a 0..=100 performance percentage.
///
/// Lower scores are better: `best` maps to 100 and `worst` maps to 0. Scores
/// beyond either bound are clamped.
///
/// # Errors
///
/// Returns `NormalizeError::NonFinite` if any input is NaN or infinite and
/// `NormalizeError::DegenerateRange` if `best == worst`.
pub fn normalize(score: f64, best: f64, worst: f64) -> Result<f64, NormalizeError> {
    if !(score.is_finite() && best.is_finite() && worst.is_finite()) {
        return Err(NormalizeError::NonFinite { score, best, worst });
    }

    let span = worst - best;
    if span == 0.0 {
        return Err(NormalizeError::DegenerateRange(best));
    }

    let raw = ((worst - score) / span).clamp(0.0, 1.0);
    Ok(raw * 100.0)
}
