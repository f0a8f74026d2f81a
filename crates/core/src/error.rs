//! Structural validation errors.

/// An attribute set has the wrong shape.
///
/// Only structural problems land here. Free-text fields such as `vp`, `area`,
/// `kind` or a milestone status are never checked against a vocabulary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Progress must be a finite number
    #[error("progress must be a finite number")]
    ProgressNotFinite,

    /// Progress must stay within 0..=100
    #[error("progress {0} is outside 0..=100")]
    ProgressOutOfRange(f64),
}

/// Check a milestone progress value.
pub fn validate_progress(progress: f64) -> Result<f64, ValidationError> {
    if !progress.is_finite() {
        return Err(ValidationError::ProgressNotFinite);
    }
    if !(0.0..=100.0).contains(&progress) {
        return Err(ValidationError::ProgressOutOfRange(progress));
    }
    Ok(progress)
}
