use crate::error::{JobPlaneError, Result};

pub const PRIORITY_LOW: &str = "low";
pub const PRIORITY_NORMAL: &str = "normal";
pub const PRIORITY_HIGH: &str = "high";

/// Normalize a requested priority label.
///
/// An empty label becomes [`PRIORITY_NORMAL`]; anything outside
/// `{low, normal, high}` is rejected with `InvalidPriority`.
pub fn normalize(priority: &str) -> Result<&'static str> {
    match priority {
        "" => Ok(PRIORITY_NORMAL),
        PRIORITY_LOW => Ok(PRIORITY_LOW),
        PRIORITY_NORMAL => Ok(PRIORITY_NORMAL),
        PRIORITY_HIGH => Ok(PRIORITY_HIGH),
        other => Err(JobPlaneError::InvalidPriority(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_defaults_to_normal() {
        assert_eq!(normalize(""), Ok("normal"));
    }

    #[test]
    fn known_labels_pass_through() {
        assert_eq!(normalize("low"), Ok("low"));
        assert_eq!(normalize("normal"), Ok("normal"));
        assert_eq!(normalize("high"), Ok("high"));
    }

    #[test]
    fn unknown_label_is_rejected_verbatim() {
        assert_eq!(
            normalize("urgent"),
            Err(JobPlaneError::InvalidPriority("urgent".to_string()))
        );
        // Matching is exact, not case-insensitive.
        assert!(normalize("HIGH").is_err());
    }
}
