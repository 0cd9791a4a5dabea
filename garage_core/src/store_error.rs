//! Maps `Box<dyn Error>` from the store trait boundary to typed `EstimatorError`.
//!
//! The traits in `garage_traits` use `Box<dyn Error + Send + Sync>` so any
//! store can plug in; this module converts those to our typed error enum, with
//! an optional feature-gated path for `garage_store::StoreError` downcasting.

use crate::error::EstimatorError;

/// Map a trait-boundary error to a typed `EstimatorError`.
///
/// Attempts to downcast known store error types first, then falls back
/// to string-based heuristics.
pub fn map_store_error(e: &(dyn std::error::Error + 'static)) -> EstimatorError {
    #[cfg(feature = "store-errors")]
    {
        if let Some(se) = e.downcast_ref::<garage_store::StoreError>() {
            return match se {
                garage_store::StoreError::Rejected(what) => {
                    EstimatorError::StoreRejected(what.clone())
                }
                other => EstimatorError::Store(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("rejected") {
        EstimatorError::StoreRejected(s)
    } else {
        EstimatorError::Store(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_fall_back_to_heuristics() {
        let e = std::io::Error::other("write rejected by schema");
        assert!(matches!(
            map_store_error(&e),
            EstimatorError::StoreRejected(_)
        ));
        let e = std::io::Error::other("connection reset");
        assert_eq!(
            map_store_error(&e),
            EstimatorError::Store("connection reset".into())
        );
    }

    #[cfg(feature = "store-errors")]
    #[test]
    fn store_errors_are_downcast() {
        let e = garage_store::StoreError::Rejected("main.Moving".into());
        assert_eq!(
            map_store_error(&e),
            EstimatorError::StoreRejected("main.Moving".into())
        );
        let e = garage_store::StoreError::UnknownDoor("attic".into());
        assert_eq!(
            map_store_error(&e),
            EstimatorError::Store("unknown door: attic".into())
        );
    }
}
