use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EstimatorError {
    /// Non-positive rated travel time; no motion context is created.
    #[error("invalid rating for door {door}: time_to_open_ms={open_ms}, time_to_close_ms={close_ms}")]
    InvalidRating {
        door: String,
        open_ms: i64,
        close_ms: i64,
    },
    #[error("malformed notification for door {door}: {reason}")]
    MalformedNotification { door: String, reason: String },
    #[error("store error: {0}")]
    Store(String),
    #[error("store rejected write: {0}")]
    StoreRejected(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl EstimatorError {
    /// Degraded-input errors stall one door's estimate; everything else is a
    /// collaborator failure worth surfacing at error level.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EstimatorError::InvalidRating { .. } | EstimatorError::MalformedNotification { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EstimatorError::InvalidRating { door: "main".into(), open_ms: 0, close_ms: 1 }, true)]
    #[case(EstimatorError::MalformedNotification { door: "main".into(), reason: "x".into() }, true)]
    #[case(EstimatorError::Store("gone".into()), false)]
    #[case(EstimatorError::StoreRejected("main.Moving".into()), false)]
    #[case(EstimatorError::Config("bad".into()), false)]
    fn input_errors_are_told_apart_from_store_failures(
        #[case] e: EstimatorError,
        #[case] input: bool,
    ) {
        assert_eq!(e.is_input_error(), input);
    }
}
