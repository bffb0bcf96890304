//! Response: the single value sent back over a transaction's reply channel.

use std::fmt;

/// The outcome of handling a transaction, sent exactly once on its
/// `reply_to` channel.
#[derive(Debug)]
pub enum Response {
    /// The transaction was handled successfully end-to-end.
    Success,
    /// The transaction failed; the error explains why.
    Error(anyhow::Error),
}

impl Response {
    /// Shorthand for `Response::Success`.
    pub fn success() -> Self {
        Response::Success
    }

    /// Shorthand for `Response::Error`.
    pub fn error(err: impl Into<anyhow::Error>) -> Self {
        Response::Error(err.into())
    }

    /// Returns `true` if this response carries an error.
    pub fn is_err(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Returns a reference to the carried error, if any.
    pub fn as_err(&self) -> Option<&anyhow::Error> {
        match self {
            Response::Error(e) => Some(e),
            Response::Success => None,
        }
    }

    /// Converts into a plain `Result`, discarding the success value.
    pub fn into_result(self) -> Result<(), anyhow::Error> {
        match self {
            Response::Success => Ok(()),
            Response::Error(e) => Err(e),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Success => write!(f, "success"),
            Response::Error(e) => write!(f, "error: {e}"),
        }
    }
}

impl From<Result<(), anyhow::Error>> for Response {
    fn from(res: Result<(), anyhow::Error>) -> Self {
        match res {
            Ok(()) => Response::Success,
            Err(e) => Response::Error(e),
        }
    }
}

/// A batch of errors observed asynchronously, published on a stage's errors
/// side-channel. Unlike [`Response`] this is never sent back over a
/// transaction's `reply_to` — it is read by operational/metrics code only.
#[derive(Debug)]
pub struct ErrorBatch(pub Vec<anyhow::Error>);

impl ErrorBatch {
    pub fn single(err: anyhow::Error) -> Self {
        Self(vec![err])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_success_round_trip() {
        let res = Response::success();
        assert!(!res.is_err());
        assert!(res.into_result().is_ok());
    }

    #[test]
    fn test_error_round_trip() {
        let res = Response::error(anyhow!("boom"));
        assert!(res.is_err());
        assert_eq!(res.into_result().unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_error_batch_single() {
        let batch = ErrorBatch::single(anyhow!("x"));
        assert_eq!(batch.len(), 1);
    }
}
