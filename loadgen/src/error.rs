//! Classification of failed requests.

use reqwest::StatusCode;
use thiserror::Error;

use crate::ids::Id;

/// Reason a single request was scored as failed.
///
/// Failures never abort a simulated user. They are recorded against the request name in
/// [`Stats`](crate::stats::Stats) and the user carries on with its next task.
#[derive(Debug, Error)]
pub enum Failure {
    /// The request could not be sent or the response body could not be received.
    #[error("request error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response status is outside the set of expected statuses for the action.
    #[error("unexpected status {}", .0.as_u16())]
    Status(StatusCode),

    /// The response body is not valid JSON.
    #[error("failed to parse JSON response")]
    Parse(#[source] serde_json::Error),

    /// The body parsed, but does not have the expected structure.
    #[error("{0}")]
    Invalid(&'static str),

    /// A successful response lacks a field the action relies on.
    #[error("missing field `{0}` in response")]
    MissingField(&'static str),

    /// The target no longer knows the identifier.
    #[error("product {0} not found")]
    NotFound(Id),
}

impl Failure {
    /// Default classification for requests without an explicit validation step.
    ///
    /// Statuses below 400 count as success.
    pub fn from_status(status: StatusCode) -> Result<(), Self> {
        if status.is_client_error() || status.is_server_error() {
            Err(Failure::Status(status))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classification() {
        assert!(Failure::from_status(StatusCode::OK).is_ok());
        assert!(Failure::from_status(StatusCode::NOT_MODIFIED).is_ok());
        assert!(Failure::from_status(StatusCode::NOT_FOUND).is_err());
        assert!(Failure::from_status(StatusCode::BAD_GATEWAY).is_err());
    }

    #[test]
    fn messages() {
        assert_eq!(
            Failure::Status(StatusCode::SERVICE_UNAVAILABLE).to_string(),
            "unexpected status 503"
        );
        assert_eq!(
            Failure::MissingField("orderId").to_string(),
            "missing field `orderId` in response"
        );
        assert_eq!(
            Failure::NotFound(Id::Number(7)).to_string(),
            "product 7 not found"
        );
    }
}
