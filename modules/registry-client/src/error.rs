use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// 5xx from the upstream. Retried with backoff.
    #[error("Registry error (status {status}): {message}")]
    Transient { status: u16, message: String },

    /// 429 from the upstream. Retried with backoff.
    #[error("Registry rate limited the request")]
    RateLimited,

    /// Non-retryable 4xx. Returned immediately.
    #[error("Registry rejected the request (status {status}): {message}")]
    Client { status: u16, message: String },

    /// 404 on a single-record fetch.
    #[error("No registry record for {0}")]
    NotFound(String),

    /// Connect/timeout failures below the HTTP layer. Retried.
    #[error("Network error: {0}")]
    Network(String),

    /// 2xx without a decodable body. The registry occasionally serves
    /// truncated responses under load, so this is treated as transient.
    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}

impl RegistryError {
    /// Whether the retry loop should try again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::Transient { .. }
                | RegistryError::RateLimited
                | RegistryError::Network(_)
                | RegistryError::InvalidBody(_)
        )
    }

    /// Classify a non-2xx status. `subject` names the record for 404s on
    /// single-record fetches; list endpoints pass `None` and a 404 there is
    /// a permanent client error.
    pub fn from_status(status: u16, message: String, subject: Option<&str>) -> Self {
        match (status, subject) {
            (404, Some(id)) => RegistryError::NotFound(id.to_string()),
            (429, _) => RegistryError::RateLimited,
            (400..=499, _) => RegistryError::Client { status, message },
            _ => RegistryError::Transient { status, message },
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RegistryError::InvalidBody(err.to_string())
        } else {
            RegistryError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        assert!(RegistryError::from_status(500, String::new(), None).is_transient());
        assert!(RegistryError::from_status(503, String::new(), None).is_transient());
    }

    #[test]
    fn rate_limit_is_transient() {
        let err = RegistryError::from_status(429, String::new(), None);
        assert!(matches!(err, RegistryError::RateLimited));
        assert!(err.is_transient());
    }

    #[test]
    fn client_errors_are_permanent() {
        let err = RegistryError::from_status(400, "bad page".into(), None);
        assert!(matches!(err, RegistryError::Client { status: 400, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn missing_record_is_not_found() {
        let err = RegistryError::from_status(404, String::new(), Some("918654321"));
        assert!(matches!(err, RegistryError::NotFound(ref id) if id == "918654321"));
        assert!(!err.is_transient());
    }

    #[test]
    fn list_404_is_permanent_client_error() {
        let err = RegistryError::from_status(404, String::new(), None);
        assert!(matches!(err, RegistryError::Client { status: 404, .. }));
    }
}
