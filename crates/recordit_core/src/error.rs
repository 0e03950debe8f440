use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The principal is authenticated but the token is not fresh.
    #[error("needs refresh: {0}")]
    NeedsFresh(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("too large: {0}")]
    TooLarge(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RecordError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Unauthorized(_) => 401,
            Self::NeedsFresh(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::InvalidInput(_) => 400,
            Self::TooLarge(_) => 413,
            Self::Internal(_) => 500,
        }
    }

    /// The bare message, without the variant prefix. Internal causes are
    /// not exposed.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::NeedsFresh(m)
            | Self::Forbidden(m)
            | Self::Conflict(m)
            | Self::InvalidInput(m)
            | Self::TooLarge(m) => m.clone(),
            Self::Internal(_) => "Internal server error".into(),
        }
    }

    /// Shorthand for the message-less 403 raised by ownership checks.
    pub fn forbidden() -> Self {
        Self::Forbidden("Forbidden".into())
    }
}

impl From<std::io::Error> for RecordError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl From<csv::Error> for RecordError {
    fn from(e: csv::Error) -> Self {
        Self::InvalidInput(format!("malformed spreadsheet: {e}"))
    }
}

impl From<zip::result::ZipError> for RecordError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Internal(e.into())
    }
}

pub type Result<T> = std::result::Result<T, RecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_covers_every_variant() {
        assert_eq!(RecordError::NotFound("x".into()).http_status(), 404);
        assert_eq!(RecordError::Unauthorized("x".into()).http_status(), 401);
        assert_eq!(RecordError::NeedsFresh("x".into()).http_status(), 401);
        assert_eq!(RecordError::Forbidden("x".into()).http_status(), 403);
        assert_eq!(RecordError::Conflict("x".into()).http_status(), 409);
        assert_eq!(RecordError::InvalidInput("x".into()).http_status(), 400);
        assert_eq!(RecordError::TooLarge("x".into()).http_status(), 413);
        assert_eq!(
            RecordError::Internal(anyhow::anyhow!("boom")).http_status(),
            500
        );
    }

    #[test]
    fn display_prefixes() {
        assert_eq!(
            RecordError::NotFound("course 3".into()).to_string(),
            "not found: course 3"
        );
        assert_eq!(
            RecordError::Internal(anyhow::anyhow!("segfault")).to_string(),
            "internal: segfault"
        );
    }

    #[test]
    fn message_drops_prefix_and_hides_internals() {
        assert_eq!(
            RecordError::Conflict("1000 is already existed.".into()).message(),
            "1000 is already existed."
        );
        assert_eq!(
            RecordError::Internal(anyhow::anyhow!("pool timed out")).message(),
            "Internal server error"
        );
    }

    #[test]
    fn csv_errors_become_invalid_input() {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader("a,b\n1,2,3\n".as_bytes());
        let err = rdr.records().next().unwrap().unwrap_err();
        assert!(matches!(
            RecordError::from(err),
            RecordError::InvalidInput(_)
        ));
    }
}
