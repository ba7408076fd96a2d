use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // URL Errors
    #[error("Invalid URL")]
    InvalidUrl,

    // Cookie Errors
    #[error("Malformed cookie line")]
    CookieMalformed,
    #[error("Invalid cookie name")]
    CookieInvalidName,
    #[error("Invalid SameSite attribute")]
    CookieInvalidSameSite,
    #[error("Invalid Expires attribute")]
    CookieInvalidExpires,
    #[error("Invalid Max-Age attribute")]
    CookieInvalidMaxAge,
    #[error("Invalid cookie snapshot")]
    CookieSnapshotInvalid,

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::InvalidUrl => -300,
            // Cookie errors use a custom range starting at -1000
            NetError::CookieMalformed => -1000,
            NetError::CookieInvalidName => -1001,
            NetError::CookieInvalidSameSite => -1002,
            NetError::CookieInvalidExpires => -1003,
            NetError::CookieInvalidMaxAge => -1004,
            NetError::CookieSnapshotInvalid => -1005,
            NetError::Unknown(code) => *code,
        }
    }

    /// Whether this error came from validating cookie attributes, as opposed
    /// to failing to parse the surrounding text.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            NetError::CookieInvalidName | NetError::CookieInvalidSameSite
        )
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -300 => NetError::InvalidUrl,
            -1000 => NetError::CookieMalformed,
            -1001 => NetError::CookieInvalidName,
            -1002 => NetError::CookieInvalidSameSite,
            -1003 => NetError::CookieInvalidExpires,
            -1004 => NetError::CookieInvalidMaxAge,
            -1005 => NetError::CookieSnapshotInvalid,
            _ => NetError::Unknown(code),
        }
    }
}
