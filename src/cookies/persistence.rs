//! Cookie snapshots - the record shape used to persist a jar externally.
//!
//! The jar deals only in [`CookieRecord`] values; where they are stored is up
//! to the caller. JSON helpers are provided because the record shape is
//! JSON-serializable, and decoding recovers per record so that one damaged
//! entry does not discard the rest of a snapshot.

use crate::base::neterror::NetError;
use crate::cookies::canonical_cookie::CanonicalCookie;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Serializable representation of a cookie for persistence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    /// Expiry as unix seconds; `None` for session cookies.
    pub expires_at: Option<i64>,
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
}

impl From<&CanonicalCookie> for CookieRecord {
    fn from(cookie: &CanonicalCookie) -> Self {
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            expires_at: cookie.expires_at().map(OffsetDateTime::unix_timestamp),
            domain: cookie.domain().map(str::to_string),
            path: cookie.path().to_string(),
            secure: cookie.secure(),
            http_only: cookie.http_only(),
            same_site: cookie.same_site().map(|s| s.to_string()),
        }
    }
}

impl TryFrom<CookieRecord> for CanonicalCookie {
    type Error = NetError;

    /// Rebuild a cookie through normal construction, so records are
    /// validated exactly like freshly parsed cookies.
    fn try_from(record: CookieRecord) -> Result<Self, Self::Error> {
        let same_site = record.same_site.as_deref().map(str::parse).transpose()?;
        let expires_at = record
            .expires_at
            .map(|secs| {
                OffsetDateTime::from_unix_timestamp(secs)
                    .map_err(|_| NetError::CookieInvalidExpires)
            })
            .transpose()?;

        let mut cookie = CanonicalCookie::new(record.name, record.value)?
            .with_path(&record.path)
            .with_expires_at(expires_at)
            .with_secure(record.secure)
            .with_http_only(record.http_only)
            .with_same_site(same_site);

        if let Some(domain) = record.domain {
            cookie = cookie.with_domain(domain);
        }

        Ok(cookie)
    }
}

/// Encode records as a JSON array.
pub fn encode_json(records: &[CookieRecord]) -> Result<String, NetError> {
    serde_json::to_string_pretty(records).map_err(|e| {
        tracing::debug!(error = %e, "failed to encode cookie snapshot");
        NetError::CookieSnapshotInvalid
    })
}

/// Decode a JSON array of records.
///
/// Fails only if the document is not a JSON array. Elements that do not
/// have the record shape are logged and skipped.
pub fn decode_json(json: &str) -> Result<Vec<CookieRecord>, NetError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|e| {
        tracing::debug!(error = %e, "cookie snapshot is not a JSON array");
        NetError::CookieSnapshotInvalid
    })?;

    let records = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(index, error = %e, "skipping malformed cookie record");
                None
            }
        })
        .collect();

    Ok(records)
}
