//! The cookie jar: the facade a request middleware talks to.
//!
//! A jar owns exactly one [`CookieCollection`] and layers policy on top of it:
//! - expired cookies are swept lazily before every URL lookup
//! - writes of already-expired cookies delete instead of store
//! - `Set-Cookie` batches are ingested header by header, skipping bad ones
//! - snapshots include session cookies only when configured to
//!
//! ```rust
//! use cookienet::cookies::jar::CookieJar;
//!
//! let mut jar = CookieJar::new();
//! jar.add_from_set_cookie_headers(
//!     ["session=abc123; Path=/; HttpOnly"],
//!     "https://example.com/login",
//! );
//!
//! let header = jar.get_cookie_header_for_url("https://example.com/api", None);
//! assert_eq!(header.as_deref(), Some("session=abc123"));
//! ```

use crate::base::neterror::NetError;
use crate::cookies::canonical_cookie::{CanonicalCookie, CookieId, RequestTarget};
use crate::cookies::collection::{CollectionKind, CookieCollection, DEFAULT_THRESHOLD};
use crate::cookies::factory::CollectionFactory;
use crate::cookies::persistence::{self, CookieRecord};
use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
use time::OffsetDateTime;

/// Configuration options for [`CookieJar`].
#[derive(Debug, Clone)]
pub struct CookieJarConfig {
    /// Include session cookies (no expiry) in snapshots (default: false).
    pub persist_session_cookies: bool,
    /// Use adaptive storage (default: true).
    pub adaptive: bool,
    /// Cookie count at which storage switches to the indexed strategy
    /// (default: 50, minimum 1).
    pub threshold: usize,
    /// Expected population, used to pick a fixed strategy when `adaptive`
    /// is false (default: 0).
    pub expected_count: usize,
}

impl Default for CookieJarConfig {
    fn default() -> Self {
        Self {
            persist_session_cookies: false,
            adaptive: true,
            threshold: DEFAULT_THRESHOLD,
            expected_count: 0,
        }
    }
}

impl CookieJarConfig {
    /// Create a config whose snapshots keep session cookies.
    pub fn persistent() -> Self {
        Self {
            persist_session_cookies: true,
            ..Default::default()
        }
    }

    /// Create a config with fixed indexed storage.
    pub fn indexed() -> Self {
        Self {
            adaptive: false,
            expected_count: DEFAULT_THRESHOLD,
            ..Default::default()
        }
    }
}

/// In-memory cookie jar.
///
/// Not synchronized: share it behind a lock or keep one jar per worker.
#[derive(Debug)]
pub struct CookieJar {
    collection: Box<dyn CookieCollection>,
    persist_session_cookies: bool,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self::with_config(CookieJarConfig::default())
    }

    pub fn with_config(config: CookieJarConfig) -> Self {
        let threshold = config.threshold.max(1);
        let collection = if config.adaptive {
            CollectionFactory::create_adaptive(threshold)
        } else {
            CollectionFactory::create(config.expected_count, threshold)
        };

        Self::with_collection(collection, config.persist_session_cookies)
    }

    pub fn with_collection(
        collection: Box<dyn CookieCollection>,
        persist_session_cookies: bool,
    ) -> Self {
        Self {
            collection,
            persist_session_cookies,
        }
    }

    pub fn collection_kind(&self) -> CollectionKind {
        self.collection.kind()
    }

    pub fn persist_session_cookies(&self) -> bool {
        self.persist_session_cookies
    }

    pub fn set_persist_session_cookies(&mut self, persist: bool) {
        self.persist_session_cookies = persist;
    }

    /// Store a cookie, replacing any cookie with the same identifier.
    ///
    /// An already-expired cookie is not stored; instead any existing cookie
    /// with its identifier is removed. Returns whether the cookie was stored.
    pub fn set_cookie(&mut self, cookie: CanonicalCookie) -> bool {
        if cookie.is_expired() {
            let id = cookie.identifier();
            if self.collection.remove(&id).is_some() {
                tracing::debug!(cookie = %id, "expired write removed stored cookie");
            }
            return false;
        }

        self.collection.add(cookie);
        true
    }

    /// Look up a live cookie by name, domain and path (`/` when omitted).
    pub fn get_cookie(
        &self,
        name: &str,
        domain: Option<&str>,
        path: Option<&str>,
    ) -> Option<&CanonicalCookie> {
        self.collection
            .get(&CookieId::new(name, domain, path))
            .filter(|cookie| !cookie.is_expired())
    }

    pub fn remove_cookie(
        &mut self,
        name: &str,
        domain: Option<&str>,
        path: Option<&str>,
    ) -> Option<CanonicalCookie> {
        self.collection.remove(&CookieId::new(name, domain, path))
    }

    /// Cookies to send with a request to `url`, most specific path first.
    ///
    /// Expired cookies are swept first. When `is_secure` is `None` it is
    /// inferred from an `https` scheme.
    pub fn get_cookies_for_url(
        &mut self,
        url: &str,
        is_secure: Option<bool>,
    ) -> Vec<CanonicalCookie> {
        let swept = self.collection.remove_expired();
        if swept > 0 {
            tracing::trace!(swept, "swept expired cookies before lookup");
        }

        let is_secure = match is_secure {
            Some(secure) => secure,
            None => RequestTarget::parse(url).is_some_and(|target| target.https),
        };
        self.collection.find_for_url(url, is_secure)
    }

    /// `Cookie` header value for `url`, or `None` if nothing matches.
    pub fn get_cookie_header_for_url(
        &mut self,
        url: &str,
        is_secure: Option<bool>,
    ) -> Option<String> {
        let cookies = self.get_cookies_for_url(url, is_secure);
        if cookies.is_empty() {
            return None;
        }

        let pairs: Vec<String> = cookies
            .iter()
            .map(CanonicalCookie::to_cookie_header)
            .collect();
        Some(pairs.join("; "))
    }

    /// Like [`get_cookie_header_for_url`](Self::get_cookie_header_for_url),
    /// as a header value ready to be merged into an outgoing request.
    pub fn cookie_header_value_for_url(
        &mut self,
        url: &str,
        is_secure: Option<bool>,
    ) -> Option<HeaderValue> {
        let header = self.get_cookie_header_for_url(url, is_secure)?;
        match HeaderValue::from_str(&header) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, "cookie header is not a valid header value");
                None
            }
        }
    }

    /// Ingest the `Set-Cookie` values of one response to `url`.
    ///
    /// Headers without a `Domain` attribute are scoped to the URL host. A
    /// header that fails to parse or validate is skipped and the rest of the
    /// batch is still processed. Returns the number of cookies stored.
    pub fn add_from_set_cookie_headers<I, S>(&mut self, headers: I, url: &str) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(target) = RequestTarget::parse(url) else {
            tracing::warn!(url, "discarding Set-Cookie headers for unparseable URL");
            return 0;
        };

        let mut stored = 0;
        for header in headers {
            let header = header.as_ref();
            match CanonicalCookie::from_set_cookie_header(header, Some(&target.host)) {
                Ok(cookie) => {
                    if self.set_cookie(cookie) {
                        stored += 1;
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, header, "skipping Set-Cookie header");
                }
            }
        }
        stored
    }

    /// Ingest every `Set-Cookie` header in a response header map.
    pub fn add_from_response_headers(&mut self, headers: &HeaderMap, url: &str) -> usize {
        let values: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| match value.to_str() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping non-text Set-Cookie header");
                    None
                }
            })
            .collect();

        self.add_from_set_cookie_headers(values, url)
    }

    /// Every stored cookie in storage order, optionally including expired ones.
    pub fn get_all_cookies(&self, include_expired: bool) -> Vec<CanonicalCookie> {
        let now = OffsetDateTime::now_utc();
        let mut cookies = self.collection.all();
        if !include_expired {
            cookies.retain(|cookie| !cookie.is_expired_at(now));
        }
        cookies
    }

    /// Number of stored cookies, including expired ones not yet swept.
    pub fn count(&self) -> usize {
        self.collection.count()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn clear(&mut self) {
        self.collection.clear();
    }

    /// Remove expired cookies. Returns how many were removed.
    pub fn remove_expired(&mut self) -> usize {
        self.collection.remove_expired()
    }

    /// Remove every session cookie, as at the end of a client session.
    pub fn clear_session_cookies(&mut self) -> usize {
        self.remove_where(CanonicalCookie::is_session)
    }

    /// Remove every cookie that would be sent to `domain`. Cookies without a
    /// domain are kept.
    pub fn clear_domain(&mut self, domain: &str) -> usize {
        self.remove_where(|cookie| cookie.domain().is_some() && cookie.matches_domain(domain))
    }

    fn remove_where(&mut self, predicate: impl Fn(&CanonicalCookie) -> bool) -> usize {
        let doomed: Vec<CookieId> = self
            .collection
            .all()
            .iter()
            .filter(|cookie| predicate(*cookie))
            .map(CanonicalCookie::identifier)
            .collect();

        for id in &doomed {
            self.collection.remove(id);
        }
        doomed.len()
    }

    /// Snapshot of every live cookie in storage order. Session cookies are
    /// included only if the jar persists them.
    pub fn to_records(&self) -> Vec<CookieRecord> {
        let now = OffsetDateTime::now_utc();
        self.collection
            .all()
            .iter()
            .filter(|cookie| !cookie.is_expired_at(now))
            .filter(|cookie| self.persist_session_cookies || !cookie.is_session())
            .map(CanonicalCookie::to_record)
            .collect()
    }

    /// Load snapshot records into the jar.
    ///
    /// Each record goes through normal cookie construction; records that fail
    /// validation or are already expired are skipped. Returns the number of
    /// cookies loaded.
    pub fn load_records<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = CookieRecord>,
    {
        let mut loaded = 0;
        for record in records {
            let name = record.name.clone();
            match CanonicalCookie::try_from(record) {
                Ok(cookie) => {
                    if self.set_cookie(cookie) {
                        loaded += 1;
                    } else {
                        tracing::debug!(name = %name, "skipping expired cookie record");
                    }
                }
                Err(e) => {
                    tracing::debug!(name = %name, error = %e, "skipping invalid cookie record");
                }
            }
        }
        loaded
    }

    /// Snapshot as a JSON array of records.
    pub fn export_json(&self) -> Result<String, NetError> {
        persistence::encode_json(&self.to_records())
    }

    /// Load a JSON snapshot. Fails only if the document is not a JSON array.
    pub fn import_json(&mut self, json: &str) -> Result<usize, NetError> {
        let records = persistence::decode_json(json)?;
        Ok(self.load_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::canonical_cookie::SameSite;
    use time::Duration;

    fn cookie(name: &str, path: &str) -> CanonicalCookie {
        CanonicalCookie::new(name, format!("{}-value", name))
            .unwrap()
            .with_domain("example.com")
            .with_path(path)
    }

    fn expired(name: &str) -> CanonicalCookie {
        cookie(name, "/").with_expires_at(Some(OffsetDateTime::now_utc() - Duration::hours(1)))
    }

    fn lasting(name: &str) -> CanonicalCookie {
        cookie(name, "/").with_expires_at(Some(OffsetDateTime::now_utc() + Duration::days(1)))
    }

    #[test]
    fn test_default_config() {
        let config = CookieJarConfig::default();
        assert!(!config.persist_session_cookies);
        assert!(config.adaptive);
        assert_eq!(config.threshold, 50);

        assert_eq!(CookieJar::new().collection_kind(), CollectionKind::Adaptive);
        assert_eq!(
            CookieJar::with_config(CookieJarConfig::indexed()).collection_kind(),
            CollectionKind::Indexed
        );
        let fixed_linear = CookieJarConfig {
            adaptive: false,
            ..Default::default()
        };
        assert_eq!(
            CookieJar::with_config(fixed_linear).collection_kind(),
            CollectionKind::Linear
        );
    }

    #[test]
    fn test_set_cookie_last_write_wins() {
        let mut jar = CookieJar::new();
        assert!(jar.set_cookie(cookie("a", "/")));
        assert!(jar.set_cookie(cookie("a", "/").with_value("second")));

        assert_eq!(jar.count(), 1);
        let stored = jar.get_cookie("a", Some("example.com"), None).unwrap();
        assert_eq!(stored.value(), "second");
    }

    #[test]
    fn test_expired_write_deletes() {
        let mut jar = CookieJar::new();
        jar.set_cookie(cookie("a", "/"));
        assert!(!jar.set_cookie(expired("a")));
        assert_eq!(jar.count(), 0);

        assert!(!jar.set_cookie(expired("never-stored")));
        assert_eq!(jar.count(), 0);
    }

    #[test]
    fn test_get_cookie_misses() {
        let mut jar = CookieJar::new();
        jar.set_cookie(cookie("a", "/api"));

        assert!(jar.get_cookie("a", Some("example.com"), None).is_none());
        assert!(jar.get_cookie("a", Some("EXAMPLE.com"), Some("/api")).is_some());
        assert!(jar.get_cookie("b", Some("example.com"), Some("/api")).is_none());
        assert!(jar.get_cookie_header_for_url("https://other.test/", None).is_none());
    }

    #[test]
    fn test_remove_cookie() {
        let mut jar = CookieJar::new();
        jar.set_cookie(cookie("a", "/"));
        assert!(jar.remove_cookie("a", Some("example.com"), None).is_some());
        assert!(jar.remove_cookie("a", Some("example.com"), None).is_none());
        assert!(jar.is_empty());
    }

    #[test]
    fn test_lookup_sweeps_expired() {
        let linear = CollectionFactory::of_kind(CollectionKind::Linear);
        let mut jar = CookieJar::with_collection(linear, false);
        jar.collection.add(expired("stale"));
        jar.set_cookie(lasting("fresh"));
        assert_eq!(jar.count(), 2);

        let found = jar.get_cookies_for_url("https://example.com/", None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "fresh");
        assert_eq!(jar.count(), 1);
    }

    #[test]
    fn test_secure_inferred_from_scheme() {
        let mut jar = CookieJar::new();
        jar.set_cookie(cookie("s", "/").with_secure(true));

        assert_eq!(jar.get_cookies_for_url("https://example.com/", None).len(), 1);
        assert!(jar.get_cookies_for_url("http://example.com/", None).is_empty());
        assert_eq!(jar.get_cookies_for_url("http://example.com/", Some(true)).len(), 1);
        assert!(jar.get_cookies_for_url("https://example.com/", Some(false)).is_empty());
    }

    #[test]
    fn test_header_joins_in_path_order() {
        let mut jar = CookieJar::new();
        jar.set_cookie(cookie("root", "/"));
        jar.set_cookie(cookie("api", "/api"));

        let header = jar.get_cookie_header_for_url("https://example.com/api/x", None);
        assert_eq!(header.as_deref(), Some("api=api-value; root=root-value"));

        let value = jar
            .cookie_header_value_for_url("https://example.com/api/x", None)
            .unwrap();
        assert_eq!(value, "api=api-value; root=root-value");
    }

    #[test]
    fn test_ingest_skips_bad_headers() {
        let mut jar = CookieJar::new();
        let stored = jar.add_from_set_cookie_headers(
            [
                "good=1; Path=/",
                "bad name=2",
                "worse=3; SameSite=Whenever",
                "nodelimiter",
                "also_good=4; Domain=.example.com",
            ],
            "https://www.example.com/login",
        );

        assert_eq!(stored, 2);
        assert_eq!(jar.count(), 2);
        assert!(jar.get_cookie("good", Some("www.example.com"), None).is_some());
        assert!(jar.get_cookie("also_good", Some(".example.com"), None).is_some());
    }

    #[test]
    fn test_ingest_with_bad_url() {
        let mut jar = CookieJar::new();
        assert_eq!(jar.add_from_set_cookie_headers(["a=1"], "not a url"), 0);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_ingest_max_age_zero_deletes() {
        let mut jar = CookieJar::new();
        let url = "https://example.com/";
        jar.add_from_set_cookie_headers(["token=abc"], url);
        assert_eq!(jar.count(), 1);

        assert_eq!(jar.add_from_set_cookie_headers(["token=; Max-Age=0"], url), 0);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_response_header_map() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_bytes(b"c=\xff").unwrap());

        let mut jar = CookieJar::new();
        assert_eq!(jar.add_from_response_headers(&headers, "https://example.com/"), 2);
    }

    #[test]
    fn test_get_all_cookies_filters_expired() {
        let indexed = CollectionFactory::of_kind(CollectionKind::Indexed);
        let mut jar = CookieJar::with_collection(indexed, false);
        jar.collection.add(expired("old"));
        jar.set_cookie(lasting("new"));

        assert_eq!(jar.get_all_cookies(true).len(), 2);
        let live = jar.get_all_cookies(false);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].name(), "new");

        assert_eq!(jar.remove_expired(), 1);
        assert_eq!(jar.count(), 1);
    }

    #[test]
    fn test_clear_session_cookies() {
        let mut jar = CookieJar::new();
        jar.set_cookie(cookie("session", "/"));
        jar.set_cookie(lasting("persistent"));

        assert_eq!(jar.clear_session_cookies(), 1);
        assert_eq!(jar.count(), 1);
        assert!(jar.get_cookie("persistent", Some("example.com"), None).is_some());
    }

    #[test]
    fn test_clear_domain() {
        let mut jar = CookieJar::new();
        jar.set_cookie(cookie("a", "/"));
        jar.set_cookie(
            CanonicalCookie::new("b", "v")
                .unwrap()
                .with_domain("other.test"),
        );
        jar.set_cookie(CanonicalCookie::new("global", "v").unwrap());

        assert_eq!(jar.clear_domain("www.example.com"), 1);
        assert_eq!(jar.count(), 2);
    }

    #[test]
    fn test_clear_resets_adaptive_storage() {
        let mut jar = CookieJar::with_config(CookieJarConfig {
            threshold: 2,
            ..Default::default()
        });
        jar.set_cookie(cookie("a", "/"));
        jar.set_cookie(cookie("b", "/"));
        jar.clear();
        assert!(jar.is_empty());
        assert_eq!(jar.collection_kind(), CollectionKind::Adaptive);
    }

    #[test]
    fn test_records_respect_session_policy() {
        let mut jar = CookieJar::new();
        jar.set_cookie(cookie("session", "/"));
        jar.set_cookie(lasting("persistent").with_same_site(Some(SameSite::Lax)));

        let records = jar.to_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "persistent");

        jar.set_persist_session_cookies(true);
        assert_eq!(jar.to_records().len(), 2);
    }

    #[test]
    fn test_load_records_skips_invalid_and_expired() {
        let good = lasting("good").to_record();
        let mut bad = lasting("bad").to_record();
        bad.same_site = Some("Sometimes".to_string());
        let stale = expired("stale").to_record();

        let mut jar = CookieJar::new();
        assert_eq!(jar.load_records(vec![good, bad, stale]), 1);
        assert_eq!(jar.count(), 1);
    }

    #[test]
    fn test_json_snapshot_roundtrip() {
        let mut jar = CookieJar::with_config(CookieJarConfig::persistent());
        jar.set_cookie(cookie("session", "/").with_http_only(true));
        jar.set_cookie(lasting("persistent").with_secure(true));

        let json = jar.export_json().unwrap();
        let mut restored = CookieJar::with_config(CookieJarConfig::persistent());
        assert_eq!(restored.import_json(&json).unwrap(), 2);
        assert_eq!(restored.to_records(), jar.to_records());
    }
}
