use crate::base::neterror::NetError;
use crate::cookies::persistence::CookieRecord;
use std::fmt;
use std::str::FromStr;
use time::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use url::Url;

/// Accepted `Expires` layouts: RFC 1123, the dashed Netscape variant, asctime.
const HTTP_DATE_FORMATS: [&str; 3] = [
    "[weekday repr:short case_sensitive:false], [day] [month repr:short case_sensitive:false] \
     [year] [hour]:[minute]:[second] GMT",
    "[weekday repr:short case_sensitive:false], [day]-[month repr:short case_sensitive:false]-\
     [year] [hour]:[minute]:[second] GMT",
    "[weekday repr:short case_sensitive:false] [month repr:short case_sensitive:false] \
     [day padding:space] [hour]:[minute]:[second] [year]",
];

const HTTP_DATE_OUTPUT: &str =
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT";

/// SameSite attribute of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl FromStr for SameSite {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("strict") {
            Ok(SameSite::Strict)
        } else if s.eq_ignore_ascii_case("lax") {
            Ok(SameSite::Lax)
        } else if s.eq_ignore_ascii_case("none") {
            Ok(SameSite::None)
        } else {
            Err(NetError::CookieInvalidSameSite)
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniqueness key of a cookie within a jar: `(name, domain, path)`.
///
/// Rendered as `name|domain|path`, with an empty segment for a missing domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CookieId {
    name: String,
    domain: String,
    path: String,
}

impl CookieId {
    /// Build an identifier the same way [`CanonicalCookie`] does, so lookups
    /// normalize domain case and the default path.
    pub fn new(name: &str, domain: Option<&str>, path: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            domain: domain.map(str::to_ascii_lowercase).unwrap_or_default(),
            path: normalize_path(path.unwrap_or("/")),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for CookieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.name, self.domain, self.path)
    }
}

/// Represents a cookie.
///
/// Instances are immutable: every `with_*` method returns a new cookie and
/// leaves the original untouched, so a cookie can be shared between a
/// collection and its domain index without aliasing surprises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCookie {
    name: String,
    value: String,
    expires_at: Option<OffsetDateTime>,
    domain: Option<String>,
    path: String,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl CanonicalCookie {
    /// Create a session cookie for path `/` with no domain.
    ///
    /// Fails with [`NetError::CookieInvalidName`] if the name is empty or
    /// contains whitespace, `;`, `,`, `=` or control characters.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, NetError> {
        let name = name.into();
        validate_name(&name)?;

        Ok(Self {
            name,
            value: value.into(),
            expires_at: None,
            domain: None,
            path: "/".to_string(),
            secure: false,
            http_only: false,
            same_site: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    pub fn identifier(&self) -> CookieId {
        CookieId {
            name: self.name.clone(),
            domain: self.domain.clone().unwrap_or_default(),
            path: self.path.clone(),
        }
    }

    /// Copy of this cookie carrying a different value.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..self.clone()
        }
    }

    /// Set the domain. It is stored lower-case; an empty domain clears it.
    pub fn with_domain(self, domain: impl Into<String>) -> Self {
        let domain = domain.into().to_ascii_lowercase();
        Self {
            domain: (!domain.is_empty()).then_some(domain),
            ..self
        }
    }

    pub fn with_path(self, path: impl AsRef<str>) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            ..self
        }
    }

    pub fn with_expires_at(self, expires_at: Option<OffsetDateTime>) -> Self {
        Self { expires_at, ..self }
    }

    /// Expire `seconds` from now. Zero or negative values expire immediately.
    pub fn with_max_age(self, seconds: i64) -> Self {
        let expires_at = expiry_from_max_age(seconds, OffsetDateTime::now_utc());
        self.with_expires_at(Some(expires_at))
    }

    pub fn with_secure(self, secure: bool) -> Self {
        Self { secure, ..self }
    }

    pub fn with_http_only(self, http_only: bool) -> Self {
        Self { http_only, ..self }
    }

    pub fn with_same_site(self, same_site: Option<SameSite>) -> Self {
        Self { same_site, ..self }
    }

    /// A cookie without an expiry lives for the client session only.
    pub fn is_session(&self) -> bool {
        self.expires_at.is_none()
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expiry| now >= expiry)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Check if the cookie domain covers `host`.
    ///
    /// `example.com` and `.example.com` both match the host itself and any
    /// subdomain, but never a host that merely ends with the same characters
    /// (`notexample.com`). A cookie without a domain matches every host.
    pub fn matches_domain(&self, host: &str) -> bool {
        let Some(domain) = self.domain.as_deref() else {
            return true;
        };

        let bare = domain.strip_prefix('.').unwrap_or(domain);
        if bare.is_empty() {
            return false;
        }

        if host.eq_ignore_ascii_case(bare) {
            return true;
        }

        let host = host.as_bytes();
        if host.len() <= bare.len() {
            return false;
        }
        let split = host.len() - bare.len();
        host[split..].eq_ignore_ascii_case(bare.as_bytes()) && host[split - 1] == b'.'
    }

    /// Check if the request path falls under the cookie path.
    /// `/api` matches `/api` and `/api/users` but not `/apiv2`.
    pub fn matches_path(&self, request_path: &str) -> bool {
        let request_path = if request_path.is_empty() {
            "/"
        } else {
            request_path
        };

        if request_path == self.path {
            return true;
        }

        match request_path.strip_prefix(self.path.as_str()) {
            Some(rest) => self.path.ends_with('/') || rest.starts_with('/'),
            None => false,
        }
    }

    /// Check domain, path and the secure flag against a request URL.
    /// Unparseable URLs never match.
    pub fn matches_url(&self, url: &str, is_secure_request: bool) -> bool {
        RequestTarget::parse(url)
            .is_some_and(|target| self.matches_target(&target, is_secure_request))
    }

    pub(crate) fn matches_target(&self, target: &RequestTarget, is_secure_request: bool) -> bool {
        if self.secure && !is_secure_request {
            return false;
        }
        self.matches_domain(&target.host) && self.matches_path(&target.path)
    }

    /// Parse a `Set-Cookie` header value.
    ///
    /// `default_domain` is used when the header carries no `Domain`
    /// attribute. `Max-Age` wins over `Expires` regardless of order.
    pub fn from_set_cookie_header(
        header: &str,
        default_domain: Option<&str>,
    ) -> Result<Self, NetError> {
        Self::parse_at(header, default_domain, OffsetDateTime::now_utc())
    }

    fn parse_at(
        header: &str,
        default_domain: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<Self, NetError> {
        let mut segments = header.split(';');
        let pair = segments.next().unwrap_or_default().trim();
        let (name, value) = pair.split_once('=').ok_or(NetError::CookieMalformed)?;
        let mut cookie = Self::new(name.trim(), unquote(value.trim()))?;

        let mut expires = None;
        let mut max_age = None;
        let mut domain = None;

        for attr in segments {
            let attr = attr.trim();
            if attr.is_empty() {
                continue;
            }

            let (key, val) = match attr.split_once('=') {
                Some((key, val)) => (key.trim(), val.trim()),
                None => (attr, ""),
            };

            match key.to_ascii_lowercase().as_str() {
                "expires" => {
                    let parsed =
                        parse_http_date(unquote(val)).ok_or(NetError::CookieInvalidExpires)?;
                    expires = Some(parsed);
                }
                "max-age" => {
                    let secs = val
                        .parse::<i64>()
                        .map_err(|_| NetError::CookieInvalidMaxAge)?;
                    max_age = Some(secs);
                }
                "domain" if !val.is_empty() => domain = Some(val),
                "path" => cookie.path = normalize_path(val),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "samesite" => cookie.same_site = Some(val.parse()?),
                _ => {}
            }
        }

        cookie.expires_at = match max_age {
            Some(secs) => Some(expiry_from_max_age(secs, now)),
            None => expires,
        };

        match domain.or(default_domain) {
            Some(domain) => Ok(cookie.with_domain(domain)),
            None => Ok(cookie),
        }
    }

    /// Render the response-side form: `name=value` followed by the present
    /// attributes in a fixed order (Expires, Domain, Path, Secure, HttpOnly,
    /// SameSite).
    pub fn to_set_cookie_header(&self) -> String {
        let mut header = self.to_cookie_header();

        if let Some(expires) = self.expires_at.and_then(format_http_date) {
            header.push_str("; Expires=");
            header.push_str(&expires);
        }
        if let Some(domain) = &self.domain {
            header.push_str("; Domain=");
            header.push_str(domain);
        }
        header.push_str("; Path=");
        header.push_str(&self.path);
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        if let Some(same_site) = self.same_site {
            header.push_str("; SameSite=");
            header.push_str(same_site.as_str());
        }

        header
    }

    /// Render the request-side `name=value` pair.
    pub fn to_cookie_header(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    pub fn to_record(&self) -> CookieRecord {
        CookieRecord::from(self)
    }
}

impl fmt::Display for CanonicalCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_set_cookie_header())
    }
}

/// Host, path and scheme of a request URL, extracted once per lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestTarget {
    pub(crate) host: String,
    pub(crate) path: String,
    pub(crate) https: bool,
}

impl RequestTarget {
    pub(crate) fn parse(url: &str) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        Some(Self {
            host,
            path: url.path().to_string(),
            https: url.scheme() == "https",
        })
    }
}

fn validate_name(name: &str) -> Result<(), NetError> {
    let invalid = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, ';' | ',' | '='));

    if invalid {
        Err(NetError::CookieInvalidName)
    } else {
        Ok(())
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        "/".to_string()
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn expiry_from_max_age(seconds: i64, now: OffsetDateTime) -> OffsetDateTime {
    if seconds <= 0 {
        return OffsetDateTime::UNIX_EPOCH;
    }
    now.checked_add(Duration::seconds(seconds))
        .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
}

/// Parse an HTTP-date as used by the `Expires` attribute.
pub(crate) fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
    HTTP_DATE_FORMATS.iter().find_map(|layout| {
        let items = format_description::parse(layout).ok()?;
        PrimitiveDateTime::parse(value, &items)
            .ok()
            .map(PrimitiveDateTime::assume_utc)
    })
}

pub(crate) fn format_http_date(at: OffsetDateTime) -> Option<String> {
    let items = format_description::parse(HTTP_DATE_OUTPUT).ok()?;
    at.to_offset(UtcOffset::UTC).format(&items).ok()
}
