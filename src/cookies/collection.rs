//! Cookie storage contract shared by every storage strategy.

use crate::cookies::canonical_cookie::{CanonicalCookie, CookieId};
use std::fmt;
use time::OffsetDateTime;

/// Default cookie count at which adaptive storage switches to the indexed
/// strategy.
pub const DEFAULT_THRESHOLD: usize = 50;

/// Storage strategy reported by [`CookieCollection::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Linear,
    Indexed,
    Adaptive,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Linear => "linear",
            CollectionKind::Indexed => "indexed",
            CollectionKind::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage for cookies keyed by [`CookieId`].
///
/// Implementations agree on semantics and differ only in lookup cost:
/// - `add` replaces any cookie with the same identifier
/// - `find_for_url` returns live matches ordered by descending path length,
///   ties keeping storage order
/// - unparseable URLs match nothing
pub trait CookieCollection: fmt::Debug + Send {
    /// Store a cookie, replacing any existing cookie with the same identifier.
    fn add(&mut self, cookie: CanonicalCookie);

    /// Remove a cookie by identifier. Returns the removed cookie, if any.
    fn remove(&mut self, id: &CookieId) -> Option<CanonicalCookie>;

    fn get(&self, id: &CookieId) -> Option<&CanonicalCookie>;

    /// Cookies applicable to `url`, most specific path first.
    fn find_for_url(&self, url: &str, is_secure: bool) -> Vec<CanonicalCookie>;

    /// Every stored cookie, including expired ones, in storage order.
    fn all(&self) -> Vec<CanonicalCookie>;

    fn count(&self) -> usize;

    fn clear(&mut self);

    /// Remove every cookie expired at `now`. Returns how many were removed.
    fn remove_expired_at(&mut self, now: OffsetDateTime) -> usize;

    fn kind(&self) -> CollectionKind;

    /// Move every cookie out in storage order.
    fn into_cookies(self: Box<Self>) -> Vec<CanonicalCookie>;

    fn remove_expired(&mut self) -> usize {
        self.remove_expired_at(OffsetDateTime::now_utc())
    }

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Order matches by descending path length. The sort is stable, so equal
/// lengths keep the order the storage yielded them in.
pub(crate) fn sort_by_path_specificity(cookies: &mut [CanonicalCookie]) {
    cookies.sort_by(|a, b| b.path().len().cmp(&a.path().len()));
}
