//! Linear-scan cookie storage.
//!
//! Every lookup tests every stored cookie, which is the cheapest option while
//! the jar holds only a handful of cookies.

use crate::cookies::canonical_cookie::{CanonicalCookie, CookieId, RequestTarget};
use crate::cookies::collection::{sort_by_path_specificity, CollectionKind, CookieCollection};
use indexmap::IndexMap;
use time::OffsetDateTime;

#[derive(Debug, Clone, Default)]
pub struct LinearCollection {
    // Replacing a cookie keeps its original slot.
    cookies: IndexMap<CookieId, CanonicalCookie>,
}

impl LinearCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cookies: IndexMap::with_capacity(capacity),
        }
    }
}

impl FromIterator<CanonicalCookie> for LinearCollection {
    fn from_iter<I: IntoIterator<Item = CanonicalCookie>>(iter: I) -> Self {
        let mut collection = Self::new();
        for cookie in iter {
            collection.add(cookie);
        }
        collection
    }
}

impl CookieCollection for LinearCollection {
    fn add(&mut self, cookie: CanonicalCookie) {
        self.cookies.insert(cookie.identifier(), cookie);
    }

    fn remove(&mut self, id: &CookieId) -> Option<CanonicalCookie> {
        self.cookies.shift_remove(id)
    }

    fn get(&self, id: &CookieId) -> Option<&CanonicalCookie> {
        self.cookies.get(id)
    }

    fn find_for_url(&self, url: &str, is_secure: bool) -> Vec<CanonicalCookie> {
        let Some(target) = RequestTarget::parse(url) else {
            return Vec::new();
        };
        let now = OffsetDateTime::now_utc();

        let mut matches: Vec<CanonicalCookie> = self
            .cookies
            .values()
            .filter(|c| !c.is_expired_at(now) && c.matches_target(&target, is_secure))
            .cloned()
            .collect();
        sort_by_path_specificity(&mut matches);

        tracing::trace!(
            host = %target.host,
            scanned = self.cookies.len(),
            matched = matches.len(),
            "linear cookie lookup"
        );
        matches
    }

    fn all(&self) -> Vec<CanonicalCookie> {
        self.cookies.values().cloned().collect()
    }

    fn count(&self) -> usize {
        self.cookies.len()
    }

    fn clear(&mut self) {
        self.cookies.clear();
    }

    fn remove_expired_at(&mut self, now: OffsetDateTime) -> usize {
        let before = self.cookies.len();
        self.cookies.retain(|_, cookie| !cookie.is_expired_at(now));
        before - self.cookies.len()
    }

    fn kind(&self) -> CollectionKind {
        CollectionKind::Linear
    }

    fn into_cookies(self: Box<Self>) -> Vec<CanonicalCookie> {
        self.cookies.into_values().collect()
    }
}
