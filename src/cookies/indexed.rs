//! Domain-indexed cookie storage.
//!
//! Alongside the primary identifier map, cookies are registered in a
//! `domain -> identifiers` index. A cookie for `example.com` is registered
//! under both `example.com` and `.example.com`; a cookie without a domain is
//! registered under the empty key. A lookup for `a.b.example.com` then only
//! needs to visit the buckets:
//!
//! | Key | Why |
//! |-----|-----|
//! | `a.b.example.com` | exact host |
//! | `.a.b.example.com` | host as a parent domain |
//! | `.b.example.com`, `.example.com`, `.com` | every parent suffix |
//! | empty | cookies without a domain |
//!
//! Bucket membership is only a pre-filter: every candidate is still checked
//! against the URL for path, secure flag and expiry.

use crate::cookies::canonical_cookie::{CanonicalCookie, CookieId, RequestTarget};
use crate::cookies::collection::{sort_by_path_specificity, CollectionKind, CookieCollection};
use indexmap::{IndexMap, IndexSet};
use time::OffsetDateTime;

#[derive(Debug, Clone, Default)]
pub struct IndexedCollection {
    cookies: IndexMap<CookieId, CanonicalCookie>,
    domain_index: IndexMap<String, IndexSet<CookieId>>,
}

impl IndexedCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cookies: IndexMap::with_capacity(capacity),
            domain_index: IndexMap::new(),
        }
    }

    /// Number of domain keys currently in the index.
    pub fn domain_bucket_count(&self) -> usize {
        self.domain_index.len()
    }

    fn unindex(&mut self, id: &CookieId, keys: &[String]) {
        for key in keys {
            if let Some(bucket) = self.domain_index.get_mut(key) {
                bucket.shift_remove(id);
                if bucket.is_empty() {
                    self.domain_index.shift_remove(key);
                }
            }
        }
    }

    /// Every index entry points at a stored cookie registered under that key,
    /// and every stored cookie is present under all of its keys.
    #[cfg(test)]
    pub(crate) fn index_is_consistent(&self) -> bool {
        let indexed_ok = self.domain_index.iter().all(|(key, bucket)| {
            !bucket.is_empty()
                && bucket.iter().all(|id| {
                    self.cookies
                        .get(id)
                        .is_some_and(|c| index_keys(c.domain()).contains(key))
                })
        });
        let stored_ok = self.cookies.iter().all(|(id, cookie)| {
            index_keys(cookie.domain()).iter().all(|key| {
                self.domain_index
                    .get(key)
                    .is_some_and(|bucket| bucket.contains(id))
            })
        });
        indexed_ok && stored_ok
    }
}

impl FromIterator<CanonicalCookie> for IndexedCollection {
    fn from_iter<I: IntoIterator<Item = CanonicalCookie>>(iter: I) -> Self {
        let mut collection = Self::new();
        for cookie in iter {
            collection.add(cookie);
        }
        collection
    }
}

/// Index keys a cookie is registered under: its domain as stored plus the
/// dotted parent form.
fn index_keys(domain: Option<&str>) -> Vec<String> {
    let Some(domain) = domain else {
        return vec![String::new()];
    };

    let bare = domain.strip_prefix('.').unwrap_or(domain);
    if bare.is_empty() || domain.starts_with('.') {
        return vec![domain.to_string()];
    }
    vec![domain.to_string(), format!(".{}", bare)]
}

/// Index keys that may hold cookies for `host`.
fn candidate_keys(host: &str) -> Vec<String> {
    let mut keys = vec![host.to_string(), format!(".{}", host)];

    let mut rest = host;
    while let Some((_, parent)) = rest.split_once('.') {
        if parent.is_empty() {
            break;
        }
        keys.push(format!(".{}", parent));
        rest = parent;
    }

    keys.push(String::new());
    keys
}

impl CookieCollection for IndexedCollection {
    fn add(&mut self, cookie: CanonicalCookie) {
        let id = cookie.identifier();

        if let Some(previous) = self.cookies.get(&id) {
            let stale = index_keys(previous.domain());
            self.unindex(&id, &stale);
        }

        for key in index_keys(cookie.domain()) {
            self.domain_index.entry(key).or_default().insert(id.clone());
        }
        self.cookies.insert(id, cookie);
    }

    fn remove(&mut self, id: &CookieId) -> Option<CanonicalCookie> {
        let cookie = self.cookies.shift_remove(id)?;
        self.unindex(id, &index_keys(cookie.domain()));
        Some(cookie)
    }

    fn get(&self, id: &CookieId) -> Option<&CanonicalCookie> {
        self.cookies.get(id)
    }

    fn find_for_url(&self, url: &str, is_secure: bool) -> Vec<CanonicalCookie> {
        let Some(target) = RequestTarget::parse(url) else {
            return Vec::new();
        };
        let now = OffsetDateTime::now_utc();

        // Positions in the primary map, so ties come out in storage order
        // exactly as they would from a linear scan.
        let mut positions: Vec<usize> = candidate_keys(&target.host)
            .iter()
            .filter_map(|key| self.domain_index.get(key))
            .flatten()
            .filter_map(|id| self.cookies.get_index_of(id))
            .collect();
        positions.sort_unstable();
        positions.dedup();
        let candidates = positions.len();

        let mut matches: Vec<CanonicalCookie> = positions
            .into_iter()
            .filter_map(|pos| self.cookies.get_index(pos).map(|(_, cookie)| cookie))
            .filter(|c| !c.is_expired_at(now) && c.matches_target(&target, is_secure))
            .cloned()
            .collect();
        sort_by_path_specificity(&mut matches);

        tracing::trace!(
            host = %target.host,
            candidates,
            matched = matches.len(),
            "indexed cookie lookup"
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
        self.domain_index.clear();
    }

    fn remove_expired_at(&mut self, now: OffsetDateTime) -> usize {
        let expired: Vec<CookieId> = self
            .cookies
            .iter()
            .filter(|(_, cookie)| cookie.is_expired_at(now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.remove(id);
        }
        expired.len()
    }

    fn kind(&self) -> CollectionKind {
        CollectionKind::Indexed
    }

    fn into_cookies(self: Box<Self>) -> Vec<CanonicalCookie> {
        self.cookies.into_values().collect()
    }
}
