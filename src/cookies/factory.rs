//! Strategy selection and migration between cookie collections.

use crate::cookies::adaptive::AdaptiveCollection;
use crate::cookies::canonical_cookie::CanonicalCookie;
use crate::cookies::collection::{CollectionKind, CookieCollection, DEFAULT_THRESHOLD};
use crate::cookies::indexed::IndexedCollection;
use crate::cookies::linear::LinearCollection;

/// Factory for [`CookieCollection`] strategies.
pub struct CollectionFactory;

impl CollectionFactory {
    /// Pick a strategy for `expected_count` cookies: indexed at or above
    /// `threshold`, linear below it.
    pub fn create(expected_count: usize, threshold: usize) -> Box<dyn CookieCollection> {
        if expected_count >= threshold.max(1) {
            Box::new(IndexedCollection::with_capacity(expected_count))
        } else {
            Box::new(LinearCollection::with_capacity(expected_count))
        }
    }

    pub fn create_adaptive(threshold: usize) -> Box<dyn CookieCollection> {
        Box::new(AdaptiveCollection::with_threshold(threshold))
    }

    /// Empty collection of the given kind. Adaptive collections use
    /// [`DEFAULT_THRESHOLD`].
    pub fn of_kind(kind: CollectionKind) -> Box<dyn CookieCollection> {
        match kind {
            CollectionKind::Linear => Box::new(LinearCollection::new()),
            CollectionKind::Indexed => Box::new(IndexedCollection::new()),
            CollectionKind::Adaptive => Self::create_adaptive(DEFAULT_THRESHOLD),
        }
    }

    /// Build a collection sized for `cookies` and add them all.
    pub fn from_cookies(
        cookies: Vec<CanonicalCookie>,
        threshold: usize,
    ) -> Box<dyn CookieCollection> {
        let mut collection = Self::create(cookies.len(), threshold);
        for cookie in cookies {
            collection.add(cookie);
        }
        collection
    }

    /// Move every cookie from `source` into a new collection of `target`
    /// kind, in `source` storage order. Returns `source` unchanged if it is
    /// already of that kind.
    pub fn migrate(
        source: Box<dyn CookieCollection>,
        target: CollectionKind,
    ) -> Box<dyn CookieCollection> {
        if source.kind() == target {
            return source;
        }

        let mut migrated = Self::of_kind(target);
        for cookie in source.into_cookies() {
            migrated.add(cookie);
        }
        migrated
    }
}
