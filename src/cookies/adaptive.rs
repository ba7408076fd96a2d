//! Storage that switches strategy as the cookie population changes.
//!
//! Starts as a [`LinearCollection`]. An `add` that brings the count up to the
//! threshold migrates everything into an [`IndexedCollection`]; a
//! `remove_expired` that leaves fewer than half the threshold migrates back.
//! Lookups never trigger a migration.

use crate::cookies::canonical_cookie::{CanonicalCookie, CookieId};
use crate::cookies::collection::{CollectionKind, CookieCollection, DEFAULT_THRESHOLD};
use crate::cookies::factory::CollectionFactory;
use crate::cookies::linear::LinearCollection;
use time::OffsetDateTime;

#[derive(Debug)]
pub struct AdaptiveCollection {
    inner: Box<dyn CookieCollection>,
    upgraded: bool,
    threshold: usize,
}

impl Default for AdaptiveCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveCollection {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_THRESHOLD)
    }

    /// Create with a custom threshold. Values below 1 are raised to 1.
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            inner: Box::new(LinearCollection::new()),
            upgraded: false,
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_upgraded(&self) -> bool {
        self.upgraded
    }

    /// Strategy currently backing this collection.
    pub fn current_kind(&self) -> CollectionKind {
        self.inner.kind()
    }

    /// Switch to indexed storage regardless of the threshold.
    pub fn force_upgrade(&mut self) {
        if !self.upgraded {
            self.switch_to(CollectionKind::Indexed);
            self.upgraded = true;
        }
    }

    /// Switch to linear storage regardless of the threshold.
    pub fn force_downgrade(&mut self) {
        if self.upgraded {
            self.switch_to(CollectionKind::Linear);
            self.upgraded = false;
        }
    }

    fn switch_to(&mut self, target: CollectionKind) {
        let from = self.inner.kind();
        let count = self.inner.count();

        let current = std::mem::replace(&mut self.inner, Box::new(LinearCollection::new()));
        self.inner = CollectionFactory::migrate(current, target);

        debug_assert_eq!(self.inner.count(), count);
        tracing::debug!(%from, to = %target, count, "cookie storage migrated");
    }

    fn below_downgrade_mark(&self) -> bool {
        // count < threshold * 0.5
        self.inner.count() * 2 < self.threshold
    }
}

impl CookieCollection for AdaptiveCollection {
    fn add(&mut self, cookie: CanonicalCookie) {
        self.inner.add(cookie);

        if !self.upgraded && self.inner.count() >= self.threshold {
            self.force_upgrade();
        }
    }

    fn remove(&mut self, id: &CookieId) -> Option<CanonicalCookie> {
        self.inner.remove(id)
    }

    fn get(&self, id: &CookieId) -> Option<&CanonicalCookie> {
        self.inner.get(id)
    }

    fn find_for_url(&self, url: &str, is_secure: bool) -> Vec<CanonicalCookie> {
        self.inner.find_for_url(url, is_secure)
    }

    fn all(&self) -> Vec<CanonicalCookie> {
        self.inner.all()
    }

    fn count(&self) -> usize {
        self.inner.count()
    }

    /// Drops every cookie and always returns to linear storage.
    fn clear(&mut self) {
        self.inner = Box::new(LinearCollection::new());
        self.upgraded = false;
    }

    fn remove_expired_at(&mut self, now: OffsetDateTime) -> usize {
        let removed = self.inner.remove_expired_at(now);

        if self.upgraded && self.below_downgrade_mark() {
            self.force_downgrade();
        }
        removed
    }

    fn kind(&self) -> CollectionKind {
        CollectionKind::Adaptive
    }

    fn into_cookies(self: Box<Self>) -> Vec<CanonicalCookie> {
        self.inner.into_cookies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::canonical_cookie::SameSite;
    use time::Duration;

    fn numbered(i: usize) -> CanonicalCookie {
        CanonicalCookie::new(format!("c{}", i), format!("v{}", i))
            .unwrap()
            .with_domain(format!("host{}.example.com", i % 7))
    }

    #[test]
    fn test_upgrade_at_threshold() {
        let mut store = AdaptiveCollection::with_threshold(50);
        for i in 0..49 {
            store.add(numbered(i));
        }
        assert!(!store.is_upgraded());
        assert_eq!(store.current_kind(), CollectionKind::Linear);

        store.add(numbered(49));
        assert!(store.is_upgraded());
        assert_eq!(store.current_kind(), CollectionKind::Indexed);
        assert_eq!(store.count(), 50);
    }

    #[test]
    fn test_replacing_does_not_upgrade() {
        let mut store = AdaptiveCollection::with_threshold(3);
        for _ in 0..10 {
            store.add(numbered(1));
        }
        assert_eq!(store.count(), 1);
        assert!(!store.is_upgraded());
    }

    #[test]
    fn test_threshold_minimum() {
        let mut store = AdaptiveCollection::with_threshold(0);
        assert_eq!(store.threshold(), 1);
        store.add(numbered(0));
        assert!(store.is_upgraded());
    }

    #[test]
    fn test_clear_returns_to_linear() {
        let mut store = AdaptiveCollection::with_threshold(2);
        store.add(numbered(0));
        store.add(numbered(1));
        assert!(store.is_upgraded());

        store.clear();
        assert!(!store.is_upgraded());
        assert_eq!(store.current_kind(), CollectionKind::Linear);
        assert!(store.is_empty());
    }

    #[test]
    fn test_downgrade_after_expiry_sweep() {
        let now = OffsetDateTime::now_utc();
        let mut store = AdaptiveCollection::with_threshold(10);
        for i in 0..10 {
            let expiry = if i < 6 {
                now - Duration::minutes(1)
            } else {
                now + Duration::hours(1)
            };
            store.add(numbered(i).with_expires_at(Some(expiry)));
        }
        assert!(store.is_upgraded());

        assert_eq!(store.remove_expired_at(now), 6);
        assert_eq!(store.count(), 4);
        assert!(!store.is_upgraded());
        assert_eq!(store.current_kind(), CollectionKind::Linear);
    }

    #[test]
    fn test_no_downgrade_at_half() {
        let now = OffsetDateTime::now_utc();
        let mut store = AdaptiveCollection::with_threshold(10);
        for i in 0..10 {
            let expiry = (i < 5).then(|| now - Duration::minutes(1));
            store.add(numbered(i).with_expires_at(expiry));
        }

        assert_eq!(store.remove_expired_at(now), 5);
        // 5 is not below 10 * 0.5
        assert!(store.is_upgraded());
    }

    #[test]
    fn test_explicit_remove_does_not_downgrade() {
        let mut store = AdaptiveCollection::with_threshold(4);
        for i in 0..4 {
            store.add(numbered(i));
        }
        for i in 0..4 {
            store.remove(&numbered(i).identifier());
        }
        assert!(store.is_upgraded());
        assert!(store.is_empty());
    }

    #[test]
    fn test_force_switches() {
        let mut store = AdaptiveCollection::new();
        store.add(numbered(0));

        store.force_upgrade();
        assert_eq!(store.current_kind(), CollectionKind::Indexed);
        store.force_upgrade();
        assert_eq!(store.current_kind(), CollectionKind::Indexed);

        store.force_downgrade();
        assert_eq!(store.current_kind(), CollectionKind::Linear);
        store.force_downgrade();
        assert_eq!(store.current_kind(), CollectionKind::Linear);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_migration_preserves_attributes() {
        let expiry = OffsetDateTime::now_utc() + Duration::days(3);
        let detailed = CanonicalCookie::new("detailed", "x")
            .unwrap()
            .with_domain(".example.com")
            .with_path("/deep/path")
            .with_expires_at(Some(expiry))
            .with_secure(true)
            .with_http_only(true)
            .with_same_site(Some(SameSite::Strict));

        let mut store = AdaptiveCollection::with_threshold(3);
        store.add(detailed.clone());
        store.add(numbered(1));
        let before = store.all();

        store.add(numbered(2));
        assert!(store.is_upgraded());
        assert_eq!(store.get(&detailed.identifier()), Some(&detailed));

        store.force_downgrade();
        assert_eq!(store.get(&detailed.identifier()), Some(&detailed));
        assert_eq!(&store.all()[..2], &before[..]);
    }

    #[test]
    fn test_lookup_matches_across_strategies() {
        let mut store = AdaptiveCollection::with_threshold(5);
        for i in 0..4 {
            store.add(numbered(i));
        }
        let linear = store.find_for_url("https://host1.example.com/", true);

        store.force_upgrade();
        let indexed = store.find_for_url("https://host1.example.com/", true);
        assert_eq!(linear, indexed);
        assert_eq!(linear.len(), 1);
    }
}
