//! Cookie storage and matching.
//!
//! This module provides a complete in-memory cookie management system:
//!
//! - **Cookies**: Immutable cookie values with `Set-Cookie` parsing and
//!   domain/path/secure matching ([`CanonicalCookie`](canonical_cookie::CanonicalCookie))
//! - **Storage**: Interchangeable strategies behind one contract
//!   ([`CookieCollection`](collection::CookieCollection))
//! - **Jar**: Request/response facade with expiry sweeping and header helpers
//!   ([`CookieJar`](jar::CookieJar))
//! - **Snapshots**: Serializable records for external persistence
//!
//! # Architecture
//!
//! | Type | Responsibility |
//! |------|----------------|
//! | [`CanonicalCookie`](canonical_cookie::CanonicalCookie) | Single cookie, matching rules, header codec |
//! | [`LinearCollection`](linear::LinearCollection) | Identifier map, full scan per lookup |
//! | [`IndexedCollection`](indexed::IndexedCollection) | Identifier map plus domain index |
//! | [`AdaptiveCollection`](adaptive::AdaptiveCollection) | Switches linear/indexed by population |
//! | [`CollectionFactory`](factory::CollectionFactory) | Strategy selection and migration |
//! | [`CookieJar`](jar::CookieJar) | Policy facade used by request middleware |
//!
//! # Middleware Integration
//!
//! ```rust
//! use cookienet::cookies::jar::CookieJar;
//!
//! let mut jar = CookieJar::new();
//!
//! // After each response: every Set-Cookie value, plus the request URL.
//! jar.add_from_set_cookie_headers(
//!     ["theme=dark; Path=/", "sid=42; Path=/account; Secure"],
//!     "https://shop.example/account/login",
//! );
//!
//! // Before the next request.
//! let header = jar.get_cookie_header_for_url("https://shop.example/account/orders", None);
//! assert_eq!(header.as_deref(), Some("sid=42; theme=dark"));
//! ```
//!
//! # Snapshots
//!
//! ```rust
//! use cookienet::cookies::jar::{CookieJar, CookieJarConfig};
//!
//! let mut jar = CookieJar::with_config(CookieJarConfig::persistent());
//! jar.add_from_set_cookie_headers(["sid=42"], "https://example.com/");
//!
//! let json = jar.export_json()?;
//! let mut restored = CookieJar::with_config(CookieJarConfig::persistent());
//! assert_eq!(restored.import_json(&json)?, 1);
//! # Ok::<(), cookienet::NetError>(())
//! ```

pub mod adaptive;
pub mod canonical_cookie;
pub mod collection;
pub mod factory;
pub mod indexed;
pub mod jar;
pub mod linear;
pub mod persistence;
