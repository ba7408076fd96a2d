//! # cookienet
//!
//! Cookie storage and matching engine for HTTP clients.
//!
//! `cookienet` keeps cookies across a request/response sequence, matches
//! them against outgoing request URLs by domain, path and security rules,
//! and switches its storage strategy as the cookie population grows. It
//! performs no network I/O; a request middleware feeds it `Set-Cookie`
//! headers and asks it for `Cookie` headers.
//!
//! ## Features
//!
//! - **RFC 6265 syntax**: `Expires`, `Max-Age`, `Domain`, `Path`, `Secure`,
//!   `HttpOnly` and `SameSite` attributes
//! - **Domain Matching**: Suffix-based, with parent-domain (`.example.com`) cookies
//! - **Adaptive Storage**: Linear scan for small jars, domain index for large ones
//! - **Snapshots**: Serde records and JSON export/import with per-record recovery
//!
//! ## Quick Start
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
//! assert_eq!(
//!     jar.get_cookie_header_for_url("https://example.com/api", None).as_deref(),
//!     Some("session=abc123"),
//! );
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions
//! - [`cookies`] - Cookie values, storage strategies, and the jar
//!
//! ## Concurrency
//!
//! Everything is synchronous and unsynchronized. A [`CookieJar`] is meant to
//! be owned by one request/response sequence at a time; wrap it in a lock or
//! use one jar per worker when sharing.

pub mod base;
pub mod cookies;

pub use base::neterror::NetError;
pub use cookies::canonical_cookie::{CanonicalCookie, CookieId, SameSite};
pub use cookies::collection::{CollectionKind, CookieCollection};
pub use cookies::jar::{CookieJar, CookieJarConfig};
