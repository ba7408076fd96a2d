//! Base types and error handling.
//!
//! Provides foundational types shared by the cookie subsystem:
//! - [`NetError`](neterror::NetError): Error codes with stable numeric values

pub mod neterror;
