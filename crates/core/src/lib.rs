//! Domain types and pure logic for the livestream overlay panel.
//!
//! Nothing in this crate performs I/O. The HTTP client, session storage
//! and overlay store live in `overlay-client`.

pub mod error;
pub mod gesture;
pub mod overlay;
pub mod stream;
pub mod types;
pub mod user;
