//! Database access for rtc-server
//!
//! Schema and the interaction store live in rtc-common; this module adds
//! the rating session tables' queries.

pub mod sessions;

pub use sessions::SessionStore;
