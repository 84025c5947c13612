//! Core data models for the weather archive service.
//!
//! Request payloads arrive as loosely-typed JSON and are turned into the
//! validated value types in [`weather`] before any external call is made.
//! Everything here serializes naturally as JSON via `serde`.

pub mod stored;
pub mod weather;
