//! Pipeline scenario tests
//!
//! Cross-component tests that run the real decode worker thread:
//! - Batching and lock acquisition per drain
//! - Stop and shutdown semantics
//! - Invalidation ordering against the track lock
//! - Container formats end to end

pub mod fixtures;
