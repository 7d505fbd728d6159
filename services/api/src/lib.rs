//! rsvp event-registration API.
//!
//! This crate primarily ships an `rsvp-api` binary, but we expose a small
//! library surface to enable integration testing and reuse.

pub mod api;
pub mod config;
pub mod db;
pub mod model;
pub mod passwords;
pub mod query;
pub mod registration;
pub mod state;
