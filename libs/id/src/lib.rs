//! # rsvp-id
//!
//! Typed identifiers for users, events and requests.
//!
//! Every id renders as `{prefix}_{ulid}`:
//!
//! - `usr_01HV4Z2WQXKJNM8GPQY6VBKC3D`
//! - `evt_01HV4Z3MXNKPQR9HSTZ7WCLD4E`
//!
//! The prefix keeps a user id from being accepted where an event id is
//! expected, and the ULID keeps ids time-ordered.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
