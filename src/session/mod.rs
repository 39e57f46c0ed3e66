//! Session management module.
//!
//! This module provides session identifier generation, the session record
//! type, and the [`SessionManager`] that persists records in the store.

mod id;
mod manager;
mod record;

pub use id::{symbol_for, SidGenerator, ALPHABET, DEFAULT_SID_LENGTH};
pub use manager::SessionManager;
pub use record::{Session, SessionData, SID_FIELD};
