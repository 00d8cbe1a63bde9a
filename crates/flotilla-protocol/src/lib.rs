//! Flotilla Protocol - Core types and message definitions
//!
//! Wire-level vocabulary for the Flotilla fleet coordination protocol:
//! agent identity, roles, tasks, and the stamped message envelope that
//! every broadcast travels in.

pub mod error;
pub mod identity;
pub mod messages;
pub mod types;

pub use error::*;
pub use identity::*;
pub use messages::*;
pub use types::*;
