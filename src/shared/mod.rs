//! Shared state and messaging between the capture flow and presentation
//!
//! Status messages are posted by the capture flow and read by whatever
//! renders the session.

pub mod messages;
pub mod state;

pub use messages::{StatusKind, StatusMessage};
pub use state::StatusBoard;
