//! Matching Layer
//!
//! Turns a raw detection into a card lookup: text cleanup plus the
//! original-then-translation search order.

pub mod normalize;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use normalize::normalize;
pub use resolver::{MatchResolver, MatchStatus, Resolution};
