//! Data models for the swipe feed engine.
//!
//! Field names follow the catalog service's JSON payloads so items can be stored and
//! re-rendered without translation.

mod feedback;
mod filter;
mod item;

pub use feedback::*;
pub use filter::*;
pub use item::*;
