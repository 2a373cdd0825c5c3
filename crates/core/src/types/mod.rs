//! Core type definitions shared across crates.

pub mod conversation;
pub mod envelope;
pub mod math;
pub mod search;
pub mod tool;

pub use conversation::*;
pub use envelope::*;
pub use math::*;
pub use search::*;
pub use tool::*;
