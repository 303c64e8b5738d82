//! Database models split into domain-specific modules.

pub mod list;
pub mod user;

pub use list::*;
pub use user::*;
