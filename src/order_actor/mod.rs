//! Order store: entity rules, soft-delete action and the order error taxonomy.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
