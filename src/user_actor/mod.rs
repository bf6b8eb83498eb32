//! Account store: entity rules, errors and password hashing.

pub mod entity;
pub mod error;
pub mod password;

pub use error::*;
