//! Inventrix: order, stock and identifier management for a small inventory
//! service. Every store runs as an actor; typed clients are the only way in.

pub mod actor_framework;
pub mod app_system;
pub mod clients;
pub mod domain;
pub mod order_actor;
pub mod product_actor;
pub mod sequence;
pub mod user_actor;
pub mod validation;

#[cfg(test)]
mod mock_framework;
