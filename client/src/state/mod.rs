//! Client state modules.

pub mod auth;
pub mod transition;
