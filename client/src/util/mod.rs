//! Utility helpers shared across client front ends.
//!
//! SYSTEM CONTEXT
//! ==============
//! `navigator` provides an in-memory location for hosts without a real
//! router, and `guard` applies the shared route policy to store updates.

pub mod guard;
pub mod navigator;
