//! Networking modules for the auth HTTP API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` defines the session backend seam and its reqwest implementation.

pub mod api;
