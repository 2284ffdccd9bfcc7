//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own account rules, password hashing, session tokens and
//! persistence so route handlers stay focused on protocol translation and
//! cookie plumbing.

pub mod accounts;
pub mod password;
pub mod session;
pub mod users;
