//! LifeOS client auth core.
//!
//! SYSTEM CONTEXT
//! ==============
//! `net` talks to the auth server, `state` holds the observable auth store
//! and the transition gate, and `util` keeps views on the right side of the
//! route policy. Nothing here renders; front ends subscribe to the store.

pub mod net;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod test_helpers;
