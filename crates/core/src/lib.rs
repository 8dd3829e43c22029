//! Pure domain logic for the kitforge customization pipeline.
//!
//! Nothing in this crate touches the database or the network. The only
//! side effects are the subprocesses and files handed to
//! [`scripting`] executors by the bridge.

pub mod customize;
pub mod error;
pub mod layers;
pub mod production;
pub mod scripting;
pub mod types;
pub mod variant;
