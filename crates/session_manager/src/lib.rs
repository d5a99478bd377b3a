//! session_manager - delivery sessions
//!
//! A session key identifies one logical client, which may be connected
//! from several devices or tabs at once. Every event produced for the
//! session is multicast to each live connection's private FIFO queue;
//! each connection runs its own delivery loop and its own liveness
//! probe, and tearing one down never disturbs its siblings.
//!
//! The registry is volatile by design: a process restart drops all live
//! connections and clients reconnect and re-fetch history.

pub mod connection;
pub mod registry;

pub use connection::{ConnectionHandle, Envelope};
pub use registry::{spawn_liveness_probe, SessionRegistry};
