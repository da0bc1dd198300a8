//! Wire formats of the worker protocol.
//!
//! Every message is one line. Command keywords are bare words; bodies and
//! snapshots are single-line JSON objects using the physics key names of the
//! core crate (`kT`, `B`, `JmL`, ...).

pub mod request;
pub mod snapshot;
