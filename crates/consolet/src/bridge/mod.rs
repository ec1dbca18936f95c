//! File-channel primitives: envelopes, rendezvous directory, atomic
//! publish, and the bounded response poll loop.
//!
//! The channel is a single shared directory holding at most one command
//! file and one response file. Writers replace files wholesale via atomic
//! rename; readers consume the response file by deleting it. There is no
//! lock - the writer and reader are different OS processes, so filesystem
//! atomicity is the only primitive available.

pub mod channel;
pub mod poll;
pub mod protocol;
pub mod publish;
