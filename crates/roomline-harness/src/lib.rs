//! Scenario harness for roomline.
//!
//! Runs the real [`roomline_app::Runtime`] against the in-process backend
//! with controllable faults and a scripted front end, so end-to-end
//! behaviour is tested with the same code that runs in the terminal client.
//!
//! # Fault Injection
//!
//! [`FaultyBackend`] wraps any backend. Tests schedule failures and delays
//! per operation through a [`FaultHandle`] and read back the ordered call
//! log.
//!
//! # Scripted Front End
//!
//! [`ScriptedDriver`] replays a [`Script`] of intents, waits and side effects
//! and records every render and notice into a [`Recording`].
//!
//! # Invariant Testing
//!
//! The `invariants` module checks behavioral properties against a
//! [`SystemSnapshot`]. Use [`InvariantRegistry::standard()`] for the session
//! and chat invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod faulty_backend;
pub mod invariants;
mod scripted_driver;

pub use faulty_backend::{Call, FaultHandle, FaultyBackend, Operation};
pub use invariants::{
    BootstrapBeforeChat, Invariant, InvariantRegistry, InvariantResult, MessageIdsUnique,
    MessagesOrdered, NoticesBounded, RoomFollowsLogin, RoomSnapshot, SystemSnapshot,
    UserRequiresValidToken, Violation,
};
pub use scripted_driver::{Recording, Script, ScriptError, ScriptedDriver};
