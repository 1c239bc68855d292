//! Activity-Graph Domain Types
//!
//! Laboratory protocols are modeled as executable activity graphs:
//! directed control/object-flow diagrams whose nodes fire by consuming
//! and producing tokens.
//!
//! # Key Concepts
//!
//! - **ActivityGraph**: The static blueprint of nodes and edges, defined
//!   before execution and never changed during a run.
//! - **Behavior**: An invocable unit, either a primitive (executed by an
//!   external collaborator) or a protocol (backed by another graph).
//! - **EdgeFlow**: A token, an immutable value in flight along an
//!   edge, a pin-to-owner hop, or a seed.
//! - **ProtocolExecution**: The append-only trace of one run, with ordered
//!   firings, the full token pool, and bound parameter values.
//!
//! # Design Principles
//!
//! 1. Node kinds are a closed tagged union; dispatch is an exhaustive
//!    match, never a runtime type probe.
//! 2. The static graph and the runtime trace are strictly separated;
//!    trace data is append-only so a run can be replayed.
//! 3. Behaviors are resolved through an explicit catalog passed to the
//!    engine, never process-global registries.

#![deny(unsafe_code)]

mod behavior;
mod edge;
mod errors;
mod execution;
mod graph;
mod literal;
mod node;
mod parameter;
mod token;

pub use behavior::*;
pub use edge::*;
pub use errors::*;
pub use execution::*;
pub use graph::*;
pub use literal::*;
pub use node::*;
pub use parameter::*;
pub use token::*;
