//! Protocol Execution Engine
//!
//! A token-passing interpreter for laboratory protocols expressed as
//! activity graphs. The engine seeds a protocol's entry nodes, then
//! repeatedly fires the target of the earliest pending token whose
//! enablement rule is met, until the graph goes quiet.
//!
//! # Architecture
//!
//! - [`ExecutionEngine`]: owns the run loop and the behavior catalog.
//! - [`EnablementChecker`]: decides when a node may fire.
//! - [`NodeDispatcher`]: fires a node, one exhaustive match over the
//!   node kinds, producing records and downstream tokens.
//! - [`DecisionEvaluator`]: guard evaluation for decision nodes.
//! - [`CallStack`] / [`Frame`]: open sub-protocol invocations; a frame
//!   retires when its sub-protocol's required outputs are bound.
//! - [`PrimitiveExecutor`]: the seam to whatever actually carries out
//!   primitive behaviors.
//! - [`Specialization`]: observers fed each firing as it happens.
//! - [`LogicalClock`]: wall-clock or reproducible ordinal timestamps.

#![deny(unsafe_code)]

mod catalog;
mod clock;
mod decision;
mod dispatcher;
mod enablement;
mod engine;
mod executor;
mod frames;
mod run;
mod specialization;

pub use catalog::BehaviorCatalog;
pub use clock::{LogicalClock, TimeMode};
pub use decision::DecisionEvaluator;
pub use dispatcher::NodeDispatcher;
pub use enablement::EnablementChecker;
pub use engine::ExecutionEngine;
pub use executor::{NullPrimitiveExecutor, PrimitiveExecutor, PrimitiveOutcome};
pub use frames::{CallStack, Frame};
pub use specialization::{CallJournal, Specialization};
