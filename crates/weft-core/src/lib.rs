//!
//! Weft Core - conversation flow engine for the Weft platform
//!
//! This crate defines the flow domain model and the runtime that drives it:
//! immutable flow definitions made of states and guarded transitions, shared
//! by many concurrent per-client executions that track nested sub-flow
//! sessions and produce view selections for a web boundary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - flow definitions, states, transitions, executions
pub mod domain;

/// Application services - cross-request execution management
pub mod application;

/// Programmatic flow assembly
pub mod builder;

/// Error types
pub mod error;

// Re-export key types
pub use builder::FlowBuilder;
pub use error::FlowError;

pub use domain::action::{Action, ActionContext, ERROR_EVENT, SUCCESS_EVENT};
pub use domain::catalog::{FlowLocator, ServiceCatalog};
pub use domain::execution::{ExecutionId, ExecutionStatus, FlowExecution};
pub use domain::flow::{Flow, FlowId, StateId};
pub use domain::listener::{FlowExecutionListener, FlowExecutionListenerList};
pub use domain::mapper::{AttributeCopyMapper, FlowAttributeMapper};
pub use domain::request::RequestContext;
pub use domain::scope::Scope;
pub use domain::session::{FlowSession, FlowSessionStack, SessionStatus};
pub use domain::state::{State, StateKind};
pub use domain::transition::{EventIdCriteria, GuardContext, Transition, TransitionCriteria};
pub use domain::view::ViewDescriptor;

pub use application::manager::{
    FlowExecutionManager, FlowExecutionRepository, FlowRequestOutcome,
    FLOW_EXECUTION_ID_ATTRIBUTE,
};
