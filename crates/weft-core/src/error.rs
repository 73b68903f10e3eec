use thiserror::Error;

use crate::domain::execution::{ExecutionId, ExecutionStatus};
use crate::domain::flow::{FlowId, StateId};

/// Core error type for the Weft flow engine.
///
/// Configuration errors (unknown flows, states, transitions, attributes and
/// services) are detected at first use and reported to the caller; nothing in
/// the engine retries them. `InvariantViolation` signals an internal
/// consistency fault and is not recoverable.
#[derive(Error, Debug)]
pub enum FlowError {
    /// No flow definition is registered under the given id
    #[error("no flow found with id '{0}'")]
    NoSuchFlow(FlowId),

    /// A state id did not resolve within its flow definition
    #[error("no state found with id '{state}' in flow '{flow}'")]
    NoSuchState {
        /// The flow that was searched
        flow: FlowId,
        /// The state id that did not resolve
        state: StateId,
    },

    /// The state exists but cannot respond to events
    #[error("state '{state}' in flow '{flow}' is not transitionable")]
    NotTransitionable {
        /// The owning flow
        flow: FlowId,
        /// The offending state
        state: StateId,
    },

    /// No transition in the state's transition table matched the event
    #[error("no transition matches event '{event}' in state '{state}' of flow '{flow}'")]
    NoMatchingTransition {
        /// The active flow
        flow: FlowId,
        /// The state whose transition table was consulted
        state: StateId,
        /// The event that found no match
        event: String,
    },

    /// A transition could not be executed because its target failed to resolve
    #[error("cannot execute transition to '{target}'")]
    CannotExecuteTransition {
        /// The target state id that failed to resolve
        target: StateId,
        /// The underlying lookup failure
        #[source]
        source: Box<FlowError>,
    },

    /// No action is registered under the given id
    #[error("no action named '{0}' is registered")]
    NoSuchAction(String),

    /// No attribute mapper is registered under the given id
    #[error("no attribute mapper named '{0}' is registered")]
    NoSuchAttributeMapper(String),

    /// A required attribute was absent from flow scope
    #[error("missing required attribute '{0}' in flow scope")]
    MissingAttribute(String),

    /// The execution was asked to do something its status does not allow
    #[error("flow execution is {actual:?}, expected {expected:?}")]
    InvalidStatus {
        /// The status required by the operation
        expected: ExecutionStatus,
        /// The status the execution was actually in
        actual: ExecutionStatus,
    },

    /// The session stack was empty when an active session was required
    #[error("no session is active on the execution stack")]
    NoActiveSession,

    /// No live execution is stored under the given id
    #[error("no flow execution found with id '{0}'")]
    NoSuchExecution(ExecutionId),

    /// An internal consistency check failed; not recoverable
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),

    /// A delegate action failed; the underlying error is propagated unchanged
    #[error("action '{action}' in state '{state}' failed")]
    ActionFailure {
        /// The action state that invoked the delegate
        state: StateId,
        /// The name the delegate reports for itself
        action: String,
        /// The delegate's error, preserved as the source
        #[source]
        source: anyhow::Error,
    },

    /// A flow definition failed validation while being built
    #[error("invalid flow definition: {0}")]
    InvalidDefinition(String),
}

impl FlowError {
    /// True when this error reports a configuration problem that was
    /// detected at first use (as opposed to an invariant breach or a
    /// delegate failure).
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            FlowError::NoSuchFlow(_)
                | FlowError::NoSuchState { .. }
                | FlowError::NotTransitionable { .. }
                | FlowError::NoMatchingTransition { .. }
                | FlowError::CannotExecuteTransition { .. }
                | FlowError::NoSuchAction(_)
                | FlowError::NoSuchAttributeMapper(_)
                | FlowError::MissingAttribute(_)
                | FlowError::InvalidDefinition(_)
        )
    }
}
