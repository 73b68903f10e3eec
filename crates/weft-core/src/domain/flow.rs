use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::execution::ExecutionContext;
use crate::domain::listener::FlowExecutionListener;
use crate::domain::state::State;
use crate::domain::transition::GuardContext;
use crate::domain::view::ViewDescriptor;
use crate::error::FlowError;

/// Value object: flow definition id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub String);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlowId {
    fn from(id: &str) -> Self {
        FlowId(id.to_string())
    }
}

impl From<String> for FlowId {
    fn from(id: String) -> Self {
        FlowId(id)
    }
}

/// Value object: state id, unique within its owning flow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId(pub String);

impl StateId {
    /// The raw id string. Ending-state ids double as event ids when a
    /// sub-flow returns control to its parent.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateId {
    fn from(id: &str) -> Self {
        StateId(id.to_string())
    }
}

impl From<String> for StateId {
    fn from(id: String) -> Self {
        StateId(id)
    }
}

/// An immutable definition of states and guarded transitions representing one
/// multi-step conversation.
///
/// A flow owns its states exclusively, keyed by id in insertion order; the
/// start state defaults to the first state added. Flow definitions are built
/// once through [`crate::builder::FlowBuilder`], frozen, and then shared
/// behind an `Arc` by any number of concurrent executions. Nothing mutates a
/// flow after construction, which is what makes the lazy caches inside its
/// transitions safe to share.
pub struct Flow {
    /// The flow identifier
    id: FlowId,

    /// States keyed by id, in the order they were added
    states: IndexMap<StateId, State>,

    /// The designated start state
    start_state_id: StateId,

    /// Optional listener notified when this flow starts and ends
    lifecycle_listener: Option<Arc<dyn FlowExecutionListener>>,
}

impl Flow {
    pub(crate) fn new(
        id: FlowId,
        states: IndexMap<StateId, State>,
        start_state_id: StateId,
        lifecycle_listener: Option<Arc<dyn FlowExecutionListener>>,
    ) -> Self {
        Self {
            id,
            states,
            start_state_id,
            lifecycle_listener,
        }
    }

    /// Returns the flow identifier.
    pub fn id(&self) -> &FlowId {
        &self.id
    }

    /// Looks up a state by id.
    pub fn state(&self, id: &StateId) -> Option<&State> {
        self.states.get(id)
    }

    /// Looks up a state by id, failing with a configuration error when the
    /// id does not resolve.
    pub fn required_state(&self, id: &StateId) -> Result<&State, FlowError> {
        self.state(id).ok_or_else(|| FlowError::NoSuchState {
            flow: self.id.clone(),
            state: id.clone(),
        })
    }

    /// Looks up a state that must be capable of responding to events.
    pub fn required_transitionable_state(&self, id: &StateId) -> Result<&State, FlowError> {
        let state = self.required_state(id)?;
        if !state.is_transitionable() {
            return Err(FlowError::NotTransitionable {
                flow: self.id.clone(),
                state: id.clone(),
            });
        }
        Ok(state)
    }

    /// Returns the start state.
    pub fn start_state(&self) -> &State {
        // The builder guarantees the start state id resolves.
        &self.states[&self.start_state_id]
    }

    /// Returns the number of states in this flow.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Iterates over the state ids in insertion order.
    pub fn state_ids(&self) -> impl Iterator<Item = &StateId> {
        self.states.keys()
    }

    /// Returns the lifecycle listener, if one is configured.
    pub fn lifecycle_listener(&self) -> Option<&Arc<dyn FlowExecutionListener>> {
        self.lifecycle_listener.as_ref()
    }

    pub(crate) fn state_index(&self, id: &StateId) -> Option<usize> {
        self.states.get_index_of(id)
    }

    pub(crate) fn state_by_index(&self, index: usize) -> Option<&State> {
        self.states.get_index(index).map(|(_, state)| state)
    }

    /// Dispatches an event occurring in the named state: the state must be
    /// transitionable, and the first transition whose guard accepts the event
    /// is executed. An event with no matching transition is a configuration
    /// error, never a silent no-op.
    pub(crate) fn execute(
        &self,
        event_id: &str,
        state_id: &StateId,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ViewDescriptor, FlowError> {
        let state = self.required_transitionable_state(state_id)?;
        let transition = {
            let guard_ctx = GuardContext {
                event_id,
                request: ctx.request,
                scope: ctx.scope()?,
            };
            state.matching_transition(&guard_ctx)
        };
        let transition = transition.ok_or_else(|| FlowError::NoMatchingTransition {
            flow: self.id.clone(),
            state: state_id.clone(),
            event: event_id.to_string(),
        })?;
        debug!(flow = %self.id, state = %state_id, event = event_id, "executing transition");
        transition.execute(self, ctx)
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("id", &self.id)
            .field("states", &self.states.keys().collect::<Vec<_>>())
            .field("start_state_id", &self.start_state_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FlowBuilder;
    use crate::domain::transition::Transition;

    fn two_state_flow() -> Flow {
        FlowBuilder::new("order")
            .view_state("details", Some("detailsForm"), vec![Transition::on("submit", "done")])
            .end_state("done", Some("confirmation"))
            .build()
            .expect("flow should build")
    }

    #[test]
    fn test_state_lookup() {
        let flow = two_state_flow();
        assert_eq!(flow.state_count(), 2);
        assert!(flow.state(&StateId::from("details")).is_some());
        assert!(flow.state(&StateId::from("missing")).is_none());
    }

    #[test]
    fn test_required_state_reports_unknown_id() {
        let flow = two_state_flow();
        let err = flow.required_state(&StateId::from("missing")).unwrap_err();
        assert!(matches!(err, FlowError::NoSuchState { .. }));
    }

    #[test]
    fn test_required_transitionable_state_rejects_end_state() {
        let flow = two_state_flow();
        let err = flow
            .required_transitionable_state(&StateId::from("done"))
            .unwrap_err();
        assert!(matches!(err, FlowError::NotTransitionable { .. }));
    }

    #[test]
    fn test_start_state_defaults_to_first_added() {
        let flow = two_state_flow();
        assert_eq!(flow.start_state().id(), &StateId::from("details"));
    }

    #[test]
    fn test_state_ids_preserve_insertion_order() {
        let flow = two_state_flow();
        let ids: Vec<&str> = flow.state_ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["details", "done"]);
    }
}
