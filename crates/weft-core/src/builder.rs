use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::domain::action::Action;
use crate::domain::flow::{Flow, FlowId, StateId};
use crate::domain::listener::FlowExecutionListener;
use crate::domain::state::State;
use crate::domain::transition::Transition;
use crate::error::FlowError;

/// Assembles a [`Flow`] definition programmatically.
///
/// States are added in order; the first state added becomes the start state
/// unless one is designated explicitly. `build` validates the definition and
/// freezes it. Transition targets are deliberately *not* validated here: they
/// resolve lazily at first execution, so forward references and cross-checked
/// definition documents both work.
pub struct FlowBuilder {
    id: FlowId,
    states: Vec<State>,
    start_state_id: Option<StateId>,
    lifecycle_listener: Option<Arc<dyn FlowExecutionListener>>,
}

impl FlowBuilder {
    /// Starts building a flow with the given id.
    pub fn new(id: impl Into<FlowId>) -> Self {
        Self {
            id: id.into(),
            states: Vec::new(),
            start_state_id: None,
            lifecycle_listener: None,
        }
    }

    /// Designates the start state.
    pub fn start_state(mut self, id: impl Into<StateId>) -> Self {
        self.start_state_id = Some(id.into());
        self
    }

    /// Attaches a lifecycle listener notified when this flow starts and
    /// ends.
    pub fn lifecycle_listener(mut self, listener: Arc<dyn FlowExecutionListener>) -> Self {
        self.lifecycle_listener = Some(listener);
        self
    }

    /// Adds an action state.
    pub fn action_state(
        mut self,
        id: impl Into<StateId>,
        actions: Vec<Arc<dyn Action>>,
        transitions: Vec<Transition>,
    ) -> Self {
        self.states.push(State::action(id, actions, transitions));
        self
    }

    /// Adds a view state. A `None` view name makes it a marker state that
    /// pauses without rendering.
    pub fn view_state(
        mut self,
        id: impl Into<StateId>,
        view_name: Option<&str>,
        transitions: Vec<Transition>,
    ) -> Self {
        self.states
            .push(State::view(id, view_name.map(str::to_string), transitions));
        self
    }

    /// Adds a sub-flow state referencing the flow to spawn (and optionally
    /// an attribute mapper) by id.
    pub fn sub_flow_state(
        mut self,
        id: impl Into<StateId>,
        flow_id: impl Into<FlowId>,
        mapper_id: Option<&str>,
        transitions: Vec<Transition>,
    ) -> Self {
        self.states.push(State::sub_flow(
            id,
            flow_id,
            mapper_id.map(str::to_string),
            transitions,
        ));
        self
    }

    /// Adds an end state.
    pub fn end_state(mut self, id: impl Into<StateId>, view_name: Option<&str>) -> Self {
        self.states
            .push(State::end(id, view_name.map(str::to_string)));
        self
    }

    /// Validates and freezes the definition.
    pub fn build(self) -> Result<Flow, FlowError> {
        if self.states.is_empty() {
            return Err(FlowError::InvalidDefinition(format!(
                "flow '{}' must have at least one state",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for state in &self.states {
            if !seen.insert(state.id().clone()) {
                return Err(FlowError::InvalidDefinition(format!(
                    "duplicate state id '{}' in flow '{}'",
                    state.id(),
                    self.id
                )));
            }
        }

        let start_state_id = match self.start_state_id {
            Some(id) => {
                if !seen.contains(&id) {
                    return Err(FlowError::InvalidDefinition(format!(
                        "start state '{}' does not exist in flow '{}'",
                        id, self.id
                    )));
                }
                id
            }
            None => self.states[0].id().clone(),
        };

        let mut states = IndexMap::with_capacity(self.states.len());
        for state in self.states {
            states.insert(state.id().clone(), state);
        }

        Ok(Flow::new(
            self.id,
            states,
            start_state_id,
            self.lifecycle_listener,
        ))
    }
}
