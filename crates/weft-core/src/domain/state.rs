use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::action::{Action, ActionContext};
use crate::domain::execution::ExecutionContext;
use crate::domain::flow::{Flow, FlowId, StateId};
use crate::domain::scope::Scope;
use crate::domain::transition::{GuardContext, Transition};
use crate::domain::view::ViewDescriptor;
use crate::error::FlowError;

/// The closed set of state behaviors.
///
/// Action, view and sub-flow states are transitionable: they carry a
/// transition table and respond to events. End states terminate the active
/// session.
pub enum StateKind {
    /// Executes delegate actions and routes on their result events
    Action {
        /// The delegates, tried in order
        actions: Vec<Arc<dyn Action>>,
        /// The state's transition table
        transitions: Vec<Transition>,
    },

    /// Pauses the conversation and selects a view to render
    View {
        /// The view to render, `None` for a marker state
        view_name: Option<String>,
        /// The state's transition table
        transitions: Vec<Transition>,
    },

    /// Spawns a nested flow and suspends until it ends
    SubFlow {
        /// The id of the flow to spawn
        flow_id: FlowId,
        /// Optional attribute mapper resolved through the catalog
        mapper_id: Option<String>,
        /// The state's transition table, consulted when the sub-flow ends
        transitions: Vec<Transition>,
    },

    /// Terminates the active session
    End {
        /// The view to render on termination, `None` for no view
        view_name: Option<String>,
    },
}

/// One step of a flow definition.
///
/// A state is created once, attached to exactly one owning flow, and lives as
/// long as the definition. Entering a state marks it current on the active
/// session, then dispatches on the state's kind.
pub struct State {
    id: StateId,
    kind: StateKind,
}

impl State {
    /// An action state.
    pub fn action(
        id: impl Into<StateId>,
        actions: Vec<Arc<dyn Action>>,
        transitions: Vec<Transition>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: StateKind::Action {
                actions,
                transitions,
            },
        }
    }

    /// A view state.
    pub fn view(
        id: impl Into<StateId>,
        view_name: Option<String>,
        transitions: Vec<Transition>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: StateKind::View {
                view_name,
                transitions,
            },
        }
    }

    /// A sub-flow state.
    pub fn sub_flow(
        id: impl Into<StateId>,
        flow_id: impl Into<FlowId>,
        mapper_id: Option<String>,
        transitions: Vec<Transition>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: StateKind::SubFlow {
                flow_id: flow_id.into(),
                mapper_id,
                transitions,
            },
        }
    }

    /// An end state.
    pub fn end(id: impl Into<StateId>, view_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            kind: StateKind::End { view_name },
        }
    }

    /// The state identifier, unique within the owning flow.
    pub fn id(&self) -> &StateId {
        &self.id
    }

    /// The state's kind.
    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    /// True when this state carries a transition table and can respond to
    /// events.
    pub fn is_transitionable(&self) -> bool {
        !matches!(self.kind, StateKind::End { .. })
    }

    /// True when entering this state terminates the active session.
    pub fn is_end_state(&self) -> bool {
        matches!(self.kind, StateKind::End { .. })
    }

    /// The state's transition table, `None` for end states.
    pub fn transitions(&self) -> Option<&[Transition]> {
        match &self.kind {
            StateKind::Action { transitions, .. }
            | StateKind::View { transitions, .. }
            | StateKind::SubFlow { transitions, .. } => Some(transitions),
            StateKind::End { .. } => None,
        }
    }

    /// The first transition whose guard accepts the given context, in
    /// declaration order.
    pub(crate) fn matching_transition(&self, ctx: &GuardContext<'_>) -> Option<&Transition> {
        self.transitions()?.iter().find(|t| t.matches(ctx))
    }

    /// Enters this state: marks it current on the active session, then
    /// performs the kind-specific entry behavior.
    pub(crate) fn enter(
        &self,
        flow: &Flow,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ViewDescriptor, FlowError> {
        debug!(state = %self.id, flow = %flow.id(), "entering state");
        let previous = ctx.stack.set_current_state(self.id.clone())?;
        ctx.listeners
            .notify_state_entered(flow.id(), Some(&previous).filter(|p| *p != &self.id), &self.id);
        self.do_enter(flow, ctx)
    }

    fn do_enter(
        &self,
        flow: &Flow,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ViewDescriptor, FlowError> {
        match &self.kind {
            StateKind::Action { actions, .. } => self.enter_action_state(flow, actions, ctx),
            StateKind::View { view_name, .. } => {
                match view_name {
                    Some(view_name) => {
                        debug!(view = %view_name, "pausing for view");
                        Ok(ViewDescriptor::new(view_name.clone(), ctx.scope()?.to_model()))
                    }
                    // A marker state: pause without rendering anything.
                    None => Ok(ViewDescriptor::none()),
                }
            }
            StateKind::SubFlow { flow_id, mapper_id, .. } => {
                self.enter_sub_flow_state(flow, flow_id, mapper_id.as_deref(), ctx)
            }
            StateKind::End { view_name } => {
                self.enter_end_state(flow, view_name.as_deref(), ctx)
            }
        }
    }

    fn enter_action_state(
        &self,
        flow: &Flow,
        actions: &[Arc<dyn Action>],
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ViewDescriptor, FlowError> {
        let mut last_event: Option<String> = None;
        for action in actions {
            let event = {
                let session = ctx.stack.active_mut()?;
                let mut action_ctx = ActionContext {
                    request: ctx.request,
                    scope: session.scope_mut(),
                };
                action
                    .execute(&mut action_ctx)
                    .map_err(|source| FlowError::ActionFailure {
                        state: self.id.clone(),
                        action: action.name().to_string(),
                        source,
                    })?
            };
            debug!(state = %self.id, action = action.name(), event = %event, "action executed");
            let matched = {
                let guard_ctx = GuardContext {
                    event_id: &event,
                    request: ctx.request,
                    scope: ctx.scope()?,
                };
                self.matching_transition(&guard_ctx).is_some()
            };
            if matched {
                return flow.execute(&event, &self.id, ctx);
            }
            // No transition for this result event; give the next action a
            // chance to produce one.
            last_event = Some(event);
        }
        Err(FlowError::NoMatchingTransition {
            flow: flow.id().clone(),
            state: self.id.clone(),
            event: last_event.unwrap_or_else(|| "<no result event>".to_string()),
        })
    }

    fn enter_sub_flow_state(
        &self,
        flow: &Flow,
        sub_flow_id: &FlowId,
        mapper_id: Option<&str>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ViewDescriptor, FlowError> {
        let sub_flow = ctx.catalog.flow(sub_flow_id)?;
        let input = match mapper_id {
            Some(mapper_id) => {
                let mapper = ctx.catalog.attribute_mapper(mapper_id)?;
                mapper.map_to_sub_flow(ctx.scope()?)
            }
            None => Scope::new(),
        };
        debug!(parent = %flow.id(), sub_flow = %sub_flow.id(), "spawning sub-flow");
        ctx.listeners.notify_sub_flow_spawned(flow.id(), sub_flow.id());
        ctx.spawn_session(&sub_flow, input)
    }

    fn enter_end_state(
        &self,
        flow: &Flow,
        view_name: Option<&str>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ViewDescriptor, FlowError> {
        let mut descriptor = match view_name {
            Some(view_name) => ViewDescriptor::new(view_name, ctx.scope()?.to_model()),
            None => ViewDescriptor::none(),
        };
        let ended = ctx.stack.pop()?;
        if ended.current_state_id() != &self.id {
            return Err(FlowError::InvariantViolation(format!(
                "ending session of flow '{}' is in state '{}' but end state '{}' was entered",
                ended.flow_id(),
                ended.current_state_id(),
                self.id
            )));
        }
        debug!(flow = %ended.flow_id(), state = %self.id, "flow session ended");
        if let Some(listener) = flow.lifecycle_listener() {
            listener.flow_ended(flow.id(), &ended);
        }
        ctx.listeners.notify_flow_ended(flow.id(), &ended);

        if !ctx.stack.is_empty() {
            let resuming_flow_id = ctx.stack.active_flow_id()?.clone();
            let resuming_state_id = ctx.stack.current_state_id()?.clone();
            debug!(
                parent = %resuming_flow_id,
                state = %resuming_state_id,
                "resuming parent flow"
            );
            let parent_flow = ctx.catalog.flow(&resuming_flow_id)?;
            let resuming_state = parent_flow.required_state(&resuming_state_id)?;
            match resuming_state.kind() {
                StateKind::SubFlow { mapper_id, .. } => match mapper_id {
                    Some(mapper_id) => {
                        let mapper = ctx.catalog.attribute_mapper(mapper_id)?;
                        debug!(mapper = %mapper_id, "mapping sub-flow attributes up to the resuming parent flow");
                        let parent_scope = ctx.stack.active_mut()?.scope_mut();
                        mapper.map_to_resuming_parent(ended.scope(), parent_scope);
                    }
                    None => {
                        info!(
                            state = %resuming_state_id,
                            sub_flow = %ended.flow_id(),
                            "no attribute mapper configured for the resuming state, ending sub-flow attributes will not be passed up"
                        );
                    }
                },
                _ => {
                    return Err(FlowError::InvariantViolation(format!(
                        "resuming state '{}' of flow '{}' is not a sub-flow state",
                        resuming_state_id, resuming_flow_id
                    )));
                }
            }
            // The ending state id doubles as the event signaled in the
            // resuming parent state; this loopback is how a sub-flow returns
            // a result code to its caller.
            descriptor =
                parent_flow.execute(ended.current_state_id().as_str(), &resuming_state_id, ctx)?;
        } else {
            debug!(flow = %ended.flow_id(), "root flow ended");
        }
        Ok(descriptor)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            StateKind::Action { actions, .. } => format!("Action({} actions)", actions.len()),
            StateKind::View { view_name, .. } => format!("View({view_name:?})"),
            StateKind::SubFlow { flow_id, .. } => format!("SubFlow({flow_id})"),
            StateKind::End { view_name } => format!("End({view_name:?})"),
        };
        f.debug_struct("State")
            .field("id", &self.id)
            .field("kind", &kind)
            .finish()
    }
}
