use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::domain::execution::ExecutionContext;
use crate::domain::flow::{Flow, StateId};
use crate::domain::request::RequestContext;
use crate::domain::scope::Scope;
use crate::domain::state::State;
use crate::domain::view::ViewDescriptor;
use crate::error::FlowError;

/// The context a transition guard may inspect: the signaled event, the
/// inbound request and the active session's flow scope. Guards are
/// side-effect free.
pub struct GuardContext<'a> {
    /// The event id being dispatched
    pub event_id: &'a str,

    /// The inbound request
    pub request: &'a RequestContext,

    /// The active session's flow scope
    pub scope: &'a Scope,
}

/// The guard of a transition: decides whether the transition should execute
/// for a given event in a given context.
pub trait TransitionCriteria: Send + Sync {
    /// Tests the guard. Must be free of side effects.
    fn test(&self, ctx: &GuardContext<'_>) -> bool;

    /// A short description for logs and `Debug` output.
    fn describe(&self) -> String {
        "<custom criteria>".to_string()
    }
}

impl<F> TransitionCriteria for F
where
    F: Fn(&GuardContext<'_>) -> bool + Send + Sync,
{
    fn test(&self, ctx: &GuardContext<'_>) -> bool {
        self(ctx)
    }
}

/// The standard guard: accepts exactly one event id.
pub struct EventIdCriteria {
    event_id: String,
}

impl EventIdCriteria {
    /// A guard accepting the given event id.
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
        }
    }
}

impl TransitionCriteria for EventIdCriteria {
    fn test(&self, ctx: &GuardContext<'_>) -> bool {
        ctx.event_id == self.event_id
    }

    fn describe(&self) -> String {
        self.event_id.clone()
    }
}

/// A guarded, directed edge from its owning source state to a target state.
///
/// The target is referenced by id and resolved lazily on first execution,
/// after the owning flow has been frozen. The resolved target is memoized in
/// a race-tolerant cell: concurrent executions may redundantly recompute the
/// same index, and whichever write lands first wins. Because flow definitions
/// never change after construction, the cached resolution is stable for the
/// lifetime of the definition.
pub struct Transition {
    criteria: Arc<dyn TransitionCriteria>,
    target_state_id: StateId,
    resolved: OnceCell<usize>,
}

impl Transition {
    /// A transition guarded by event-id equality.
    pub fn on(event_id: impl Into<String>, target_state_id: impl Into<StateId>) -> Self {
        Self::when(Arc::new(EventIdCriteria::new(event_id)), target_state_id)
    }

    /// A transition guarded by arbitrary criteria.
    pub fn when(
        criteria: Arc<dyn TransitionCriteria>,
        target_state_id: impl Into<StateId>,
    ) -> Self {
        Self {
            criteria,
            target_state_id: target_state_id.into(),
            resolved: OnceCell::new(),
        }
    }

    /// The id of the target state.
    pub fn target_state_id(&self) -> &StateId {
        &self.target_state_id
    }

    /// True when this transition should execute for the given context.
    pub fn matches(&self, ctx: &GuardContext<'_>) -> bool {
        self.criteria.test(ctx)
    }

    /// Resolves the target state within the owning flow, memoizing the
    /// result. Resolution is idempotent: every call returns the state the
    /// flow maps the target id to.
    pub fn target_state<'f>(&self, flow: &'f Flow) -> Result<&'f State, FlowError> {
        if let Some(&index) = self.resolved.get() {
            return flow.state_by_index(index).ok_or_else(|| {
                FlowError::InvariantViolation(format!(
                    "cached target index {} is out of bounds in flow '{}'",
                    index,
                    flow.id()
                ))
            });
        }
        let index = flow
            .state_index(&self.target_state_id)
            .ok_or_else(|| FlowError::NoSuchState {
                flow: flow.id().clone(),
                state: self.target_state_id.clone(),
            })?;
        // A concurrent execution may have resolved it first; either write
        // stores the same index, so losing the race is harmless.
        let _ = self.resolved.set(index);
        flow.state_by_index(index).ok_or_else(|| {
            FlowError::InvariantViolation(format!(
                "resolved target index {} is out of bounds in flow '{}'",
                index,
                flow.id()
            ))
        })
    }

    /// Executes this transition: resolves the target state and enters it.
    /// A target id that does not resolve surfaces as a dedicated
    /// cannot-execute error wrapping the lookup failure.
    pub(crate) fn execute(
        &self,
        flow: &Flow,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ViewDescriptor, FlowError> {
        let target = self
            .target_state(flow)
            .map_err(|source| FlowError::CannotExecuteTransition {
                target: self.target_state_id.clone(),
                source: Box::new(source),
            })?;
        let view = target.enter(flow, ctx)?;
        if ctx.stack.is_empty() {
            debug!(transition = %self.describe(), flow = %flow.id(), "transition executed, flow execution has ended");
        } else {
            debug!(
                transition = %self.describe(),
                state = %ctx.stack.current_state_id()?,
                "transition executed"
            );
        }
        Ok(view)
    }

    fn describe(&self) -> String {
        format!("on '{}' to '{}'", self.criteria.describe(), self.target_state_id)
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("on", &self.criteria.describe())
            .field("to", &self.target_state_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FlowBuilder;

    fn guard_ctx<'a>(event: &'a str, request: &'a RequestContext, scope: &'a Scope) -> GuardContext<'a> {
        GuardContext {
            event_id: event,
            request,
            scope,
        }
    }

    #[test]
    fn test_event_id_criteria() {
        let request = RequestContext::new();
        let scope = Scope::new();
        let transition = Transition::on("submit", "next");
        assert!(transition.matches(&guard_ctx("submit", &request, &scope)));
        assert!(!transition.matches(&guard_ctx("cancel", &request, &scope)));
    }

    #[test]
    fn test_closure_criteria() {
        let request = RequestContext::new();
        let mut scope = Scope::new();
        scope.set("ready", serde_json::json!(true));

        let criteria = |ctx: &GuardContext<'_>| {
            ctx.event_id == "submit" && ctx.scope.get("ready").is_some()
        };
        let transition = Transition::when(Arc::new(criteria), "next");
        assert!(transition.matches(&guard_ctx("submit", &request, &scope)));
    }

    #[test]
    fn test_target_resolution_is_idempotent() {
        let flow = FlowBuilder::new("f")
            .view_state("a", Some("viewA"), vec![Transition::on("go", "b")])
            .view_state("b", Some("viewB"), vec![])
            .build()
            .unwrap();

        let state = flow.state(&StateId::from("a")).unwrap();
        let transition = &state.transitions().unwrap()[0];

        let first = transition.target_state(&flow).unwrap();
        assert_eq!(first.id(), &StateId::from("b"));
        // Repeated resolution returns the same state the flow maps the id to.
        for _ in 0..3 {
            let resolved = transition.target_state(&flow).unwrap();
            assert!(std::ptr::eq(resolved, flow.state(&StateId::from("b")).unwrap()));
        }
    }

    #[test]
    fn test_unresolvable_target_reports_missing_state() {
        let flow = FlowBuilder::new("f")
            .view_state("a", Some("viewA"), vec![Transition::on("go", "nowhere")])
            .build()
            .unwrap();

        let state = flow.state(&StateId::from("a")).unwrap();
        let transition = &state.transitions().unwrap()[0];
        let err = transition.target_state(&flow).unwrap_err();
        assert!(matches!(err, FlowError::NoSuchState { state, .. } if state == StateId::from("nowhere")));
    }
}
