use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::catalog::ServiceCatalog;
use crate::domain::flow::{Flow, FlowId, StateId};
use crate::domain::listener::{FlowExecutionListener, FlowExecutionListenerList};
use crate::domain::request::RequestContext;
use crate::domain::scope::Scope;
use crate::domain::session::{FlowSession, FlowSessionStack};
use crate::domain::view::ViewDescriptor;
use crate::error::FlowError;

/// Value object: flow execution id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    /// Generates a fresh random execution id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a flow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Created but not yet started
    NotStarted,

    /// Actively running a flow (possibly paused at a view state between
    /// requests)
    Active,

    /// The root session has been popped; the conversation is over
    Ended,
}

/// The mutable engine state threaded through one request-handling cycle.
///
/// Holds disjoint borrows of the execution's parts so that states and
/// transitions can recurse (sub-flow spawn, end-state resumption) without
/// re-borrowing the whole execution.
pub(crate) struct ExecutionContext<'e> {
    pub(crate) stack: &'e mut FlowSessionStack,
    pub(crate) catalog: &'e dyn ServiceCatalog,
    pub(crate) listeners: &'e FlowExecutionListenerList,
    pub(crate) request: &'e RequestContext,
}

impl ExecutionContext<'_> {
    /// The active session's flow scope.
    pub(crate) fn scope(&self) -> Result<&Scope, FlowError> {
        Ok(self.stack.active()?.scope())
    }

    /// Pushes a session for the given flow and enters its start state.
    pub(crate) fn spawn_session(
        &mut self,
        flow: &Flow,
        input: Scope,
    ) -> Result<ViewDescriptor, FlowError> {
        self.stack.push(FlowSession::new(
            flow.id().clone(),
            flow.start_state().id().clone(),
            input,
        ));
        if let Some(listener) = flow.lifecycle_listener() {
            listener.started(flow.id());
        }
        self.listeners.notify_started(flow.id());
        flow.start_state().enter(flow, self)
    }
}

/// One client's live run of a flow definition.
///
/// Tracks the nested session stack, the execution status and the last
/// signaled event. Executions are driven by one request at a time; they are
/// not internally synchronized, callers serialize access per client session.
pub struct FlowExecution {
    id: ExecutionId,
    root_flow_id: FlowId,
    catalog: Arc<dyn ServiceCatalog>,
    listeners: FlowExecutionListenerList,
    stack: FlowSessionStack,
    status: ExecutionStatus,
    last_event_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FlowExecution {
    /// Creates a new, not yet started execution of the given root flow.
    pub fn new(root_flow_id: FlowId, catalog: Arc<dyn ServiceCatalog>) -> Self {
        let now = Utc::now();
        Self {
            id: ExecutionId::generate(),
            root_flow_id,
            catalog,
            listeners: FlowExecutionListenerList::new(),
            stack: FlowSessionStack::new(),
            status: ExecutionStatus::NotStarted,
            last_event_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Registers an execution listener.
    pub fn add_listener(&mut self, listener: Arc<dyn FlowExecutionListener>) {
        self.listeners.add(listener);
    }

    /// The execution id.
    pub fn id(&self) -> &ExecutionId {
        &self.id
    }

    /// The root flow definition id.
    pub fn root_flow_id(&self) -> &FlowId {
        &self.root_flow_id
    }

    /// The execution status.
    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    /// True while the conversation is in progress.
    pub fn is_active(&self) -> bool {
        self.status == ExecutionStatus::Active
    }

    /// True once the root session has been popped.
    pub fn is_ended(&self) -> bool {
        self.status == ExecutionStatus::Ended
    }

    /// The id of the currently active (innermost) flow.
    pub fn active_flow_id(&self) -> Result<&FlowId, FlowError> {
        self.stack.active_flow_id()
    }

    /// The id of the current state of the active flow.
    pub fn current_state_id(&self) -> Result<&StateId, FlowError> {
        self.stack.current_state_id()
    }

    /// Number of stacked sessions.
    pub fn session_depth(&self) -> usize {
        self.stack.depth()
    }

    /// The active session's flow scope.
    pub fn active_scope(&self) -> Result<&Scope, FlowError> {
        Ok(self.stack.active()?.scope())
    }

    /// Mutable access to the active session's flow scope.
    pub fn active_scope_mut(&mut self) -> Result<&mut Scope, FlowError> {
        Ok(self.stack.active_mut()?.scope_mut())
    }

    /// The most recently signaled event id.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// When the execution was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the execution last handled a request.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Starts this execution: spawns the root session and enters the root
    /// flow's start state, returning the first view selection.
    pub fn start(
        &mut self,
        input: Scope,
        request: &RequestContext,
    ) -> Result<ViewDescriptor, FlowError> {
        if self.status != ExecutionStatus::NotStarted {
            return Err(FlowError::InvalidStatus {
                expected: ExecutionStatus::NotStarted,
                actual: self.status,
            });
        }
        let flow = self.catalog.flow(&self.root_flow_id)?;
        info!(flow = %self.root_flow_id, execution = %self.id, "starting flow execution");
        self.status = ExecutionStatus::Active;
        let view = {
            let mut ctx = ExecutionContext {
                stack: &mut self.stack,
                catalog: self.catalog.as_ref(),
                listeners: &self.listeners,
                request,
            };
            ctx.spawn_session(&flow, input)?
        };
        self.finish_request();
        Ok(view)
    }

    /// Signals an event in the named state (defaulting to the current state)
    /// of the active flow. The named state must exist and be transitionable;
    /// an event with no matching transition is a configuration error.
    pub fn signal_event(
        &mut self,
        event_id: &str,
        state_id: Option<&StateId>,
        request: &RequestContext,
    ) -> Result<ViewDescriptor, FlowError> {
        if self.status != ExecutionStatus::Active {
            return Err(FlowError::InvalidStatus {
                expected: ExecutionStatus::Active,
                actual: self.status,
            });
        }
        let active_flow_id = self.stack.active_flow_id()?.clone();
        let current_state_id = self.stack.current_state_id()?.clone();
        let state_id = state_id.cloned().unwrap_or_else(|| current_state_id.clone());
        if state_id != current_state_id {
            debug!(
                named = %state_id,
                current = %current_state_id,
                "signaled state differs from the current state"
            );
        }
        let flow = self.catalog.flow(&active_flow_id)?;
        flow.required_transitionable_state(&state_id)?;

        debug!(flow = %active_flow_id, state = %state_id, event = event_id, "event signaled");
        self.last_event_id = Some(event_id.to_string());
        self.listeners
            .notify_event_signaled(&active_flow_id, event_id, &state_id);
        let view = {
            let mut ctx = ExecutionContext {
                stack: &mut self.stack,
                catalog: self.catalog.as_ref(),
                listeners: &self.listeners,
                request,
            };
            flow.execute(event_id, &state_id, &mut ctx)?
        };
        self.finish_request();
        Ok(view)
    }

    fn finish_request(&mut self) {
        if self.stack.is_empty() && self.status == ExecutionStatus::Active {
            self.status = ExecutionStatus::Ended;
            info!(flow = %self.root_flow_id, execution = %self.id, "flow execution ended");
            self.listeners.notify_ended(&self.root_flow_id);
        }
        self.updated_at = Utc::now();
    }
}

impl fmt::Debug for FlowExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowExecution")
            .field("id", &self.id)
            .field("root_flow_id", &self.root_flow_id)
            .field("status", &self.status)
            .field("depth", &self.stack.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FlowBuilder;
    use crate::domain::action::Action;
    use crate::domain::catalog::FlowLocator;
    use crate::domain::mapper::FlowAttributeMapper;
    use crate::domain::transition::Transition;
    use std::collections::HashMap;

    struct StubCatalog {
        flows: HashMap<FlowId, Arc<Flow>>,
    }

    impl StubCatalog {
        fn with_flow(flow: Flow) -> Arc<Self> {
            let mut flows = HashMap::new();
            flows.insert(flow.id().clone(), Arc::new(flow));
            Arc::new(Self { flows })
        }
    }

    impl FlowLocator for StubCatalog {
        fn flow(&self, id: &FlowId) -> Result<Arc<Flow>, FlowError> {
            self.flows
                .get(id)
                .cloned()
                .ok_or_else(|| FlowError::NoSuchFlow(id.clone()))
        }
    }

    impl ServiceCatalog for StubCatalog {
        fn action(&self, id: &str) -> Result<Arc<dyn Action>, FlowError> {
            Err(FlowError::NoSuchAction(id.to_string()))
        }

        fn attribute_mapper(&self, id: &str) -> Result<Arc<dyn FlowAttributeMapper>, FlowError> {
            Err(FlowError::NoSuchAttributeMapper(id.to_string()))
        }
    }

    fn linear_flow() -> Flow {
        FlowBuilder::new("linear")
            .view_state("a", Some("viewA"), vec![Transition::on("submit", "done")])
            .end_state("done", Some("viewDone"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_start_enters_start_state() {
        let catalog = StubCatalog::with_flow(linear_flow());
        let mut execution = FlowExecution::new(FlowId::from("linear"), catalog);

        let view = execution
            .start(Scope::new(), &RequestContext::new())
            .unwrap();
        assert_eq!(view.view_name.as_deref(), Some("viewA"));
        assert!(execution.is_active());
        assert_eq!(execution.current_state_id().unwrap(), &StateId::from("a"));
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let catalog = StubCatalog::with_flow(linear_flow());
        let mut execution = FlowExecution::new(FlowId::from("linear"), catalog);

        execution.start(Scope::new(), &RequestContext::new()).unwrap();
        let err = execution
            .start(Scope::new(), &RequestContext::new())
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidStatus { .. }));
    }

    #[test]
    fn test_signal_before_start_is_rejected() {
        let catalog = StubCatalog::with_flow(linear_flow());
        let mut execution = FlowExecution::new(FlowId::from("linear"), catalog);

        let err = execution
            .signal_event("submit", None, &RequestContext::new())
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::InvalidStatus {
                expected: ExecutionStatus::Active,
                ..
            }
        ));
    }

    #[test]
    fn test_signal_drives_flow_to_end() {
        let catalog = StubCatalog::with_flow(linear_flow());
        let mut execution = FlowExecution::new(FlowId::from("linear"), catalog);

        execution.start(Scope::new(), &RequestContext::new()).unwrap();
        let view = execution
            .signal_event("submit", None, &RequestContext::new())
            .unwrap();
        assert_eq!(view.view_name.as_deref(), Some("viewDone"));
        assert!(execution.is_ended());
        assert_eq!(execution.session_depth(), 0);
        assert_eq!(execution.last_event_id(), Some("submit"));
    }

    #[test]
    fn test_signal_after_end_is_rejected() {
        let catalog = StubCatalog::with_flow(linear_flow());
        let mut execution = FlowExecution::new(FlowId::from("linear"), catalog);

        execution.start(Scope::new(), &RequestContext::new()).unwrap();
        execution
            .signal_event("submit", None, &RequestContext::new())
            .unwrap();
        let err = execution
            .signal_event("submit", None, &RequestContext::new())
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidStatus { .. }));
    }

    #[test]
    fn test_unmatched_event_is_configuration_error() {
        let catalog = StubCatalog::with_flow(linear_flow());
        let mut execution = FlowExecution::new(FlowId::from("linear"), catalog);

        execution.start(Scope::new(), &RequestContext::new()).unwrap();
        let err = execution
            .signal_event("bogus", None, &RequestContext::new())
            .unwrap_err();
        assert!(matches!(err, FlowError::NoMatchingTransition { event, .. } if event == "bogus"));
        // The execution is still active and positioned where it was.
        assert!(execution.is_active());
        assert_eq!(execution.current_state_id().unwrap(), &StateId::from("a"));
    }
}
