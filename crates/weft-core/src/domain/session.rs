use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::flow::{FlowId, StateId};
use crate::domain::scope::Scope;
use crate::error::FlowError;

/// Status of one session frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// The session is the active top of stack
    Active,

    /// The session is paused underneath an active sub-flow session
    Suspended,

    /// The session has been popped off the stack
    Ended,
}

/// One frame of an execution's session stack: a single flow being run,
/// possibly nested under a parent flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSession {
    flow_id: FlowId,
    current_state_id: StateId,
    scope: Scope,
    status: SessionStatus,
}

impl FlowSession {
    /// Creates an active session positioned at the given state, seeded with
    /// the given input attributes.
    pub fn new(flow_id: FlowId, current_state_id: StateId, input: Scope) -> Self {
        Self {
            flow_id,
            current_state_id,
            scope: input,
            status: SessionStatus::Active,
        }
    }

    /// The flow this session is running.
    pub fn flow_id(&self) -> &FlowId {
        &self.flow_id
    }

    /// The state the session is currently in.
    pub fn current_state_id(&self) -> &StateId {
        &self.current_state_id
    }

    /// The session's flow scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Mutable access to the session's flow scope.
    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// The session status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }
}

/// The ordered stack of session frames for one execution; the top of stack
/// identifies the currently active flow and state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowSessionStack {
    sessions: Vec<FlowSession>,
}

impl FlowSessionStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no sessions are on the stack.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of stacked sessions (1 for a root flow with no active
    /// sub-flow).
    pub fn depth(&self) -> usize {
        self.sessions.len()
    }

    /// The active (top of stack) session.
    pub fn active(&self) -> Result<&FlowSession, FlowError> {
        self.sessions.last().ok_or(FlowError::NoActiveSession)
    }

    /// Mutable access to the active session.
    pub fn active_mut(&mut self) -> Result<&mut FlowSession, FlowError> {
        self.sessions.last_mut().ok_or(FlowError::NoActiveSession)
    }

    /// The active session's current state id.
    pub fn current_state_id(&self) -> Result<&StateId, FlowError> {
        Ok(self.active()?.current_state_id())
    }

    /// The active session's flow id.
    pub fn active_flow_id(&self) -> Result<&FlowId, FlowError> {
        Ok(self.active()?.flow_id())
    }

    /// Pushes a session, suspending the session underneath it.
    pub fn push(&mut self, session: FlowSession) {
        if let Some(parent) = self.sessions.last_mut() {
            parent.status = SessionStatus::Suspended;
        }
        debug!(flow = %session.flow_id, depth = self.sessions.len() + 1, "session pushed");
        self.sessions.push(session);
    }

    /// Pops the active session, reactivating the one underneath it. The
    /// popped frame is returned with its status marked ended.
    pub fn pop(&mut self) -> Result<FlowSession, FlowError> {
        let mut ended = self.sessions.pop().ok_or(FlowError::NoActiveSession)?;
        ended.status = SessionStatus::Ended;
        if let Some(resuming) = self.sessions.last_mut() {
            resuming.status = SessionStatus::Active;
        }
        debug!(flow = %ended.flow_id, depth = self.sessions.len(), "session popped");
        Ok(ended)
    }

    /// Repositions the active session on the given state, returning the
    /// previous state id.
    pub(crate) fn set_current_state(&mut self, state_id: StateId) -> Result<StateId, FlowError> {
        let session = self.active_mut()?;
        Ok(std::mem::replace(&mut session.current_state_id, state_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(flow: &str, state: &str) -> FlowSession {
        FlowSession::new(FlowId::from(flow), StateId::from(state), Scope::new())
    }

    #[test]
    fn test_push_suspends_parent() {
        let mut stack = FlowSessionStack::new();
        stack.push(session("parent", "spawn"));
        stack.push(session("child", "start"));

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.active().unwrap().flow_id(), &FlowId::from("child"));
        assert_eq!(stack.sessions[0].status(), SessionStatus::Suspended);
    }

    #[test]
    fn test_pop_reactivates_parent() {
        let mut stack = FlowSessionStack::new();
        stack.push(session("parent", "spawn"));
        stack.push(session("child", "finish"));

        let ended = stack.pop().unwrap();
        assert_eq!(ended.flow_id(), &FlowId::from("child"));
        assert_eq!(ended.status(), SessionStatus::Ended);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.active().unwrap().status(), SessionStatus::Active);
    }

    #[test]
    fn test_pop_leaves_second_frame_on_top() {
        let mut stack = FlowSessionStack::new();
        stack.push(session("root", "a"));
        stack.push(session("mid", "b"));
        stack.push(session("leaf", "c"));

        stack.pop().unwrap();
        assert_eq!(stack.active_flow_id().unwrap(), &FlowId::from("mid"));
    }

    #[test]
    fn test_empty_stack_access_fails() {
        let mut stack = FlowSessionStack::new();
        assert!(matches!(stack.active(), Err(FlowError::NoActiveSession)));
        assert!(matches!(stack.pop(), Err(FlowError::NoActiveSession)));
    }

    #[test]
    fn test_set_current_state_returns_previous() {
        let mut stack = FlowSessionStack::new();
        stack.push(session("flow", "first"));
        let previous = stack.set_current_state(StateId::from("second")).unwrap();
        assert_eq!(previous, StateId::from("first"));
        assert_eq!(stack.current_state_id().unwrap(), &StateId::from("second"));
    }
}
