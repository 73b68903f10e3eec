use std::sync::Arc;

use crate::domain::flow::{FlowId, StateId};
use crate::domain::session::FlowSession;

/// Observer of flow execution lifecycle events.
///
/// All hooks default to no-ops; implementors override the ones they care
/// about. Listeners must not assume they run on any particular thread, and
/// they observe the execution rather than steer it.
#[allow(unused_variables)]
pub trait FlowExecutionListener: Send + Sync {
    /// A flow session started (the root flow or a spawned sub-flow).
    fn started(&self, flow: &FlowId) {}

    /// An external event was signaled in a state of the active flow.
    fn event_signaled(&self, flow: &FlowId, event_id: &str, state: &StateId) {}

    /// A state was entered; `previous` is `None` for the first entry of a
    /// session.
    fn state_entered(&self, flow: &FlowId, previous: Option<&StateId>, state: &StateId) {}

    /// A sub-flow session was spawned from the given parent flow.
    fn sub_flow_spawned(&self, parent: &FlowId, sub_flow: &FlowId) {}

    /// A flow session ended; `ended` is the popped session frame.
    fn flow_ended(&self, flow: &FlowId, ended: &FlowSession) {}

    /// The whole execution ended (the root session was popped).
    fn ended(&self, root: &FlowId) {}
}

/// An ordered collection of execution listeners, broadcast to in
/// registration order.
#[derive(Clone, Default)]
pub struct FlowExecutionListenerList {
    listeners: Vec<Arc<dyn FlowExecutionListener>>,
}

impl FlowExecutionListenerList {
    /// An empty listener list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener to the end of the list.
    pub fn add(&mut self, listener: Arc<dyn FlowExecutionListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Iterates over the registered listeners.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FlowExecutionListener>> {
        self.listeners.iter()
    }

    pub(crate) fn notify_started(&self, flow: &FlowId) {
        for listener in &self.listeners {
            listener.started(flow);
        }
    }

    pub(crate) fn notify_event_signaled(&self, flow: &FlowId, event_id: &str, state: &StateId) {
        for listener in &self.listeners {
            listener.event_signaled(flow, event_id, state);
        }
    }

    pub(crate) fn notify_state_entered(
        &self,
        flow: &FlowId,
        previous: Option<&StateId>,
        state: &StateId,
    ) {
        for listener in &self.listeners {
            listener.state_entered(flow, previous, state);
        }
    }

    pub(crate) fn notify_sub_flow_spawned(&self, parent: &FlowId, sub_flow: &FlowId) {
        for listener in &self.listeners {
            listener.sub_flow_spawned(parent, sub_flow);
        }
    }

    pub(crate) fn notify_flow_ended(&self, flow: &FlowId, ended: &FlowSession) {
        for listener in &self.listeners {
            listener.flow_ended(flow, ended);
        }
    }

    pub(crate) fn notify_ended(&self, root: &FlowId) {
        for listener in &self.listeners {
            listener.ended(root);
        }
    }
}

impl std::fmt::Debug for FlowExecutionListenerList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowExecutionListenerList")
            .field("len", &self.listeners.len())
            .finish()
    }
}
