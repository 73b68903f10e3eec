use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::catalog::ServiceCatalog;
use crate::domain::execution::{ExecutionId, ExecutionStatus, FlowExecution};
use crate::domain::flow::{FlowId, StateId};
use crate::domain::listener::{FlowExecutionListener, FlowExecutionListenerList};
use crate::domain::request::RequestContext;
use crate::domain::scope::Scope;
use crate::domain::view::ViewDescriptor;
use crate::error::FlowError;

/// Model attribute under which the manager exposes the execution id to
/// views, so that the next request can be routed back to the same execution.
pub const FLOW_EXECUTION_ID_ATTRIBUTE: &str = "_flow_execution_id";

/// Stores live flow executions between the requests of a conversation.
///
/// Executions are kept behind a mutex because a conversation is driven by
/// one request at a time; the repository itself may be shared freely.
#[async_trait]
pub trait FlowExecutionRepository: Send + Sync {
    /// Stores an execution under its id.
    async fn save(&self, execution: Arc<Mutex<FlowExecution>>) -> Result<(), FlowError>;

    /// Returns the execution stored under `id`, if any.
    async fn find_by_id(
        &self,
        id: &ExecutionId,
    ) -> Result<Option<Arc<Mutex<FlowExecution>>>, FlowError>;

    /// Removes the execution stored under `id`. Removing an unknown id is a
    /// no-op.
    async fn remove(&self, id: &ExecutionId) -> Result<(), FlowError>;

    /// Number of stored executions.
    async fn count(&self) -> Result<usize, FlowError>;
}

/// The outcome of one managed request cycle.
#[derive(Debug)]
pub struct FlowRequestOutcome {
    /// The execution that handled the request
    pub execution_id: ExecutionId,

    /// The execution status after the request
    pub status: ExecutionStatus,

    /// The view selection to render
    pub view: ViewDescriptor,
}

/// Application service that manages flow executions across requests.
///
/// `launch` creates and starts a fresh execution for a flow; `resume`
/// signals an event into a stored execution. Executions stay in the
/// repository while active and are removed once ended. The execution id is
/// stamped into every active view model so the boundary can round-trip it.
pub struct FlowExecutionManager {
    catalog: Arc<dyn ServiceCatalog>,
    executions: Arc<dyn FlowExecutionRepository>,
    listeners: FlowExecutionListenerList,
}

impl FlowExecutionManager {
    /// Creates a manager over the given catalog and execution store.
    pub fn new(
        catalog: Arc<dyn ServiceCatalog>,
        executions: Arc<dyn FlowExecutionRepository>,
    ) -> Self {
        Self {
            catalog,
            executions,
            listeners: FlowExecutionListenerList::new(),
        }
    }

    /// Registers a listener attached to every execution this manager
    /// launches.
    pub fn add_listener(&mut self, listener: Arc<dyn FlowExecutionListener>) {
        self.listeners.add(listener);
    }

    /// Creates and starts a new execution of the given flow.
    pub async fn launch(
        &self,
        flow_id: &FlowId,
        input: Scope,
        request: &RequestContext,
    ) -> Result<FlowRequestOutcome, FlowError> {
        // Surface an unknown flow id before creating any execution state.
        let _ = self.catalog.flow(flow_id)?;

        let mut execution = FlowExecution::new(flow_id.clone(), self.catalog.clone());
        for listener in self.listeners.iter() {
            execution.add_listener(listener.clone());
        }
        let mut view = execution.start(input, request)?;
        let execution_id = execution.id().clone();
        let status = execution.status();

        if execution.is_active() {
            view.set_attribute(FLOW_EXECUTION_ID_ATTRIBUTE, json!(execution_id.0));
            self.executions
                .save(Arc::new(Mutex::new(execution)))
                .await?;
            debug!(execution = %execution_id, flow = %flow_id, "execution stored for continuation");
        } else {
            info!(execution = %execution_id, flow = %flow_id, "execution ended on launch");
        }

        Ok(FlowRequestOutcome {
            execution_id,
            status,
            view,
        })
    }

    /// Signals an event into the stored execution with the given id.
    pub async fn resume(
        &self,
        execution_id: &ExecutionId,
        event_id: &str,
        state_id: Option<&StateId>,
        request: &RequestContext,
    ) -> Result<FlowRequestOutcome, FlowError> {
        let execution = self
            .executions
            .find_by_id(execution_id)
            .await?
            .ok_or_else(|| FlowError::NoSuchExecution(execution_id.clone()))?;

        let (result, status) = {
            let mut execution = execution.lock().await;
            let result = execution.signal_event(event_id, state_id, request);
            (result, execution.status())
        };
        let mut view = result?;

        if status == ExecutionStatus::Ended {
            self.executions.remove(execution_id).await?;
            info!(execution = %execution_id, "execution ended and removed");
        } else {
            view.set_attribute(FLOW_EXECUTION_ID_ATTRIBUTE, json!(execution_id.0));
        }

        Ok(FlowRequestOutcome {
            execution_id: execution_id.clone(),
            status,
            view,
        })
    }
}
