use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use weft_core::{ExecutionId, FlowError, FlowExecution, FlowExecutionRepository};

/// Stores live flow executions in a process-local map.
#[derive(Default)]
pub struct InMemoryExecutionRepository {
    executions: RwLock<HashMap<ExecutionId, Arc<Mutex<FlowExecution>>>>,
}

impl InMemoryExecutionRepository {
    /// An empty execution store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowExecutionRepository for InMemoryExecutionRepository {
    async fn save(&self, execution: Arc<Mutex<FlowExecution>>) -> Result<(), FlowError> {
        let id = execution.lock().await.id().clone();
        debug!(execution = %id, "execution saved");
        self.executions.write().await.insert(id, execution);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ExecutionId,
    ) -> Result<Option<Arc<Mutex<FlowExecution>>>, FlowError> {
        Ok(self.executions.read().await.get(id).cloned())
    }

    async fn remove(&self, id: &ExecutionId) -> Result<(), FlowError> {
        if self.executions.write().await.remove(id).is_some() {
            debug!(execution = %id, "execution removed");
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, FlowError> {
        Ok(self.executions.read().await.len())
    }
}
