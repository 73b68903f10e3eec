use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use weft_core::{
    Action, Flow, FlowAttributeMapper, FlowError, FlowId, FlowLocator, ServiceCatalog,
};

/// An in-memory service catalog: flows, actions and attribute mappers keyed
/// by id.
///
/// Registration happens at bootstrap; lookups are lock-free reads after
/// that. Registering under an existing id replaces the previous entry.
#[derive(Default)]
pub struct InMemoryFlowCatalog {
    flows: DashMap<FlowId, Arc<Flow>>,
    actions: DashMap<String, Arc<dyn Action>>,
    mappers: DashMap<String, Arc<dyn FlowAttributeMapper>>,
}

impl InMemoryFlowCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a flow definition under its own id, returning the shared
    /// handle.
    pub fn register_flow(&self, flow: Flow) -> Arc<Flow> {
        let flow = Arc::new(flow);
        debug!(flow = %flow.id(), "flow registered");
        self.flows.insert(flow.id().clone(), flow.clone());
        flow
    }

    /// Registers an action under the given id.
    pub fn register_action(&self, id: impl Into<String>, action: Arc<dyn Action>) {
        self.actions.insert(id.into(), action);
    }

    /// Registers an attribute mapper under the given id.
    pub fn register_attribute_mapper(
        &self,
        id: impl Into<String>,
        mapper: Arc<dyn FlowAttributeMapper>,
    ) {
        self.mappers.insert(id.into(), mapper);
    }

    /// Number of registered flows.
    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }
}

impl FlowLocator for InMemoryFlowCatalog {
    fn flow(&self, id: &FlowId) -> Result<Arc<Flow>, FlowError> {
        self.flows
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FlowError::NoSuchFlow(id.clone()))
    }
}

impl ServiceCatalog for InMemoryFlowCatalog {
    fn action(&self, id: &str) -> Result<Arc<dyn Action>, FlowError> {
        self.actions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FlowError::NoSuchAction(id.to_string()))
    }

    fn attribute_mapper(&self, id: &str) -> Result<Arc<dyn FlowAttributeMapper>, FlowError> {
        self.mappers
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FlowError::NoSuchAttributeMapper(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{FlowBuilder, Transition};

    fn sample_flow(id: &str) -> Flow {
        FlowBuilder::new(id)
            .view_state("a", Some("viewA"), vec![Transition::on("go", "done")])
            .end_state("done", None)
            .build()
            .unwrap()
    }

    #[test]
    fn test_flow_registration_and_lookup() {
        let catalog = InMemoryFlowCatalog::new();
        catalog.register_flow(sample_flow("order"));

        assert_eq!(catalog.flow_count(), 1);
        let flow = catalog.flow(&FlowId::from("order")).unwrap();
        assert_eq!(flow.id(), &FlowId::from("order"));

        let err = catalog.flow(&FlowId::from("missing")).unwrap_err();
        assert!(matches!(err, FlowError::NoSuchFlow(_)));
    }

    #[test]
    fn test_unknown_services_are_configuration_errors() {
        let catalog = InMemoryFlowCatalog::new();
        assert!(matches!(
            catalog.action("missing"),
            Err(FlowError::NoSuchAction(_))
        ));
        assert!(matches!(
            catalog.attribute_mapper("missing"),
            Err(FlowError::NoSuchAttributeMapper(_))
        ));
    }

    #[test]
    fn test_reregistration_replaces() {
        let catalog = InMemoryFlowCatalog::new();
        catalog.register_flow(sample_flow("order"));
        catalog.register_flow(sample_flow("order"));
        assert_eq!(catalog.flow_count(), 1);
    }
}
