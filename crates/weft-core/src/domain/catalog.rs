use std::sync::Arc;

use crate::domain::action::Action;
use crate::domain::flow::{Flow, FlowId};
use crate::domain::mapper::FlowAttributeMapper;
use crate::error::FlowError;

/// Resolves flow definitions by id.
///
/// The engine consults the locator when a sub-flow state spawns a nested
/// conversation and when an execution resumes a parent flow after a sub-flow
/// ends. Lookups happen inside synchronous state entry, so implementations
/// must not block on I/O.
pub trait FlowLocator: Send + Sync {
    /// Returns the flow registered under `id`, or a configuration error.
    fn flow(&self, id: &FlowId) -> Result<Arc<Flow>, FlowError>;
}

/// Resolves every kind of artifact a flow definition can reference by id:
/// flows, actions and attribute mappers.
///
/// Definition assembly resolves action references through the catalog; the
/// runtime resolves sub-flows and attribute mappers lazily, at first use.
pub trait ServiceCatalog: FlowLocator {
    /// Returns the action registered under `id`, or a configuration error.
    fn action(&self, id: &str) -> Result<Arc<dyn Action>, FlowError>;

    /// Returns the attribute mapper registered under `id`, or a
    /// configuration error.
    fn attribute_mapper(&self, id: &str) -> Result<Arc<dyn FlowAttributeMapper>, FlowError>;
}
