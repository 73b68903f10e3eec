use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The inbound request handed to the engine for one `start` or
/// `signal_event` cycle.
///
/// Carries the request parameters the boundary adapter extracted; guards and
/// actions may inspect them, but the engine itself only passes them through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    parameters: HashMap<String, Value>,
}

impl RequestContext {
    /// An empty request, for callers that have no parameters to pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// A request carrying the given parameters.
    pub fn from_parameters(parameters: HashMap<String, Value>) -> Self {
        Self { parameters }
    }

    /// Returns the parameter stored under `name`.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Returns the parameter stored under `name` as a string slice.
    pub fn parameter_str(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Value::as_str)
    }
}
