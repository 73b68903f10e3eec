use serde::{Deserialize, Serialize};

/// The document versions this crate understands.
pub const SUPPORTED_VERSIONS: &[&str] = &["1", "1.0"];

fn default_version() -> String {
    "1.0".to_string()
}

/// The serialized form of one flow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    /// The document version (e.g. "1.0")
    #[serde(default = "default_version")]
    pub version: String,

    /// Unique id of the flow
    pub id: String,

    /// Optional human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// The start state; defaults to the first declared state
    #[serde(default)]
    pub start: Option<String>,

    /// The states of the flow, in order
    pub states: Vec<StateDocument>,
}

/// The kind of a declared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateType {
    /// Executes actions and routes on their result events
    Action,

    /// Pauses and renders a view
    View,

    /// Spawns a nested flow
    SubFlow,

    /// Terminates the flow
    End,
}

/// One declared state. Which fields are required depends on `type`:
/// action states name their actions, sub-flow states name the flow to
/// spawn, view and end states may name a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    /// State id, unique within the document
    pub id: String,

    /// The state kind
    #[serde(rename = "type")]
    pub state_type: StateType,

    /// View name for view and end states
    #[serde(default)]
    pub view: Option<String>,

    /// Action ids for action states, resolved through the catalog
    #[serde(default)]
    pub actions: Vec<String>,

    /// Flow id for sub-flow states
    #[serde(default)]
    pub flow: Option<String>,

    /// Attribute mapper id for sub-flow states
    #[serde(default)]
    pub mapper: Option<String>,

    /// The state's transition table
    #[serde(default)]
    pub transitions: Vec<TransitionDocument>,
}

/// One declared transition: `on` an event id, go `to` a state id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDocument {
    /// The event id the transition responds to
    pub on: String,

    /// The target state id
    pub to: String,
}
