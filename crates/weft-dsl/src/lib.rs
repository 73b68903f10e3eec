//! # Weft DSL
//!
//! YAML flow-definition documents for the Weft platform. A document declares
//! one flow: its states, their transitions, and the actions, attribute
//! mappers and sub-flows they reference by id. This crate parses and
//! validates documents and assembles them into frozen
//! [`weft_core::Flow`] definitions against a service catalog.
//!
//! ## Example
//!
//! ```
//! use weft_dsl::parse_flow_document;
//!
//! let yaml = r#"
//! version: "1.0"
//! id: order
//! states:
//!   - id: details
//!     type: view
//!     view: detailsForm
//!     transitions:
//!       - on: submit
//!         to: done
//!   - id: done
//!     type: end
//!     view: confirmation
//! "#;
//!
//! let document = parse_flow_document(yaml).unwrap();
//! assert_eq!(document.id, "order");
//! assert_eq!(document.states.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;

use std::collections::HashSet;

use weft_core::{Flow, FlowBuilder, ServiceCatalog, Transition};

pub use document::{
    FlowDocument, StateDocument, StateType, TransitionDocument, SUPPORTED_VERSIONS,
};
pub use error::DslError;

/// Parses and validates a YAML flow document.
///
/// # Errors
///
/// Fails on invalid YAML, an unsupported version, or a structurally invalid
/// document (duplicate state ids, dangling transition targets, per-kind
/// field violations).
pub fn parse_flow_document(yaml: &str) -> Result<FlowDocument, DslError> {
    let document: FlowDocument = serde_yaml::from_str(yaml)?;
    validate_document(&document)?;
    Ok(document)
}

/// Validates a flow document's structure and internal references.
pub fn validate_document(document: &FlowDocument) -> Result<(), DslError> {
    if !SUPPORTED_VERSIONS.contains(&document.version.as_str()) {
        return Err(DslError::UnsupportedVersion(document.version.clone()));
    }
    if document.states.is_empty() {
        return Err(DslError::Validation(format!(
            "flow '{}' declares no states",
            document.id
        )));
    }

    let mut ids = HashSet::new();
    for state in &document.states {
        if !ids.insert(state.id.as_str()) {
            return Err(DslError::Validation(format!(
                "duplicate state id '{}' in flow '{}'",
                state.id, document.id
            )));
        }
    }

    if let Some(start) = &document.start {
        if !ids.contains(start.as_str()) {
            return Err(DslError::Validation(format!(
                "start state '{}' is not declared in flow '{}'",
                start, document.id
            )));
        }
    }

    for state in &document.states {
        validate_state(document, state, &ids)?;
    }

    Ok(())
}

fn validate_state(
    document: &FlowDocument,
    state: &StateDocument,
    ids: &HashSet<&str>,
) -> Result<(), DslError> {
    match state.state_type {
        StateType::Action => {
            if state.actions.is_empty() {
                return Err(DslError::Validation(format!(
                    "action state '{}' names no actions",
                    state.id
                )));
            }
        }
        StateType::SubFlow => {
            if state.flow.is_none() {
                return Err(DslError::Validation(format!(
                    "sub-flow state '{}' names no flow to spawn",
                    state.id
                )));
            }
        }
        StateType::End => {
            if !state.transitions.is_empty() {
                return Err(DslError::Validation(format!(
                    "end state '{}' cannot declare transitions",
                    state.id
                )));
            }
        }
        StateType::View => {}
    }

    for transition in &state.transitions {
        if transition.on.is_empty() {
            return Err(DslError::Validation(format!(
                "state '{}' declares a transition with an empty event id",
                state.id
            )));
        }
        // Unlike programmatic assembly, documents are validated strictly:
        // every target must be declared in the same document.
        if !ids.contains(transition.to.as_str()) {
            return Err(DslError::Validation(format!(
                "state '{}' transitions to undeclared state '{}' in flow '{}'",
                state.id, transition.to, document.id
            )));
        }
    }

    Ok(())
}

/// Assembles a validated document into a frozen flow definition.
///
/// Action references are resolved through the catalog now and embedded in
/// the definition; attribute mappers are checked for existence but stay
/// referenced by id (the runtime resolves them at use). Sub-flow references
/// are not checked, so documents may reference flows registered later.
pub fn assemble(
    document: &FlowDocument,
    catalog: &dyn ServiceCatalog,
) -> Result<Flow, DslError> {
    let assembly_error = |source| DslError::Assembly {
        flow: document.id.clone(),
        source,
    };

    let mut builder = FlowBuilder::new(document.id.as_str());
    if let Some(start) = &document.start {
        builder = builder.start_state(start.as_str());
    }

    for state in &document.states {
        let transitions: Vec<Transition> = state
            .transitions
            .iter()
            .map(|t| Transition::on(t.on.as_str(), t.to.as_str()))
            .collect();
        builder = match state.state_type {
            StateType::Action => {
                let mut actions = Vec::with_capacity(state.actions.len());
                for action_id in &state.actions {
                    actions.push(catalog.action(action_id).map_err(assembly_error)?);
                }
                builder.action_state(state.id.as_str(), actions, transitions)
            }
            StateType::View => {
                builder.view_state(state.id.as_str(), state.view.as_deref(), transitions)
            }
            StateType::SubFlow => {
                // Validation guarantees the flow reference is present.
                let flow_id = state.flow.as_deref().unwrap_or_default();
                if let Some(mapper_id) = &state.mapper {
                    catalog
                        .attribute_mapper(mapper_id)
                        .map(drop)
                        .map_err(assembly_error)?;
                }
                builder.sub_flow_state(
                    state.id.as_str(),
                    flow_id,
                    state.mapper.as_deref(),
                    transitions,
                )
            }
            StateType::End => builder.end_state(state.id.as_str(), state.view.as_deref()),
        };
    }

    builder.build().map_err(assembly_error)
}

/// Parses, validates and assembles a YAML flow document in one call.
pub fn parse_and_assemble(
    yaml: &str,
    catalog: &dyn ServiceCatalog,
) -> Result<Flow, DslError> {
    let document = parse_flow_document(yaml)?;
    assemble(&document, catalog)
}
