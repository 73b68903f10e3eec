//! HTTP boundary: translates requests into flow execution signals.
//!
//! The controller exposes one route to launch a flow and one to signal an
//! event into a stored execution; responses carry the view selection plus
//! the execution id the client round-trips on the next request.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use weft_core::{
    ExecutionId, ExecutionStatus, FlowExecutionManager, FlowId, FlowRequestOutcome,
    RequestContext, Scope, StateId,
};

use crate::error::ServerError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The execution manager driving all conversations
    pub manager: Arc<FlowExecutionManager>,
}

/// Builds the server router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/flows/:flow_id/executions", post(start_flow))
        .route("/executions/:execution_id/signal", post(signal_event))
        .with_state(state)
}

/// Body of a launch request.
#[derive(Debug, Deserialize)]
struct StartFlowRequest {
    /// Input attributes seeded into the root flow scope
    #[serde(default)]
    input: HashMap<String, Value>,

    /// Request parameters visible to guards and actions
    #[serde(default)]
    parameters: HashMap<String, Value>,
}

/// Body of a signal request.
#[derive(Debug, Deserialize)]
struct SignalRequest {
    /// The event to signal
    event: String,

    /// The state the event occurred in; defaults to the current state
    #[serde(default)]
    state: Option<String>,

    /// Request parameters visible to guards and actions
    #[serde(default)]
    parameters: HashMap<String, Value>,
}

/// The rendered outcome of one request cycle.
#[derive(Debug, Serialize)]
struct FlowResponse {
    /// The execution that handled the request
    execution_id: String,

    /// The execution status after the request
    status: ExecutionStatus,

    /// The selected view, if any
    view: Option<String>,

    /// The view model
    model: HashMap<String, Value>,
}

impl From<FlowRequestOutcome> for FlowResponse {
    fn from(outcome: FlowRequestOutcome) -> Self {
        Self {
            execution_id: outcome.execution_id.0,
            status: outcome.status,
            view: outcome.view.view_name,
            model: outcome.view.model,
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn start_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    Json(body): Json<StartFlowRequest>,
) -> Result<Json<FlowResponse>, ServerError> {
    debug!(flow = %flow_id, "launch requested");
    let outcome = state
        .manager
        .launch(
            &FlowId::from(flow_id),
            Scope::from_map(body.input),
            &RequestContext::from_parameters(body.parameters),
        )
        .await?;
    Ok(Json(outcome.into()))
}

async fn signal_event(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
    Json(body): Json<SignalRequest>,
) -> Result<Json<FlowResponse>, ServerError> {
    debug!(execution = %execution_id, event = %body.event, "signal requested");
    let state_id = body.state.map(StateId::from);
    let outcome = state
        .manager
        .resume(
            &ExecutionId(execution_id),
            &body.event,
            state_id.as_ref(),
            &RequestContext::from_parameters(body.parameters),
        )
        .await?;
    Ok(Json(outcome.into()))
}
