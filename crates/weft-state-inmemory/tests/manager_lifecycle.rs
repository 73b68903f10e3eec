//! Lifecycle tests for the execution manager backed by the in-memory
//! catalog and execution store.

use std::sync::Arc;

use serde_json::json;

use weft_core::{
    ExecutionId, ExecutionStatus, FlowBuilder, FlowError, FlowExecutionManager,
    FlowExecutionRepository, FlowId, RequestContext, Scope, Transition,
    FLOW_EXECUTION_ID_ATTRIBUTE,
};
use weft_state_inmemory::{InMemoryExecutionRepository, InMemoryFlowCatalog};

fn manager_with_linear_flow() -> (FlowExecutionManager, Arc<InMemoryExecutionRepository>) {
    let catalog = Arc::new(InMemoryFlowCatalog::new());
    catalog.register_flow(
        FlowBuilder::new("order")
            .view_state("details", Some("detailsForm"), vec![Transition::on("submit", "done")])
            .end_state("done", Some("confirmation"))
            .build()
            .unwrap(),
    );
    let executions = Arc::new(InMemoryExecutionRepository::new());
    (
        FlowExecutionManager::new(catalog, executions.clone()),
        executions,
    )
}

#[tokio::test]
async fn launch_stores_the_execution_and_stamps_its_id() {
    let (manager, executions) = manager_with_linear_flow();

    let outcome = manager
        .launch(&FlowId::from("order"), Scope::new(), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, ExecutionStatus::Active);
    assert_eq!(outcome.view.view_name.as_deref(), Some("detailsForm"));
    assert_eq!(
        outcome.view.model.get(FLOW_EXECUTION_ID_ATTRIBUTE),
        Some(&json!(outcome.execution_id.0))
    );
    assert_eq!(executions.count().await.unwrap(), 1);
}

#[tokio::test]
async fn resume_drives_the_conversation_and_removes_ended_executions() {
    let (manager, executions) = manager_with_linear_flow();

    let outcome = manager
        .launch(&FlowId::from("order"), Scope::new(), &RequestContext::new())
        .await
        .unwrap();

    let outcome = manager
        .resume(
            &outcome.execution_id,
            "submit",
            None,
            &RequestContext::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, ExecutionStatus::Ended);
    assert_eq!(outcome.view.view_name.as_deref(), Some("confirmation"));
    // Ended executions do not advertise a continuation id.
    assert!(outcome.view.model.get(FLOW_EXECUTION_ID_ATTRIBUTE).is_none());
    assert_eq!(executions.count().await.unwrap(), 0);
}

#[tokio::test]
async fn resume_with_unknown_execution_id_fails() {
    let (manager, _executions) = manager_with_linear_flow();

    let missing = ExecutionId("no-such-execution".to_string());
    let err = manager
        .resume(&missing, "submit", None, &RequestContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::NoSuchExecution(id) if id == missing));
}

#[tokio::test]
async fn launch_with_unknown_flow_fails_without_storing_anything() {
    let (manager, executions) = manager_with_linear_flow();

    let err = manager
        .launch(&FlowId::from("missing"), Scope::new(), &RequestContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::NoSuchFlow(_)));
    assert_eq!(executions.count().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_resume_keeps_the_execution_alive() {
    let (manager, executions) = manager_with_linear_flow();

    let outcome = manager
        .launch(&FlowId::from("order"), Scope::new(), &RequestContext::new())
        .await
        .unwrap();

    let err = manager
        .resume(&outcome.execution_id, "bogus", None, &RequestContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::NoMatchingTransition { .. }));

    // The conversation can still continue with a valid event.
    assert_eq!(executions.count().await.unwrap(), 1);
    let outcome = manager
        .resume(&outcome.execution_id, "submit", None, &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, ExecutionStatus::Ended);
}
