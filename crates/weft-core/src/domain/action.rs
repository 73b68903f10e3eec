use crate::domain::request::RequestContext;
use crate::domain::scope::Scope;

/// Result event reported by actions that completed normally.
pub const SUCCESS_EVENT: &str = "success";

/// Result event reported by actions that hit a handled business failure.
pub const ERROR_EVENT: &str = "error";

/// Everything an action may touch while it runs: the inbound request and the
/// mutable flow scope of the active session.
pub struct ActionContext<'a> {
    /// The inbound request
    pub request: &'a RequestContext,

    /// The active session's flow scope
    pub scope: &'a mut Scope,
}

/// A delegate invoked by an action state.
///
/// Actions hold the business logic of a conversation step. They report what
/// happened as a result event id (conventionally [`SUCCESS_EVENT`] or
/// [`ERROR_EVENT`]) which the owning state matches against its transition
/// table. An `Err` return is a delegate failure: the engine does not
/// interpret it, it propagates the error unchanged to the caller.
pub trait Action: Send + Sync {
    /// Executes the action against the given context, returning the result
    /// event id.
    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<String, anyhow::Error>;

    /// A short name for logs and error reports.
    fn name(&self) -> &str {
        "action"
    }
}

impl<F> Action for F
where
    F: Fn(&mut ActionContext<'_>) -> Result<String, anyhow::Error> + Send + Sync,
{
    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<String, anyhow::Error> {
        self(ctx)
    }
}
