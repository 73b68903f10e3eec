//!
//! Weft Server - the web boundary of the Weft flow engine
//!
//! Hosts flow definitions behind an HTTP controller: launching a flow starts
//! a stored execution, signaling an event resumes it, and every response
//! carries the view selection the client should render next.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::Path;

use tracing::{debug, info};

use weft_state_inmemory::InMemoryFlowCatalog;

/// HTTP routes and handlers
pub mod api;

/// Environment-derived configuration
pub mod config;

/// Error types and HTTP status mapping
pub mod error;

pub use api::{router, AppState};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};

/// Loads every `*.yaml` / `*.yml` flow document in `dir` into the catalog,
/// returning the number of flows registered.
///
/// Actions and attribute mappers the documents reference must already be
/// registered; sub-flow references may point at documents loaded later in
/// the same sweep.
pub fn load_flows_from_dir(dir: &Path, catalog: &InMemoryFlowCatalog) -> ServerResult<usize> {
    let mut loaded = 0;
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    entries.sort();

    for path in entries {
        let yaml = std::fs::read_to_string(&path)?;
        let flow = weft_dsl::parse_and_assemble(&yaml, catalog)?;
        debug!(flow = %flow.id(), file = %path.display(), "flow document loaded");
        catalog.register_flow(flow);
        loaded += 1;
    }

    info!(count = loaded, dir = %dir.display(), "flow definitions loaded");
    Ok(loaded)
}
