//! Application services built on top of the domain layer.

/// Cross-request execution management
pub mod manager;
