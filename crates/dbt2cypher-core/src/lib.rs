//! dbt2cypher Core
//!
//! Shared stable types: diagnostics, column-reference identifiers,
//! and configuration. Diagnostic codes are versioned - never rename them.

pub mod config;
pub mod diagnostic;
pub mod ident;

pub use config::{Config, ConfigError};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use ident::{ColumnRef, IdentError};
