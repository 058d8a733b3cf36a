pub mod audit;
pub mod config;
pub mod error;
pub mod io;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod summary;
pub mod table;

pub use config::AuditConfig;
pub use error::{AuditError, Result, Side};
pub use pipeline::{audit_tables, run_audit, AuditOutcome};
