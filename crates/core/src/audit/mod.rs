//! Calculation audit trail.
//!
//! Changes are captured as an explicit before/after diff computed by the
//! caller and handed to an injected [`AuditWriter`].

pub mod diff;
pub mod error;
pub mod types;
pub mod writer;

pub use diff::{diff_json, diff_records};
pub use error::AuditError;
pub use types::{AuditAction, AuditEntry, FieldChange};
pub use writer::{AuditSink, AuditWriter, BufferedAuditWriter};
