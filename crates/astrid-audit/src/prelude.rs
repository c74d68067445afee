//! Prelude module - commonly used types for convenient import.
//!
//! Use `use astrid_audit::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuditError, AuditResult};

// Entry types
pub use crate::{AuditAction, AuditEntry, AuditEntryId, AuditOutcome, AuthorizationProof};

// Log and verification
pub use crate::{AuditBuilder, AuditLog, ChainIssue, ChainVerificationResult};

// Storage
pub use crate::{AuditStorage, SurrealAuditStorage};
