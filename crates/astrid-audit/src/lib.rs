//! Astrid Audit - Chain-linked cryptographic audit logging.
//!
//! This crate provides:
//! - Cryptographically signed audit entries
//! - Chain-linked entries (each contains hash of previous)
//! - Persistent storage with `SurrealDB`
//! - Chain integrity verification
//!
//! # Security Model
//!
//! Every audit entry is:
//! - Signed by the runtime's ed25519 key
//! - Linked to the previous entry via content hash
//! - Timestamped
//! - Indexed by session
//!
//! The chain linking provides tamper evidence - any modification
//! to historical entries breaks the chain and is detectable.
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use astrid_audit::{AuditAction, AuditLog, AuditOutcome, AuthorizationProof};
//! use astrid_core::SessionId;
//! use astrid_crypto::KeyPair;
//! use astrid_storage::Database;
//!
//! let db = Database::connect_memory().await?;
//! let log = AuditLog::new(db, KeyPair::generate());
//!
//! let session_id = SessionId::new();
//! let entry_id = log
//!     .append(
//!         session_id,
//!         AuditAction::ConfigReloaded,
//!         AuthorizationProof::System { reason: "startup".to_string() },
//!         AuditOutcome::Success,
//!         None,
//!     )
//!     .await?;
//!
//! let result = log.verify_chain(session_id).await?;
//! assert!(result.valid);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod entry;
mod error;
mod log;
mod storage;

pub use entry::{AuditAction, AuditEntry, AuditEntryId, AuditOutcome, AuthorizationProof};
pub use error::{AuditError, AuditResult};
pub use log::{AuditBuilder, AuditLog, ChainIssue, ChainVerificationResult};
pub use storage::{AuditStorage, SurrealAuditStorage};
