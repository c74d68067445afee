//! Prelude module - commonly used types for convenient import.
//!
//! Use `use astrid_core::prelude::*;` to import all essential types.

pub use crate::{KernelError, KernelResult};
pub use crate::{
    Classification, MemoryCategory, MemorySource, RequestId, Scope, SessionId, Tier, Timestamp,
    TrustLevel,
};
