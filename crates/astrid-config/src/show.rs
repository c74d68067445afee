//! Resolved configuration, returned from [`crate::loader::load`].

use crate::types::Config;

/// A [`Config`] together with the file paths that contributed to it, for
/// diagnostics (an operator asking "where did this value come from").
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The fully merged and validated configuration.
    pub config: Config,
    /// Paths of every config file that was found and merged, in precedence
    /// order (lowest first).
    pub loaded_files: Vec<String>,
}
