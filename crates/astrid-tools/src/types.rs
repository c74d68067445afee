//! Tool-call request/decision vocabulary (spec §4.I).

use astrid_core::{Scope, Tier};
use serde_json::Value;

/// Named tools the agent runtime may invoke, per spec.md's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    /// Run a shell command.
    Bash,
    /// Read a file.
    Read,
    /// Write a file.
    Write,
    /// Edit a file in place.
    Edit,
    /// Glob-match file paths.
    Glob,
    /// Search file contents.
    Grep,
    /// Invoke a named capability ("skill").
    Skill,
    /// Spawn a sub-agent task.
    Task,
    /// Edit a notebook cell.
    NotebookEdit,
    /// Fetch a URL.
    WebFetch,
    /// Run a web search.
    WebSearch,
}

impl ToolName {
    /// Parse a tool name as the agent runtime would send it.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "Bash" => Self::Bash,
            "Read" => Self::Read,
            "Write" => Self::Write,
            "Edit" => Self::Edit,
            "Glob" => Self::Glob,
            "Grep" => Self::Grep,
            "Skill" => Self::Skill,
            "Task" => Self::Task,
            "NotebookEdit" => Self::NotebookEdit,
            "WebFetch" => Self::WebFetch,
            "WebSearch" => Self::WebSearch,
            _ => return None,
        })
    }

    /// `true` for tools whose input designates a path or shell command
    /// (rule 1's sensitive-path check, rule 2's sandbox confinement).
    #[must_use]
    pub fn touches_filesystem(self) -> bool {
        matches!(self, Self::Read | Self::Write | Self::Edit | Self::Glob | Self::Grep | Self::Bash)
    }
}

/// One tool-call request the agent emits, before it runs.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    /// Which tool is being invoked.
    pub tool_name: ToolName,
    /// The tool's raw input arguments.
    pub tool_input: Value,
    /// Resolved local user id, if the chat is linked.
    pub user_id: Option<String>,
    /// Permission tier the call is running at.
    pub tier: Tier,
    /// Trust zone the call originated from.
    pub scope: Scope,
    /// Pool key identifying the conversation's purpose
    /// (e.g. `<service>:social`, `<service>:proactive`).
    pub pool_key: String,
    /// Current working directory for path resolution.
    pub cwd: String,
    /// Whether named-capability ("skill") tools are enabled at all.
    pub enable_skills: bool,
    /// The skill allow-list for this dispatch, if any.
    pub allowed_skills: Option<Vec<String>>,
}

/// [`ToolGuard::evaluate`]'s verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The call may proceed, optionally with a rewritten input.
    Allow {
        /// Input to substitute for the original, if the guard rewrote it.
        updated_input: Option<Value>,
    },
    /// The call is refused.
    Deny {
        /// User-visible reason.
        reason: String,
    },
}

impl Decision {
    /// Shorthand for an unconditional allow.
    #[must_use]
    pub fn allow() -> Self {
        Self::Allow { updated_input: None }
    }

    /// Shorthand for a deny with `reason`.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny { reason: reason.into() }
    }

    /// `true` for [`Decision::Allow`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}
