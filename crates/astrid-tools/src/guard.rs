//! Tool Guard's six-rule pre-tool-use pipeline (spec §4.I).

use std::path::{Component, Path, PathBuf};

use astrid_core::{Scope, Tier};
use serde_json::Value;

use crate::types::{Decision, ToolCallRequest, ToolName};

/// Input-key names the guard checks for a path-like or shell-command
/// argument, in the order tools conventionally use them.
const PATH_LIKE_KEYS: &[&str] = &["command", "path", "file_path", "pattern", "glob", "notebook_path"];

/// Input-key names a `Skill` call might carry its skill name under.
const SKILL_NAME_KEYS: &[&str] = &["skill", "name", "command"];

/// Directory name skill definitions live under; social scopes may never
/// write there (rule 3's anti-poisoning clause).
const SKILL_DEFINITION_DIR: &str = "skills";

/// Configuration the guard needs beyond a single request: the sandbox
/// root for `moltbook` scope, and the output-size cap for rule 6.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Absolute, already-canonicalized root that `moltbook` file tools
    /// are confined to.
    pub moltbook_sandbox_root: PathBuf,
    /// Max tool-output size in characters before truncation (rule 6).
    pub max_output_chars: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            moltbook_sandbox_root: PathBuf::from("/var/lib/astrid/moltbook-sandbox"),
            max_output_chars: 100_000,
        }
    }
}

/// Evaluates tool-call requests against the ordered rule pipeline.
pub struct ToolGuard {
    config: GuardConfig,
}

impl ToolGuard {
    /// Build a guard with `config`.
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    /// Run all six rules against `request`, in spec order. First `Deny`
    /// wins.
    #[must_use]
    pub fn evaluate(&self, request: &ToolCallRequest) -> Decision {
        if let Some(reason) = self.sensitive_path_block(request) {
            return Decision::deny(reason);
        }
        if let Some(reason) = self.sandbox_confinement(request) {
            return Decision::deny(reason);
        }
        if let Some(reason) = self.scope_allow_list(request) {
            return Decision::deny(reason);
        }
        if let Some(reason) = self.skill_allow_list(request) {
            return Decision::deny(reason);
        }
        if let Some(reason) = self.tier_command_check(request) {
            return Decision::deny(reason);
        }
        Decision::allow()
    }

    /// Rule 6: truncate tool output after the call ran.
    #[must_use]
    pub fn guard_output(&self, output: &str) -> String {
        crate::truncate::truncate_with_marker(output, self.config.max_output_chars)
    }

    /// Rule 1: sensitive-path block.
    fn sensitive_path_block(&self, request: &ToolCallRequest) -> Option<String> {
        if !request.tool_name.touches_filesystem() {
            return None;
        }
        let home = std::env::var("HOME").unwrap_or_default();
        for token in path_like_tokens(&request.tool_input) {
            if astrid_policy::is_sensitive_path(&token, &home) {
                return Some(format!("refusing to touch a sensitive path: {token}"));
            }
        }
        None
    }

    /// Rule 2: `moltbook` scope confines file tools to its sandbox root.
    fn sandbox_confinement(&self, request: &ToolCallRequest) -> Option<String> {
        if request.scope != Scope::Moltbook || !request.tool_name.touches_filesystem() {
            return None;
        }
        for token in path_like_tokens(&request.tool_input) {
            let candidate = if Path::new(&token).is_absolute() {
                PathBuf::from(&token)
            } else {
                Path::new(&request.cwd).join(&token)
            };
            if !is_confined_to(&candidate, &self.config.moltbook_sandbox_root) {
                return Some(format!("path escapes the moltbook sandbox: {token}"));
            }
        }
        None
    }

    /// Rule 3: per-scope tool allow-lists.
    fn scope_allow_list(&self, request: &ToolCallRequest) -> Option<String> {
        match request.scope {
            Scope::Moltbook => {
                let allowed = matches!(
                    request.tool_name,
                    ToolName::Read
                        | ToolName::Write
                        | ToolName::Edit
                        | ToolName::Glob
                        | ToolName::Grep
                        | ToolName::Bash
                        | ToolName::WebFetch
                        | ToolName::WebSearch
                );
                if !allowed {
                    return Some(format!("{:?} is not permitted in the moltbook scope", request.tool_name));
                }
            }
            Scope::Social => {
                let untrusted = request.pool_key.contains(":social");
                let trusted = request.pool_key.contains(":proactive")
                    || request.pool_key.contains(":operator-query")
                    || request.pool_key.contains(":autonomous");
                if untrusted && !trusted && request.tool_name == ToolName::Bash {
                    return Some("untrusted social actors may not run Bash".to_string());
                }
            }
            Scope::Telegram | Scope::Agent | Scope::Relay => {}
        }

        if request.scope == Scope::Social
            && matches!(request.tool_name, ToolName::Write | ToolName::Edit)
            && writes_skill_definition_dir(&request.tool_input)
        {
            return Some("social scopes may not write to the skill-definition directory".to_string());
        }

        None
    }

    /// Rule 4: named-capability allow-list.
    fn skill_allow_list(&self, request: &ToolCallRequest) -> Option<String> {
        if request.tool_name != ToolName::Skill {
            return None;
        }
        if !request.enable_skills {
            return Some("skills are disabled for this dispatch".to_string());
        }

        let skill_name = match extract_skill_name(&request.tool_input) {
            Ok(name) => name,
            Err(()) => return Some("skill input keys disagree on the skill name".to_string()),
        };

        match (&request.allowed_skills, skill_name) {
            (Some(allowed), Some(name)) if !allowed.iter().any(|a| a == &name) => {
                Some(format!("skill not in the allow-list: {name}"))
            }
            (None, _) if request.tier == Tier::Social => {
                Some("no skill allow-list configured for the social tier".to_string())
            }
            _ => None,
        }
    }

    /// Rule 5: `WRITE_LOCAL` tier blocked-command check.
    fn tier_command_check(&self, request: &ToolCallRequest) -> Option<String> {
        if request.tier != Tier::WriteLocal || request.tool_name != ToolName::Bash {
            return None;
        }
        let command = request.tool_input.get("command")?.as_str()?;
        astrid_policy::contains_blocked_command(command)
    }
}

/// Pull every path-like token out of `input`'s known keys, splitting
/// `command` on whitespace so embedded paths are checked individually.
fn path_like_tokens(input: &Value) -> Vec<String> {
    let Value::Object(map) = input else {
        return Vec::new();
    };
    let mut tokens = Vec::new();
    for key in PATH_LIKE_KEYS {
        if let Some(Value::String(s)) = map.get(*key) {
            if *key == "command" {
                tokens.extend(s.split_whitespace().map(str::to_string));
            } else {
                tokens.push(s.clone());
            }
        }
    }
    tokens
}

/// Lexically normalize `path` (no filesystem access, since the path may
/// not exist yet for `Write`) and check it stays under `root`.
fn is_confined_to(path: &Path, root: &Path) -> bool {
    let normalized = normalize_lexically(path);
    let root = normalize_lexically(root);
    normalized.starts_with(&root)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn writes_skill_definition_dir(input: &Value) -> bool {
    let Value::Object(map) = input else {
        return false;
    };
    for key in ["path", "file_path"] {
        if let Some(Value::String(s)) = map.get(key) {
            if Path::new(s).components().any(|c| c.as_os_str() == SKILL_DEFINITION_DIR) {
                return true;
            }
        }
    }
    false
}

/// Extract the skill name from a `Skill` call's input, checking known
/// keys in order; if more than one is present and they disagree, the
/// caller must deny rather than pick one.
fn extract_skill_name(input: &Value) -> Result<Option<String>, ()> {
    let Value::Object(map) = input else {
        return Ok(None);
    };
    let mut found: Option<String> = None;
    for key in SKILL_NAME_KEYS {
        if let Some(Value::String(s)) = map.get(*key) {
            match &found {
                Some(existing) if existing != s => return Err(()),
                _ => found = Some(s.clone()),
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(tool_name: ToolName, tool_input: Value) -> ToolCallRequest {
        ToolCallRequest {
            tool_name,
            tool_input,
            user_id: Some("u1".to_string()),
            tier: Tier::WriteLocal,
            scope: Scope::Telegram,
            pool_key: "telegram:operator-query".to_string(),
            cwd: "/home/astrid/work".to_string(),
            enable_skills: true,
            allowed_skills: None,
        }
    }

    fn guard() -> ToolGuard {
        ToolGuard::new(GuardConfig {
            moltbook_sandbox_root: PathBuf::from("/var/lib/astrid/moltbook-sandbox"),
            max_output_chars: 100_000,
        })
    }

    #[test]
    fn denies_read_of_ssh_key() {
        let req = request(ToolName::Read, json!({"file_path": "~/.ssh/id_rsa"}));
        assert!(!guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn allows_plain_read() {
        let req = request(ToolName::Read, json!({"file_path": "src/main.rs"}));
        assert!(guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn moltbook_scope_confines_writes_to_sandbox() {
        let mut req = request(ToolName::Write, json!({"file_path": "../../etc/passwd"}));
        req.scope = Scope::Moltbook;
        req.cwd = "/var/lib/astrid/moltbook-sandbox/work".to_string();
        assert!(!guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn moltbook_scope_allows_path_within_sandbox() {
        let mut req = request(ToolName::Write, json!({"file_path": "notes.txt"}));
        req.scope = Scope::Moltbook;
        req.cwd = "/var/lib/astrid/moltbook-sandbox/work".to_string();
        assert!(guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn moltbook_scope_denies_skill_tool() {
        let mut req = request(ToolName::Skill, json!({"skill": "anything"}));
        req.scope = Scope::Moltbook;
        assert!(!guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn untrusted_social_actor_may_not_run_bash() {
        let mut req = request(ToolName::Bash, json!({"command": "ls"}));
        req.scope = Scope::Social;
        req.pool_key = "telegram:social".to_string();
        assert!(!guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn trusted_social_actor_may_run_bash() {
        let mut req = request(ToolName::Bash, json!({"command": "ls"}));
        req.scope = Scope::Social;
        req.pool_key = "telegram:proactive".to_string();
        assert!(guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn social_scope_denies_skill_directory_write() {
        let mut req = request(ToolName::Write, json!({"file_path": "skills/custom/SKILL.md"}));
        req.scope = Scope::Social;
        req.pool_key = "telegram:proactive".to_string();
        assert!(!guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn skill_name_key_disagreement_is_denied() {
        let req = request(ToolName::Skill, json!({"skill": "deploy", "name": "release"}));
        assert!(!guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn skill_not_in_allow_list_is_denied() {
        let mut req = request(ToolName::Skill, json!({"skill": "deploy"}));
        req.allowed_skills = Some(vec!["verify".to_string()]);
        assert!(!guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn skill_in_allow_list_is_allowed() {
        let mut req = request(ToolName::Skill, json!({"skill": "deploy"}));
        req.allowed_skills = Some(vec!["deploy".to_string()]);
        assert!(guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn social_tier_with_no_allow_list_denies_all_skills() {
        let mut req = request(ToolName::Skill, json!({"skill": "deploy"}));
        req.tier = Tier::Social;
        req.allowed_skills = None;
        assert!(!guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn write_local_bash_blocked_command_is_denied() {
        let req = request(ToolName::Bash, json!({"command": "rm -rf /"}));
        assert!(!guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn write_local_bash_safe_command_is_allowed() {
        let req = request(ToolName::Bash, json!({"command": "ls -la"}));
        assert!(guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn read_only_tier_bash_is_not_command_checked_by_rule_five() {
        let mut req = request(ToolName::Bash, json!({"command": "rm -rf /"}));
        req.tier = Tier::ReadOnly;
        req.scope = Scope::Agent;
        req.pool_key = "agent:autonomous".to_string();
        assert!(guard().evaluate(&req).is_allowed());
    }

    #[test]
    fn skills_disabled_denies_even_an_allowed_skill() {
        let mut req = request(ToolName::Skill, json!({"skill": "deploy"}));
        req.enable_skills = false;
        req.allowed_skills = Some(vec!["deploy".to_string()]);
        assert!(!guard().evaluate(&req).is_allowed());
    }
}
