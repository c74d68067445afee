//! `isSensitivePath` (spec §4.F, used by Tool Guard rule 1 on every
//! path-or-command tool input).

use std::sync::LazyLock;

use regex::Regex;

const SENSITIVE_ROOTS: &[&str] = &[".ssh", ".aws", ".telclaude", ".claude"];

static SENSITIVE_BASENAME: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)^(\.env(\..*)?|id_rsa(\.pub)?|id_ed25519(\.pub)?|credentials\.json|\.npmrc|.*\.pem|.*\.key|\.claude/settings.*)$")
        .unwrap()
});

fn expand_home(token: &str, home: &str) -> String {
    if let Some(rest) = token.strip_prefix("~/") {
        format!("{home}/{rest}")
    } else if token == "~" {
        home.to_string()
    } else if let Some(rest) = token.strip_prefix("$HOME/") {
        format!("{home}/{rest}")
    } else {
        token.to_string()
    }
}

fn path_is_sensitive(path: &str, home: &str) -> bool {
    let expanded = expand_home(path, home);
    let basename = expanded.rsplit('/').next().unwrap_or(&expanded);
    if SENSITIVE_BASENAME.is_match(basename) {
        return true;
    }
    let segments: Vec<&str> = expanded.split('/').collect();
    SENSITIVE_ROOTS.iter().any(|root| segments.contains(root))
}

/// Tokenize `path_or_command` into shell-word-like tokens and test each
/// for a sensitive basename or sensitive root, after `~`/`$HOME`
/// expansion.
#[must_use]
pub fn is_sensitive_path(path_or_command: &str, home: &str) -> bool {
    path_or_command
        .split_whitespace()
        .any(|token| path_is_sensitive(token, home))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "/home/astrid";

    #[test]
    fn plain_path_is_not_sensitive() {
        assert!(!is_sensitive_path("src/main.rs", HOME));
    }

    #[test]
    fn dotenv_is_sensitive() {
        assert!(is_sensitive_path(".env", HOME));
        assert!(is_sensitive_path(".env.production", HOME));
    }

    #[test]
    fn id_rsa_is_sensitive() {
        assert!(is_sensitive_path("cat ~/.ssh/id_rsa", HOME));
    }

    #[test]
    fn ssh_root_is_sensitive_even_for_other_file() {
        assert!(is_sensitive_path("~/.ssh/known_hosts", HOME));
    }

    #[test]
    fn dollar_home_expansion_is_honored() {
        assert!(is_sensitive_path("$HOME/.aws/credentials", HOME));
    }

    #[test]
    fn pem_extension_is_sensitive() {
        assert!(is_sensitive_path("server.pem", HOME));
    }
}
