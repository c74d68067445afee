//! `containsBlockedCommand` (spec §4.F, used by Tool Guard rule 5 for
//! `WRITE_LOCAL` tier `Bash` calls).

use std::sync::LazyLock;

use regex::Regex;

const BLOCKED_BASENAMES: &[&str] = &[
    "rm", "rmdir", "mv", "chmod", "chown", "sudo", "su", "shutdown", "reboot", "dd", "mkfs",
    "passwd", "visudo",
];

static KILL_VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^kill(all)?$").unwrap_or_else(|_| unreachable_regex()));

static DANGEROUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\$\(|`|\|\s*(sh|bash|zsh|ksh)\b|\bpython[23]?\s+-c\b|\bperl\s+-e\b|\bruby\s+-e\b|\bnode\s+-e\b|\bcrontab\b|\bat\s+now\b|\bnc\s+-e\b|\bncat\s+-e\b|find\s.*-delete\b)",
    )
    .unwrap_or_else(|_| unreachable_regex())
});

fn unreachable_regex() -> Regex {
    #[allow(clippy::unwrap_used)]
    Regex::new("$^").unwrap()
}

/// Split `cmd` on shell meta-characters (`;`, `&&`, `||`, `|`, newline)
/// into candidate sub-commands, returning each sub-command's basename
/// (first whitespace-delimited token, stripped of path components).
fn sub_command_basenames(cmd: &str) -> Vec<String> {
    static SPLIT: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[;\n]|&&|\|\|").unwrap_or_else(|_| unreachable_regex()));
    SPLIT
        .split(cmd)
        .filter_map(|segment| {
            segment
                .split_whitespace()
                .next()
                .map(|tok| tok.rsplit('/').next().unwrap_or(tok).to_string())
        })
        .collect()
}

/// If `cmd` contains a blocked command or pattern, return a short reason;
/// otherwise `None`.
#[must_use]
pub fn contains_blocked_command(cmd: &str) -> Option<String> {
    for basename in sub_command_basenames(cmd) {
        if BLOCKED_BASENAMES.contains(&basename.as_str()) {
            return Some(format!("blocked command: {basename}"));
        }
        if KILL_VARIANT.is_match(&basename) {
            return Some(format!("blocked command: {basename}"));
        }
    }

    if DANGEROUS_PATTERN.is_match(cmd) {
        return Some("command matches a blocked shell pattern".to_string());
    }

    None
}
