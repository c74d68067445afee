//! LLM observer (spec §4.F.4): a final classifier behind the circuit
//! breaker, consulted only when the fast-path battery returns `None`.

use std::sync::Arc;
use std::time::Duration;

use astrid_circuit::CircuitBreaker;
use astrid_core::Classification;
use astrid_llm::provider::LlmProvider;
use serde::Deserialize;
use tracing::warn;

/// What to do when the circuit is open or the observer times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Treat the message as safe.
    Allow,
    /// Refuse the message.
    Block,
    /// Treat as suspicious, escalating to an approval flow.
    Escalate,
}

impl Fallback {
    fn classification(self) -> Classification {
        match self {
            Self::Allow => Classification::Allow,
            Self::Block => Classification::Block,
            Self::Escalate => Classification::Warn,
        }
    }
}

/// Tunables for the observer call.
#[derive(Debug, Clone, Copy)]
pub struct ObserverConfig {
    /// Maximum time to wait for the classifier.
    pub timeout: Duration,
    /// Confidence below which a `Block` verdict downgrades to `Warn`.
    pub danger_threshold: f64,
    /// What to return when the circuit is open or the call times out.
    pub fallback: Fallback,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(4),
            danger_threshold: 0.6,
            fallback: Fallback::Escalate,
        }
    }
}

/// The classifier's raw JSON response shape.
#[derive(Debug, Clone, Deserialize)]
struct RawVerdict {
    classification: String,
    confidence: f64,
    reason: Option<String>,
    #[serde(rename = "flaggedPatterns")]
    flagged_patterns: Option<Vec<String>>,
    #[serde(rename = "suggestedTier")]
    suggested_tier: Option<String>,
}

fn parse_classification(s: &str) -> Option<Classification> {
    match s.to_ascii_lowercase().as_str() {
        "allow" => Some(Classification::Allow),
        "warn" => Some(Classification::Warn),
        "block" => Some(Classification::Block),
        _ => None,
    }
}

/// The observer's final, threshold-adjusted verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Final classification after danger-threshold downgrades.
    pub classification: Classification,
    /// The classifier's reported confidence, `[0, 1]`.
    pub confidence: f64,
    /// Free-text reason, if the classifier gave one.
    pub reason: Option<String>,
    /// Pattern names the classifier says it flagged.
    pub flagged_patterns: Vec<String>,
    /// A tier the classifier suggests for this request, if any.
    pub suggested_tier: Option<String>,
}

const OBSERVER_SYSTEM_PROMPT: &str = concat!(
    "You are a security classifier. Given a user message, respond with ONLY a JSON object: ",
    r#"{"classification":"ALLOW"|"WARN"|"BLOCK","confidence":0.0-1.0,"reason":"...","flaggedPatterns":[...],"suggestedTier":"..."}. "#,
    "No other text."
);

/// Call the LLM observer behind `breaker`, returning the threshold-adjusted
/// verdict, or the configured fallback if the circuit is open, the call
/// errors, times out, or the response cannot be parsed.
pub async fn classify(
    provider: &Arc<dyn LlmProvider>,
    breaker: &CircuitBreaker,
    config: &ObserverConfig,
    text: &str,
) -> Verdict {
    match breaker.can_execute().await {
        Ok(true) => {}
        Ok(false) => return fallback_verdict(config.fallback, "circuit open"),
        Err(err) => {
            warn!(%err, "circuit breaker store error; using fallback");
            return fallback_verdict(config.fallback, "circuit store error");
        }
    }

    let prompt = format!("{OBSERVER_SYSTEM_PROMPT}\n\nMessage:\n{text}");
    let call = tokio::time::timeout(config.timeout, provider.complete_simple(&prompt)).await;

    let raw_text = match call {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => {
            warn!(%err, "llm observer call failed");
            let _ = breaker.record_failure().await;
            return fallback_verdict(config.fallback, "observer call failed");
        }
        Err(_) => {
            warn!("llm observer call timed out");
            let _ = breaker.record_failure().await;
            return fallback_verdict(config.fallback, "observer call timed out");
        }
    };

    let Some(raw) = parse_response(&raw_text) else {
        warn!("llm observer returned an unparseable response");
        let _ = breaker.record_failure().await;
        return fallback_verdict(config.fallback, "unparseable observer response");
    };

    let _ = breaker.record_success().await;
    apply_danger_threshold(raw, config.danger_threshold)
}

fn parse_response(text: &str) -> Option<RawVerdict> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    let raw: RawVerdict = serde_json::from_str(&text[start..=end]).ok()?;
    parse_classification(&raw.classification)?;
    Some(raw)
}

fn apply_danger_threshold(raw: RawVerdict, danger_threshold: f64) -> Verdict {
    #[allow(clippy::unwrap_used)]
    let base = parse_classification(&raw.classification).unwrap_or(Classification::Warn);
    let classification = match base {
        Classification::Block if raw.confidence < danger_threshold => Classification::Warn,
        Classification::Warn if raw.confidence < danger_threshold / 2.0 => Classification::Allow,
        other => other,
    };
    Verdict {
        classification,
        confidence: raw.confidence,
        reason: raw.reason,
        flagged_patterns: raw.flagged_patterns.unwrap_or_default(),
        suggested_tier: raw.suggested_tier,
    }
}

fn fallback_verdict(fallback: Fallback, reason: &str) -> Verdict {
    Verdict {
        classification: fallback.classification(),
        confidence: 0.0,
        reason: Some(reason.to_string()),
        flagged_patterns: Vec::new(),
        suggested_tier: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_below_threshold_downgrades_to_warn() {
        let raw = RawVerdict {
            classification: "BLOCK".to_string(),
            confidence: 0.3,
            reason: None,
            flagged_patterns: None,
            suggested_tier: None,
        };
        assert_eq!(apply_danger_threshold(raw, 0.6).classification, Classification::Warn);
    }

    #[test]
    fn warn_below_half_threshold_downgrades_to_allow() {
        let raw = RawVerdict {
            classification: "WARN".to_string(),
            confidence: 0.1,
            reason: None,
            flagged_patterns: None,
            suggested_tier: None,
        };
        assert_eq!(apply_danger_threshold(raw, 0.6).classification, Classification::Allow);
    }

    #[test]
    fn confident_block_stays_block() {
        let raw = RawVerdict {
            classification: "BLOCK".to_string(),
            confidence: 0.95,
            reason: None,
            flagged_patterns: None,
            suggested_tier: None,
        };
        assert_eq!(apply_danger_threshold(raw, 0.6).classification, Classification::Block);
    }

    #[test]
    fn parses_response_with_surrounding_prose() {
        let text = "Sure, here you go: {\"classification\":\"ALLOW\",\"confidence\":0.9} thanks!";
        let raw = parse_response(text).unwrap();
        assert_eq!(raw.classification, "ALLOW");
    }

    #[test]
    fn fallback_escalate_maps_to_warn() {
        assert_eq!(fallback_verdict(Fallback::Escalate, "x").classification, Classification::Warn);
    }
}
