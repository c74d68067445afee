//! Structural heuristics (spec §4.F.2): never a hard block, only `WARN`
//! with reasons.

const ZERO_WIDTH_CHARS: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{2060}'];
const MAX_MESSAGE_LEN: usize = 8_000;
const REPETITION_THRESHOLD: usize = 8;

/// A structural warning reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralFlag {
    /// Contains zero-width or other invisible formatting characters.
    ZeroWidthCharacters,
    /// The same word repeats unusually often.
    ExcessiveRepetition,
    /// Mixes scripts in a way consistent with homoglyph spoofing.
    MixedScript,
    /// Exceeds the configured maximum message length.
    UnusuallyLong,
}

/// Run every structural check against `text`, returning every flag raised
/// (possibly none).
#[must_use]
pub fn check(text: &str) -> Vec<StructuralFlag> {
    let mut flags = Vec::new();

    if text.chars().any(|c| ZERO_WIDTH_CHARS.contains(&c)) {
        flags.push(StructuralFlag::ZeroWidthCharacters);
    }

    if has_excessive_repetition(text) {
        flags.push(StructuralFlag::ExcessiveRepetition);
    }

    if has_mixed_script(text) {
        flags.push(StructuralFlag::MixedScript);
    }

    if text.chars().count() > MAX_MESSAGE_LEN {
        flags.push(StructuralFlag::UnusuallyLong);
    }

    flags
}

fn has_excessive_repetition(text: &str) -> bool {
    let mut last_word: Option<&str> = None;
    let mut run = 0usize;
    for word in text.split_whitespace() {
        if Some(word) == last_word {
            run += 1;
            if run >= REPETITION_THRESHOLD {
                return true;
            }
        } else {
            last_word = Some(word);
            run = 1;
        }
    }
    false
}

/// Coarse script classification used for homoglyph/mixed-script detection.
/// Scripts that legitimately coexist (e.g. Latin digits in any language)
/// are not flagged; this only flags Latin mixed with a confusable
/// lookalike script within the same word.
fn has_mixed_script(text: &str) -> bool {
    for word in text.split_whitespace() {
        let mut has_latin = false;
        let mut has_cyrillic = false;
        let mut has_greek = false;
        for c in word.chars() {
            match c {
                'a'..='z' | 'A'..='Z' => has_latin = true,
                '\u{0400}'..='\u{04FF}' => has_cyrillic = true,
                '\u{0370}'..='\u{03FF}' => has_greek = true,
                _ => {}
            }
        }
        if (has_latin && has_cyrillic) || (has_latin && has_greek) || (has_cyrillic && has_greek) {
            return true;
        }
    }
    false
}
