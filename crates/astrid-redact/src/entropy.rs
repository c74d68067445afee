//! High-entropy substring detection (spec §4.E).

/// Shannon entropy, in bits per character, of `s`.
#[must_use]
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts = [0u32; 256];
    let mut total = 0u32;
    for b in s.bytes() {
        counts[b as usize] += 1;
        total += 1;
    }
    let total = f64::from(total);
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = f64::from(c) / total;
            -p * p.log2()
        })
        .sum()
}

/// Find maximal runs of "token-shaped" characters (alphanumeric plus
/// `+/=_-`, the alphabet of base64 and hex secrets) at least
/// `min_len` long whose Shannon entropy exceeds `threshold`.
#[must_use]
pub fn high_entropy_spans(s: &str, min_len: usize, threshold: f64) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let bytes = s.as_bytes();
    let mut start = None;

    let is_token_char = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=' | b'_' | b'-');

    for (i, &b) in bytes.iter().enumerate() {
        if is_token_char(b) {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s0) = start.take() {
            push_if_suspicious(s, s0, i, min_len, threshold, &mut spans);
        }
    }
    if let Some(s0) = start {
        push_if_suspicious(s, s0, bytes.len(), min_len, threshold, &mut spans);
    }
    spans
}

fn push_if_suspicious(
    s: &str,
    start: usize,
    end: usize,
    min_len: usize,
    threshold: f64,
    spans: &mut Vec<(usize, usize)>,
) {
    if end - start < min_len {
        return;
    }
    if shannon_entropy(&s[start..end]) >= threshold {
        spans.push((start, end));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_character_has_zero_entropy() {
        assert_eq!(shannon_entropy("aaaaaaaa"), 0.0);
    }

    #[test]
    fn random_looking_token_has_high_entropy() {
        let e = shannon_entropy("x7Jk9mQp2Zr8Ws4Nt6Vb1Yc3Xe5Ha0Fg");
        assert!(e > 3.5, "entropy was {e}");
    }

    #[test]
    fn low_entropy_word_is_not_flagged() {
        let spans = high_entropy_spans("the quick brown fox jumps", 8, 4.0);
        assert!(spans.is_empty());
    }

    #[test]
    fn high_entropy_token_is_flagged() {
        let text = format!("token={}", "qW3rTyUi0pAsDfGhJkL9zXcVbNm2QW".repeat(2));
        let spans = high_entropy_spans(&text, 20, 4.0);
        assert!(!spans.is_empty());
    }
}
