//! Markdown to Telegram HTML conversion and text chunking.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum message length for Telegram (with some margin below 4096).
const MAX_MESSAGE_LEN: usize = 4000;

/// Escape text for safe inclusion in Telegram HTML.
///
/// Escapes `&`, `<`, `>`, `"`, and `'` so the output is safe in both text
/// content and HTML attributes (e.g. `href="..."`).
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Convert LLM markdown to Telegram HTML.
///
/// Handles: bold, italic, inline code, code blocks, links.
/// Telegram supports a limited subset of HTML: `<b>`, `<i>`, `<code>`,
/// `<pre>`, `<a href="...">`.
pub fn md_to_telegram_html(md: &str) -> String {
    static CODE_BLOCK: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"```(\w*)\n?([\s\S]*?)```").expect("invalid regex"));
    static INLINE_CODE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("invalid regex"));
    static BOLD: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("invalid regex"));
    // Simple italic: single * not preceded/followed by *. We capture the
    // surrounding characters so we can preserve them in the replacement.
    static ITALIC: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"([^*]|^)\*([^*]+)\*([^*]|$)").expect("invalid regex"));
    static LINK: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("invalid regex"));
    static HEADING: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+(.+)$").expect("invalid regex"));

    // First pass: extract code blocks to protect them from other transforms.
    let mut protected: Vec<String> = Vec::new();
    let text = CODE_BLOCK.replace_all(md, |caps: &regex::Captures<'_>| {
        let lang = &caps[1];
        let code = html_escape(&caps[2]);
        let placeholder = format!("\x00CODE{}\x00", protected.len());
        // Telegram HTML only supports <pre> and <pre><code>...</code></pre>,
        // not arbitrary attributes like class="language-...".
        let _ = lang; // language info not usable in Telegram HTML
        protected.push(format!("<pre>{code}</pre>"));
        placeholder
    });

    // Second pass: extract inline code so it's protected from bold/italic.
    let text = INLINE_CODE.replace_all(&text, |caps: &regex::Captures<'_>| {
        let code = html_escape(&caps[1]);
        let placeholder = format!("\x00CODE{}\x00", protected.len());
        protected.push(format!("<code>{code}</code>"));
        placeholder
    });

    // Escape HTML in non-code sections. Placeholders (\x00CODE{i}\x00) are
    // inert — they don't contain any characters that html_escape touches.
    let text = html_escape(&text);

    // Apply inline transforms while placeholders are still in the text,
    // so bold/italic/link/heading don't match inside code regions.
    let text = BOLD.replace_all(&text, "<b>$1</b>");
    let text = ITALIC.replace_all(&text, "$1<i>$2</i>$3");
    let text = LINK.replace_all(&text, |caps: &regex::Captures<'_>| {
        let label = &caps[1];
        let url = &caps[2];
        // Only allow safe URL schemes to prevent javascript:/data: injection.
        // Note: scheme check uses already-escaped text (& → &amp;), but the
        // prefixes we check don't contain escapable chars so this is safe.
        if url.starts_with("http://")
            || url.starts_with("https://")
            || url.starts_with("tg://")
            || url.starts_with("mailto:")
        {
            // `url` is already HTML-escaped by the earlier `html_escape(&text)`
            // call. Use it directly to avoid double-escaping `&` → `&amp;amp;`.
            format!("<a href=\"{url}\">{label}</a>")
        } else {
            // Render as plain text for unsafe schemes.
            format!("{label} ({url})")
        }
    });
    let text = HEADING.replace_all(&text, "<b>$1</b>");

    // Restore all protected regions (code blocks + inline code) now that
    // inline transforms are done.
    let mut text = text.into_owned();
    for (i, block) in protected.iter().enumerate() {
        let placeholder = format!("\x00CODE{i}\x00");
        text = text.replace(&placeholder, block);
    }

    text
}

/// Split text into chunks that fit within Telegram's message size limit.
///
/// Tries to split at paragraph boundaries first, then newlines, then
/// hard-cuts at `max_len`.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    let max_len = if max_len == 0 {
        MAX_MESSAGE_LEN
    } else {
        max_len
    };

    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Try splitting at a double newline (paragraph boundary).
        let hard_cut = remaining.floor_char_boundary(max_len);
        let split_at = find_split_point(remaining, hard_cut, "\n\n")
            .or_else(|| find_split_point(remaining, hard_cut, "\n"))
            .unwrap_or(hard_cut);

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk.to_string());
        remaining = rest.trim_start_matches('\n');
    }

    chunks
}

/// Find a split point by searching backwards from `boundary` for `delimiter`.
///
/// `boundary` must be a valid char boundary in `text`.
fn find_split_point(text: &str, boundary: usize, delimiter: &str) -> Option<usize> {
    let search_region = &text[..boundary];
    search_region
        .rfind(delimiter)
        // Safety: pos from rfind() is within bounds, delimiter.len() keeps us within text
        .map(|pos| pos.saturating_add(delimiter.len()))
}

/// Find a safe truncation boundary in an HTML string at or before `max_len`.
///
/// Walks backwards from the char boundary until we're not inside a tag or
/// entity.
pub(crate) fn find_safe_html_boundary(html: &str, max_len: usize) -> usize {
    let mut boundary = html.floor_char_boundary(max_len.min(html.len()));

    while boundary > 0 {
        let bytes = &html.as_bytes()[..boundary];
        // Check if we're inside a tag: find the last '<' or '>'.
        let last_open = bytes.iter().rposition(|&b| b == b'<');
        let last_close = bytes.iter().rposition(|&b| b == b'>');
        let inside_tag = match (last_open, last_close) {
            (Some(lt), Some(gt)) => lt > gt,
            (Some(_), None) => true,
            _ => false,
        };
        // Check if we're inside an entity: find the last '&' or ';'.
        let last_amp = bytes.iter().rposition(|&b| b == b'&');
        let last_semi = bytes.iter().rposition(|&b| b == b';');
        let inside_entity = match (last_amp, last_semi) {
            (Some(amp), Some(semi)) => amp > semi,
            (Some(_), None) => true,
            _ => false,
        };

        if !inside_tag && !inside_entity {
            break;
        }
        // Walk back one char.
        boundary = html.floor_char_boundary(boundary.saturating_sub(1));
    }

    boundary
}

/// Close any unclosed HTML tags in a truncated HTML fragment.
///
/// Scans for open/close tags and appends closing tags for any that are still
/// open at the end. This prevents Telegram HTML parse errors when we truncate
/// in the middle of formatted text.
pub(crate) fn close_open_tags(html: &str) -> String {
    use std::fmt::Write as _;

    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<(/?)(\w+)[^>]*>").expect("invalid regex"));

    let mut open_tags: Vec<String> = Vec::new();
    for cap in TAG_RE.captures_iter(html) {
        let is_close = &cap[1] == "/";
        let tag_name = cap[2].to_lowercase();
        if is_close {
            // Remove the most recent matching open tag.
            if let Some(pos) = open_tags.iter().rposition(|t| *t == tag_name) {
                open_tags.remove(pos);
            }
        } else {
            open_tags.push(tag_name);
        }
    }

    if open_tags.is_empty() {
        return html.to_string();
    }

    let mut result = html.to_string();
    for tag in open_tags.into_iter().rev() {
        let _ = write!(result, "</{tag}>");
    }
    result
}

/// Split HTML into chunks that fit within Telegram's message size limit.
///
/// Like [`chunk_text`] but HTML-aware: avoids splitting inside a tag (`<...>`)
/// or entity (`&...;`).
pub fn chunk_html(html: &str, max_len: usize) -> Vec<String> {
    // Reserve headroom for closing tags appended by close_open_tags.
    // Worst case: several nested tags like </pre></code></b></i></a> ≈ 35 bytes.
    const CLOSING_TAG_HEADROOM: usize = 50;

    let max_len = if max_len == 0 {
        MAX_MESSAGE_LEN
    } else {
        max_len
    };
    let split_limit = max_len.saturating_sub(CLOSING_TAG_HEADROOM);

    if html.len() <= max_len {
        return vec![html.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = html;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Find an HTML-safe hard-cut boundary within the reduced limit
        // so that closing tags don't push us over max_len.
        let hard_cut = find_safe_html_boundary(remaining, split_limit);
        // Prefer splitting at paragraph or newline boundaries within that
        // safe region.
        let split_at = find_split_point(remaining, hard_cut, "\n\n")
            .or_else(|| find_split_point(remaining, hard_cut, "\n"))
            .unwrap_or(hard_cut);

        // Guard against zero-progress (e.g. max_len <= CLOSING_TAG_HEADROOM).
        let split_at = if split_at == 0 {
            remaining.floor_char_boundary(max_len.max(1))
        } else {
            split_at
        };

        let (chunk, rest) = remaining.split_at(split_at);
        // Close any tags left open by the split so each chunk is valid
        // standalone HTML (Telegram rejects malformed HTML per message).
        chunks.push(close_open_tags(chunk));
        remaining = rest.trim_start_matches('\n');
    }

    chunks
}
