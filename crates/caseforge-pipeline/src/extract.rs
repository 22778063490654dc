//! Tolerant JSON extraction from model replies.
//!
//! Models wrap JSON in code fences or surrounding prose even when asked
//! for JSON-only output. [`extract_json_block`] locates the outermost
//! well-formed object: strip a code fence if present, otherwise take the
//! first brace-balanced block, honoring strings and escapes.

/// Extract the outermost JSON object from `text`.
///
/// Returns `None` when no brace-balanced block exists; the caller treats
/// that as an empty stage contribution, never an error.
#[must_use]
pub fn extract_json_block(text: &str) -> Option<&str> {
    let inner = strip_code_fence(text).unwrap_or(text);
    balanced_object(inner)
}

/// Content of the first ` ``` `-fenced block, tolerating a language tag
/// (` ```json `) after the opening fence.
fn strip_code_fence(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the language tag line, if any.
    let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Slice of the first `{ … }` block with balanced braces, tracking string
/// literals and backslash escapes.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
