/// Removes markdown code-fence markers a model sometimes wraps around HTML or JSON.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```html", "")
        .replace("```json", "")
        .replace("``json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Unwraps a JSON object reply that may be enclosed in a ```json fence.
pub fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.trim().strip_suffix("```").unwrap_or(without_open).trim()
}

/// Collapses newlines and tabs so text can be embedded in a single-line prompt message.
pub fn flatten_for_prompt(text: &str) -> String {
    text.chars().map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch }).collect()
}

#[cfg(test)]
mod tests {
    use super::{flatten_for_prompt, strip_code_fences, strip_json_fence};

    #[test]
    fn strips_html_and_bare_fences() {
        let raw = "```html\n<table><tr><td>Budi</td></tr></table>\n```";
        let cleaned = strip_code_fences(raw);
        assert_eq!(cleaned, "<table><tr><td>Budi</td></tr></table>");
        assert!(!cleaned.contains("```"));
    }

    #[test]
    fn strips_json_fence_variants() {
        assert!(!strip_code_fences("```json {\"a\":1} ```").contains('`'));
        assert_eq!(strip_code_fences("``json {\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn json_fence_unwrapping_keeps_object() {
        assert_eq!(strip_json_fence("```json\n{\"endpoint\":\"null\"}\n```"), "{\"endpoint\":\"null\"}");
        assert_eq!(strip_json_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_json_fence("  {\"params\":{}} "), "{\"params\":{}}");
    }

    #[test]
    fn flattening_replaces_line_breaks_and_tabs() {
        assert_eq!(flatten_for_prompt("a\nb\tc\r\nd"), "a b c  d");
    }
}
