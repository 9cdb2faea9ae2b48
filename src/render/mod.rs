//! Blocked-content rendering.
//!
//! When a request is blocked, form markup must not reach the client at all;
//! replacing it client-side would still ship the form. These helpers detect
//! form shortcodes and rendered form markup in page content and substitute
//! the configured block message server-side.

use regex::{NoExpand, Regex};

const SHORTCODE_PATTERN: &str = r#"\[formidable\s+[^\]]*\]"#;
const FORM_MARKUP_PATTERN: &str = r#"(?s)<form\b[^>]*\bclass="[^"]*frm-show-form[^"]*"[^>]*>.*?</form>"#;
const FORM_ID_PATTERN: &str = r#"\[formidable\s+[^\]]*\bid=["']?(\d+)["']?"#;

/// True when the content contains a form shortcode or rendered form markup.
pub fn contains_form(content: &str) -> bool {
    match_any(SHORTCODE_PATTERN, content) || match_any(FORM_MARKUP_PATTERN, content)
}

/// Extracts the first numeric form id from a shortcode, e.g. `5` from
/// `[formidable id=5]`. Returns `None` for key-based shortcodes or plain
/// content.
pub fn extract_form_id(content: &str) -> Option<String> {
    let re = compile(FORM_ID_PATTERN)?;
    re.captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Replaces every form shortcode and rendered form in `content` with the
/// block message wrapped in a dismissable notice div. Content without forms
/// is returned unchanged.
pub fn replace_forms_with_message(content: &str, message: &str) -> String {
    let replacement = format!(r#"<div class="geo-gate-blocked">{}</div>"#, message);
    let mut result = content.to_string();
    for pattern in [SHORTCODE_PATTERN, FORM_MARKUP_PATTERN] {
        if let Some(re) = compile(pattern) {
            // NoExpand keeps `$` in operator-supplied messages literal.
            result = re
                .replace_all(&result, NoExpand(replacement.as_str()))
                .into_owned();
        }
    }
    result
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Failed to compile content pattern: {e}");
            None
        }
    }
}

fn match_any(pattern: &str, content: &str) -> bool {
    compile(pattern).map(|re| re.is_match(content)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_shortcode_and_markup() {
        assert!(contains_form("<p>Contact us</p>[formidable id=5]"));
        assert!(contains_form(
            r#"<form method="post" class="frm-show-form frm_pro_form" id="form_contact"><input></form>"#
        ));
        assert!(!contains_form("<p>Just a page</p>"));
    }

    #[test]
    fn test_extract_form_id_variants() {
        assert_eq!(extract_form_id("[formidable id=5]").as_deref(), Some("5"));
        assert_eq!(
            extract_form_id(r#"[formidable id="12" title=true]"#).as_deref(),
            Some("12")
        );
        assert_eq!(extract_form_id(r#"[formidable key="contact"]"#), None);
        assert_eq!(extract_form_id("no forms here"), None);
    }

    #[test]
    fn test_replace_shortcode_with_message() {
        let content = "<h1>Contact</h1>[formidable id=5]<footer/>";
        let result = replace_forms_with_message(content, "Not available in your region.");
        assert!(!result.contains("[formidable"));
        assert!(result.contains("Not available in your region."));
        assert!(result.contains("<h1>Contact</h1>"));
        assert!(result.contains("<footer/>"));
    }

    #[test]
    fn test_replace_rendered_form_markup() {
        let content = concat!(
            "<div>",
            r#"<form method="post" class="frm-show-form" id="form_contact">"#,
            "<input name=\"email\">\n</form>",
            "</div>"
        );
        let result = replace_forms_with_message(content, "Blocked.");
        assert!(!result.contains("<form"));
        assert!(!result.contains("email"));
        assert!(result.contains(r#"<div class="geo-gate-blocked">Blocked.</div>"#));
    }

    #[test]
    fn test_replaces_multiple_forms() {
        let content = "[formidable id=1] middle [formidable id=2]";
        let result = replace_forms_with_message(content, "Blocked.");
        assert_eq!(result.matches("Blocked.").count(), 2);
        assert!(result.contains(" middle "));
    }

    #[test]
    fn test_content_without_forms_unchanged() {
        let content = "<p>Plain page</p>";
        assert_eq!(replace_forms_with_message(content, "Blocked."), content);
    }
}
