//! In-place editing of parameter text.
//!
//! Every operation addresses the first matching directive only. A key that
//! appears several times keeps its later occurrences untouched.

use crate::directive::{find, DirectiveState};

/// Sets `key` to `value`.
///
/// The first active directive for `key` is replaced by `(key value)`. When no
/// active directive exists, the first commented one (`// (key ...)`) is
/// replaced instead, which re-enables it. Otherwise the directive is appended
/// on its own line.
///
/// `value` is written verbatim, so string values must carry their quotes:
///
/// ```
/// let mut text = String::from("(Metric \"AdvancedMeanSquares\")\n");
/// elxbridge_params::replace(&mut text, "Metric", "\"AdvancedMattesMutualInformation\"");
/// assert_eq!(text, "(Metric \"AdvancedMattesMutualInformation\")\n");
/// ```
pub fn replace(text: &mut String, key: &str, value: &str) {
    let directive = format!("({} {})", key, value);
    let span = find(text, key, DirectiveState::Active)
        .or_else(|| find(text, key, DirectiveState::Commented))
        .map(|d| d.span);

    match span {
        Some(span) => text.replace_range(span, &directive),
        None => {
            text.push('\n');
            text.push_str(&directive);
            text.push('\n');
        }
    }
}

/// Removes the first active directive for `key`. No-op if absent.
pub fn remove(text: &mut String, key: &str) {
    if let Some(d) = find(text, key, DirectiveState::Active) {
        text.replace_range(d.span, "");
    }
}

/// Returns the raw `(key ...)` span of the first active directive for `key`.
pub fn get_line<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    find(text, key, DirectiveState::Active).map(|d| &text[d.span])
}

/// Returns the value tokens of the first active directive for `key`, with
/// quotes stripped.
pub fn get_value(text: &str, key: &str) -> Option<Vec<String>> {
    find(text, key, DirectiveState::Active).map(|d| d.values(text))
}

/// Quotes a string value the way parameter files expect it.
pub fn quoted(value: &str) -> String {
    format!("\"{}\"", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "// Rigid\n(Transform \"EulerTransform\")\n(NumberOfResolutions 4)\n// (MaximumNumberOfIterations 250)\n";

    #[test]
    fn test_replace_absent_then_get_line() {
        let mut text = SAMPLE.to_string();
        replace(&mut text, "ResultImagePixelType", "\"float\"");
        assert_eq!(
            get_line(&text, "ResultImagePixelType"),
            Some("(ResultImagePixelType \"float\")")
        );
        assert!(text.ends_with("\n(ResultImagePixelType \"float\")\n"));
    }

    #[test]
    fn test_replace_present_does_not_duplicate() {
        let mut text = SAMPLE.to_string();
        let before = text.len();
        replace(&mut text, "NumberOfResolutions", "12");
        assert_eq!(text.len(), before + 1);
        assert_eq!(text.matches("(NumberOfResolutions").count(), 1);
        assert_eq!(get_value(&text, "NumberOfResolutions"), Some(vec!["12".to_string()]));
    }

    #[test]
    fn test_replace_uncomments_directive() {
        let mut text = SAMPLE.to_string();
        replace(&mut text, "MaximumNumberOfIterations", "500");
        assert!(!text.contains("// (MaximumNumberOfIterations"));
        assert_eq!(
            get_line(&text, "MaximumNumberOfIterations"),
            Some("(MaximumNumberOfIterations 500)")
        );
    }

    #[test]
    fn test_replace_prefers_active_over_commented() {
        let mut text = "// (Metric \"A\")\n(Metric \"B\")\n".to_string();
        replace(&mut text, "Metric", "\"C\"");
        assert_eq!(text, "// (Metric \"A\")\n(Metric \"C\")\n");
    }

    #[test]
    fn test_replace_first_match_only() {
        let mut text = "(Metric \"A\")\n(Metric \"B\")\n".to_string();
        replace(&mut text, "Metric", "\"C\"");
        assert_eq!(text, "(Metric \"C\")\n(Metric \"B\")\n");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut text = SAMPLE.to_string();
        remove(&mut text, "Interpolator");
        assert_eq!(text, SAMPLE);
    }

    #[test]
    fn test_remove_ignores_commented() {
        let mut text = SAMPLE.to_string();
        remove(&mut text, "MaximumNumberOfIterations");
        assert_eq!(text, SAMPLE);
    }

    #[test]
    fn test_remove_present() {
        let mut text = SAMPLE.to_string();
        remove(&mut text, "Transform");
        assert!(get_line(&text, "Transform").is_none());
        assert!(text.contains("(NumberOfResolutions 4)"));
    }

    #[test]
    fn test_get_line_absent() {
        assert_eq!(get_line(SAMPLE, "Metric"), None);
        assert_eq!(get_value(SAMPLE, "Metric"), None);
    }
}
