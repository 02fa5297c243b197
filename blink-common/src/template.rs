//! Href templates.
//!
//! A linked action's `href` may contain `{name}` placeholders that are filled in from collected
//! parameter values before the action is submitted. Substitution is permissive: values without a
//! placeholder are ignored and placeholders without a value are left untouched.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::parameter::ParameterValues;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex is valid"));

/// Replaces every `{key}` in `template` with the percent-encoded value of `key`.
///
/// List values are joined with a comma before encoding.
pub fn build_href(template: &str, values: &ParameterValues) -> String {
    let mut href = template.to_string();
    for (key, value) in values {
        let placeholder = format!("{{{key}}}");
        if href.contains(&placeholder) {
            href = href.replace(&placeholder, &urlencoding::encode(&value.joined()));
        }
    }
    href
}

/// Returns the placeholder names of `template` in order of appearance, one entry per occurrence.
pub fn extract_params(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|captures| captures[1].to_string())
        .collect()
}
