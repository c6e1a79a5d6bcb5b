//! The template language.
//!
//! `{# ... #}` comments are stripped; `{{ name }}` substitutes a palette
//! variable; `{{ name | filter:arg | filter2:arg }}` pushes the value
//! through a left-to-right filter chain. Unknown variables and unknown
//! filters pass through untouched so a typo degrades a template instead
//! of killing it.
//!
//! | Filter | Effect |
//! |--------|--------|
//! | `strip` | drop the leading `#` |
//! | `darken:p` / `lighten:p` | shift lightness by `p` in `[0, 1]` |
//! | `saturate:p` / `desaturate:p` | shift saturation by `p` |
//! | `blend:#HEX:w` | mix with the given color at weight `w` |
//! | `alpha:aa` | append two hex digits of alpha |

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;
use tracing::debug;

#[allow(clippy::expect_used)]
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{#.*?#\}").expect("comment pattern is valid"));

#[allow(clippy::expect_used)]
static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("variable pattern is valid"));

/// Renders a template against palette variables. Never fails: anything
/// unrecognized is left in place.
pub fn render(source: &str, vars: &HashMap<String, String>) -> String {
    let without_comments = COMMENT_RE.replace_all(source, "");

    VAR_RE
        .replace_all(&without_comments, |caps: &regex::Captures<'_>| {
            let inner = &caps[1];
            let mut segments = inner.split('|');
            let name = segments.next().unwrap_or("").trim();

            let Some(value) = vars.get(name) else {
                debug!(variable = name, "unknown template variable left in place");
                return caps[0].to_string();
            };

            segments.fold(value.clone(), |value, filter| {
                apply_filter(&value, filter.trim())
            })
        })
        .into_owned()
}

/// Applies one `name:arg:arg` filter; unrecognized filters and bad
/// arguments pass the color through unchanged.
fn apply_filter(value: &str, spec: &str) -> String {
    let mut parts = spec.split(':');
    let name = parts.next().unwrap_or("").trim();
    let args: Vec<&str> = parts.map(str::trim).collect();

    match (name, args.as_slice()) {
        ("strip", []) => value.trim_start_matches('#').to_string(),
        ("darken", [amount]) => match amount.parse::<f32>() {
            Ok(amount) => varia_color::darken(value, amount),
            Err(_) => pass_through(value, spec),
        },
        ("lighten", [amount]) => match amount.parse::<f32>() {
            Ok(amount) => varia_color::lighten(value, amount),
            Err(_) => pass_through(value, spec),
        },
        ("saturate", [amount]) => match amount.parse::<f32>() {
            Ok(amount) => varia_color::saturate(value, amount),
            Err(_) => pass_through(value, spec),
        },
        ("desaturate", [amount]) => match amount.parse::<f32>() {
            Ok(amount) => varia_color::desaturate(value, amount),
            Err(_) => pass_through(value, spec),
        },
        ("blend", [other, weight]) => match weight.parse::<f32>() {
            Ok(weight) => varia_color::blend(value, other, weight),
            Err(_) => pass_through(value, spec),
        },
        ("alpha", [alpha])
            if alpha.len() == 2 && alpha.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            format!("{value}{alpha}")
        }
        _ => pass_through(value, spec),
    }
}

fn pass_through(value: &str, spec: &str) -> String {
    debug!(filter = spec, "unknown template filter ignored");
    value.to_string()
}
