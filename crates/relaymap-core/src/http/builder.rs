//! URL construction for profile endpoints
//!
//! Profile URLs may carry `{name}` placeholders, filled from the execution
//! parameters. `{{` and `}}` produce literal braces.

use crate::{Error, Result};
use url::Url;
use serde_json::{Map, Value};

/// Render a parameter for substitution: strings raw, everything else as JSON text
fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute `{name}` placeholders in `template`
///
/// Every placeholder must have a matching key in `params`; the first one
/// that does not yields [`Error::MissingParameter`]. An unterminated `{` is
/// kept as-is.
pub fn substitute(template: &str, params: &Map<String, Value>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        } else {
            match tail[1..].find('}') {
                Some(close) => {
                    let name = &tail[1..=close];
                    let value = params.get(name).ok_or_else(|| Error::MissingParameter {
                        name: name.to_string(),
                    })?;
                    out.push_str(&param_text(value));
                    rest = &tail[close + 2..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Parse an endpoint URL as configured, without substitution
pub fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::Configuration {
        message: format!("Invalid endpoint URL: {}", raw),
        source: Some(anyhow::Error::new(e)),
    })
}

/// Substitute placeholders and parse the result as an absolute URL
pub fn build_url(template: &str, params: &Map<String, Value>) -> Result<Url> {
    parse_url(&substitute(template, params)?)
}
