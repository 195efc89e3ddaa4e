//! Structured job data embedded in pages: script variables holding JSON
//! literals, and schema.org `JobPosting` blocks.

use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use sws_scraper::{Html, Selector};

use crate::dom::{raw_text, strip_tags};
use crate::model::Extraction;
use crate::text::normalize_opt;

lazy_static! {
    static ref SCRIPT: Selector = Selector::parse("script").unwrap();
    static ref JSON_LD: Selector =
        Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
}

/// Finds `NAME = [...]` or `NAME = {...}` assignments in inline scripts.
///
/// The literal is delimited by a bracket-balanced scan that skips over string
/// contents, then parsed as JSON. No script is executed.
#[derive(Debug, Clone)]
pub struct ScriptVariable {
    name: String,
    assignment: Regex,
}

impl ScriptVariable {
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("Empty script variable name"));
        }
        let assignment = Regex::new(&format!(r"\b{}\s*=\s*[\[{{]", regex::escape(name)))?;
        Ok(Self {
            name: name.to_string(),
            assignment,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First assignment across the document's scripts that parses as JSON.
    pub fn find(&self, document: &Html) -> Option<Value> {
        document
            .select(SCRIPT.clone())
            .find_map(|script| self.find_in(&raw_text(&script)))
    }

    pub fn find_in(&self, script: &str) -> Option<Value> {
        self.assignment.find_iter(script).find_map(|m| {
            // The match ends right after the opening bracket
            let start = m.end() - 1;
            let literal = balanced(&script[start..])?;
            match serde_json::from_str(literal) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::debug!("Unparsable `{}` literal: {}", self.name, e);
                    None
                }
            }
        })
    }
}

/// The prefix of `text` up to the bracket closing its first character.
fn balanced(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => (),
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => (),
        }
    }

    None
}

fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Description of a position-detail object.
///
/// The non-empty `custom_fields.details[].value` entries, tags stripped, in
/// order and separated by a blank line. A plain `description` is used when
/// there are no details.
pub fn detail_description(position: &Value) -> Option<String> {
    let details = position
        .pointer("/custom_fields/details")
        .and_then(Value::as_array)
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d.get("value").and_then(Value::as_str))
                .map(strip_tags)
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|details| !details.is_empty());

    match details {
        Some(details) => Some(details.join("\n\n")),
        None => str_field(position, &["description"])
            .map(strip_tags)
            .filter(|d| !d.is_empty()),
    }
}

pub fn detail_title(position: &Value) -> Option<String> {
    normalize_opt(str_field(position, &["title", "name"]))
}

/// A posting listed in a script-embedded positions list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPosition {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

/// Postings of a positions list: either a bare array or an object wrapping
/// one under a usual key.
pub fn positions(value: &Value) -> Vec<EmbeddedPosition> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => ["positions", "jobs", "results", "data"]
            .iter()
            .filter_map(|k| value.get(*k).and_then(Value::as_array))
            .map(Vec::as_slice)
            .next()
            .unwrap_or_default(),
        _ => &[],
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| EmbeddedPosition {
            title: detail_title(item),
            url: str_field(item, &["url", "href", "link", "absolute_url"]).map(str::to_string),
            description: detail_description(item),
        })
        .collect()
}

/// The first JSON-LD block typed `JobPosting`.
///
/// Unparsable blocks are skipped. An array wrapper contributes its first
/// element only. The search stops at the first posting even when it carries no
/// description.
pub fn json_ld_posting(document: &Html) -> Option<Extraction> {
    document
        .select(JSON_LD.clone())
        .filter_map(|script| parse_json_ld(&raw_text(&script)))
        .find(|value| value.get("@type").and_then(Value::as_str) == Some("JobPosting"))
        .map(|posting| Extraction {
            description: str_field(&posting, &["description"])
                .map(strip_tags)
                .filter(|d| !d.is_empty()),
            title: detail_title(&posting),
        })
}

fn parse_json_ld(text: &str) -> Option<Value> {
    let text = text.trim();
    let text = text
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text);

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(mut items)) if !items.is_empty() => {
            Some(items.swap_remove(0)).filter(Value::is_object)
        }
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(_) => None,
        Err(e) => {
            log::debug!("Unparsable JSON-LD block: {}", e);
            None
        }
    }
}
