//! Document rendering.
//!
//! A pure mapping from a parsed document to its display string. The viewport
//! splits the result on `\n` into sub-lines; every mode therefore produces
//! at least one sub-line, and only [`RenderMode::JsonPretty`] is expected to
//! produce many.

use bson::{Bson, Document, RawDocument};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// How a document is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Single-line JSON; newlines only inside string values.
    JsonOneline,
    /// Indented multi-line JSON, one-space indent.
    JsonPretty,
    /// Diagnostic form: one line per top-level field.
    ToString,
    /// Interpret the first five fields as `[date, severity, component,
    /// context, message]`. Useful for log-shaped collections.
    TextLogs,
}

/// JSON dialect for the JSON render modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonFlavor {
    /// Relaxed Extended JSON: plain numbers and strings where possible.
    Strict,
    /// Canonical Extended JSON: binary/date/regex types kept explicit.
    Extended,
}

impl JsonFlavor {
    pub fn toggled(self) -> Self {
        match self {
            Self::Strict => Self::Extended,
            Self::Extended => Self::Strict,
        }
    }
}

/// Render `doc` in the given mode.
///
/// Total: a document that fails deep decoding renders as a one-line
/// diagnostic instead of aborting the draw.
pub fn render(doc: &RawDocument, mode: RenderMode, flavor: JsonFlavor) -> String {
    let parsed: Document = match bson::from_slice(doc.as_bytes()) {
        Ok(parsed) => parsed,
        Err(err) => return format!("--- unreadable document: {err} ---"),
    };
    match mode {
        RenderMode::JsonOneline => json_oneline(parsed, flavor),
        RenderMode::JsonPretty => json_pretty(parsed, flavor),
        RenderMode::ToString => to_string_lines(&parsed),
        RenderMode::TextLogs => text_logs(&parsed),
    }
}

/// Relaxed Extended JSON projection of a document, used by structured search
/// so matching is independent of the current render flavor.
pub fn document_json(doc: &RawDocument) -> Option<serde_json::Value> {
    let parsed: Document = bson::from_slice(doc.as_bytes()).ok()?;
    Some(Bson::Document(parsed).into_relaxed_extjson())
}

fn json_value(doc: Document, flavor: JsonFlavor) -> serde_json::Value {
    let bson = Bson::Document(doc);
    match flavor {
        JsonFlavor::Strict => bson.into_relaxed_extjson(),
        JsonFlavor::Extended => bson.into_canonical_extjson(),
    }
}

fn json_oneline(doc: Document, flavor: JsonFlavor) -> String {
    serde_json::to_string(&json_value(doc, flavor)).unwrap_or_default()
}

fn json_pretty(doc: Document, flavor: JsonFlavor) -> String {
    let value = json_value(doc, flavor);
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b" "));
    if value.serialize(&mut ser).is_err() {
        return json_oneline_value(&value);
    }
    String::from_utf8(out).unwrap_or_default()
}

fn json_oneline_value(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn to_string_lines(doc: &Document) -> String {
    let lines: Vec<String> = doc
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect();
    if lines.is_empty() {
        "{}".to_string()
    } else {
        lines.join("\n")
    }
}

fn text_logs(doc: &Document) -> String {
    let mut out = String::new();
    for (position, (_name, value)) in doc.iter().enumerate().take(5) {
        match position {
            0 => match value {
                Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
                    Ok(stamp) => out.push_str(&stamp),
                    Err(_) => out.push_str(&dt.to_string()),
                },
                other => out.push_str(&other.to_string()),
            },
            1 => {
                let severity = value
                    .as_str()
                    .and_then(|s| s.chars().next())
                    .map_or('?', |c| c.to_ascii_uppercase());
                out.push(' ');
                out.push(severity);
            }
            2 => {
                out.push(' ');
                push_text(&mut out, value);
            }
            3 => {
                out.push_str(" [");
                push_text(&mut out, value);
                out.push(']');
            }
            4 => {
                let raw = value.as_str().unwrap_or_default();
                let mut message = raw.trim_end_matches('\n').to_string();
                while let Some(rest) = message.strip_prefix('\t') {
                    message = format!("        {rest}");
                }
                out.push(' ');
                out.push_str(&message);
            }
            _ => unreachable!(),
        }
    }
    out
}

fn push_text(out: &mut String, value: &Bson) {
    match value.as_str() {
        Some(s) => out.push_str(s),
        None => out.push_str(&value.to_string()),
    }
}
