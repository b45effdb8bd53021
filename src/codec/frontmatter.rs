use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::{error::TagbaseError, tags::is_valid_tag_path};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Metadata format of a document header, chosen by its opening delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataFormat {
    /// Delimited by `---` lines.
    Yaml,
    /// Delimited by `+++` lines.
    Toml,
}

impl MetadataFormat {
    pub fn delimiter(&self) -> &'static str {
        match self {
            MetadataFormat::Yaml => "---",
            MetadataFormat::Toml => "+++",
        }
    }

    fn from_delimiter(line: &str) -> Option<MetadataFormat> {
        match line {
            "---" => Some(MetadataFormat::Yaml),
            "+++" => Some(MetadataFormat::Toml),
            _ => None,
        }
    }
}

/// A document cut into its raw header text and body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontmatterSplit<'a> {
    pub format: MetadataFormat,
    pub header: &'a str,
    pub body: &'a str,
}

/// The validated header fields. Only `title` and `tags` are typed; everything else is carried
/// through untouched in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub frontmatter: Frontmatter,
    pub body: String,
}

/// Parse and validate a complete document.
pub fn parse_document(raw: &str) -> Result<ParsedDocument, TagbaseError> {
    let split = split_frontmatter(raw)?;
    let header = parse_header(split.format, split.header)?;
    let frontmatter = validate_header(header)?;
    Ok(ParsedDocument {
        frontmatter,
        body: split.body.to_string(),
    })
}

/// Locate the header delimiters. The header must open on the very first line (after an optional
/// byte order mark) and close on a line holding the same delimiter.
pub fn split_frontmatter(raw: &str) -> Result<FrontmatterSplit<'_>, TagbaseError> {
    let text = raw.strip_prefix(BYTE_ORDER_MARK).unwrap_or(raw);

    let mut lines = LineCursor::new(text);
    let Some((_, first)) = lines.next() else {
        return Err(TagbaseError::Parse(
            "document is empty; expected a frontmatter header".to_string(),
        ));
    };
    let Some(format) = MetadataFormat::from_delimiter(first.trim_end()) else {
        return Err(TagbaseError::Parse(
            "document does not start with a frontmatter delimiter ('---' or '+++')".to_string(),
        ));
    };
    let header_start = lines.offset();

    while let Some((line_start, line)) = lines.next() {
        if line.trim_end() == format.delimiter() {
            return Ok(FrontmatterSplit {
                format,
                header: &text[header_start..line_start],
                body: &text[lines.offset()..],
            });
        }
    }

    Err(TagbaseError::Parse(format!(
        "unterminated frontmatter header; missing closing '{}'",
        format.delimiter()
    )))
}

fn parse_header(format: MetadataFormat, header: &str) -> Result<Map<String, Value>, TagbaseError> {
    let value = match format {
        MetadataFormat::Yaml => {
            if header.trim().is_empty() {
                Value::Null
            } else {
                serde_yaml::from_str::<Value>(header)?
            }
        }
        MetadataFormat::Toml => {
            let table = header.parse::<toml::Table>().map_err(|e| {
                TagbaseError::Parse(format!("TOML frontmatter is malformed: {e}"))
            })?;
            toml_to_json(toml::Value::Table(table))
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(TagbaseError::Parse(
            "frontmatter header is empty; expected a mapping".to_string(),
        )),
        other => Err(TagbaseError::Parse(format!(
            "frontmatter header is not a mapping (found {})",
            json_type_name(&other)
        ))),
    }
}

/// Check the required fields of a parsed header and split off the optional ones.
pub fn validate_header(mut header: Map<String, Value>) -> Result<Frontmatter, TagbaseError> {
    let title = match header.remove("title") {
        None => {
            return Err(TagbaseError::Validation(
                "missing required field 'title'".to_string(),
            ))
        }
        Some(Value::String(title)) => title.trim().to_string(),
        Some(other) => {
            return Err(TagbaseError::Validation(format!(
                "field 'title' must be a string (found {})",
                json_type_name(&other)
            )))
        }
    };
    if title.is_empty() {
        return Err(TagbaseError::Validation(
            "field 'title' must not be empty".to_string(),
        ));
    }

    let raw_tags = match header.remove("tags") {
        None => {
            return Err(TagbaseError::Validation(
                "missing required field 'tags'".to_string(),
            ))
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(TagbaseError::Validation(format!(
                "field 'tags' must be a list (found {})",
                json_type_name(&other)
            )))
        }
    };
    if raw_tags.is_empty() {
        return Err(TagbaseError::Validation(
            "field 'tags' must not be empty".to_string(),
        ));
    }

    let mut tags: Vec<String> = Vec::with_capacity(raw_tags.len());
    for (idx, item) in raw_tags.into_iter().enumerate() {
        let tag = match item {
            Value::String(tag) => tag,
            other => {
                return Err(TagbaseError::Validation(format!(
                    "tag at index {idx} must be a string (found {})",
                    json_type_name(&other)
                )))
            }
        };
        let tag = tag.trim();
        if !is_valid_tag_path(tag) {
            return Err(TagbaseError::Validation(format!(
                "tag '{tag}' is not a valid dot-separated tag path"
            )));
        }
        if !tags.iter().any(|seen| seen == tag) {
            tags.push(tag.to_string());
        }
    }

    Ok(Frontmatter {
        title,
        tags,
        metadata: header.into_iter().collect(),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Convert a TOML value into the JSON representation used for opaque metadata. Datetimes become
/// their RFC 3339 string form.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Iterates lines while tracking byte offsets, treating `\n` as the terminator (a trailing `\r`
/// stays on the line and is trimmed by the caller).
struct LineCursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        LineCursor { text, pos: 0 }
    }

    /// Byte offset of the start of the next line.
    fn offset(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for LineCursor<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }
        let start = self.pos;
        let rest = &self.text[start..];
        let (line, advance) = match rest.find('\n') {
            Some(idx) => (&rest[..idx], idx + 1),
            None => (rest, rest.len()),
        };
        self.pos += advance;
        Some((start, line))
    }
}
