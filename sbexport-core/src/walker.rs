//! Payload tree-walker
//!
//! Export documents embed C# sources as base64 strings under the reserved
//! `byteCode` key, anywhere in the tree. The walker traverses the document
//! depth-first (object keys in document order, array elements in index
//! order) and either extracts those payloads into an ordered set of named
//! records, or injects file contents back into `byteCode` fields that hold a
//! `.cs` filename reference instead of inline content.
//!
//! A single undecodable payload or unresolvable file reference never aborts
//! the walk; such records are skipped and reported in the result.

use indexmap::IndexMap;
use serde_json::Value;

use crate::naming::{derive_filename, SCRIPT_EXTENSION};

/// Reserved key holding embedded script content (or a filename reference).
pub const BYTECODE_KEY: &str = "byteCode";

/// Sibling key used to derive a human-readable filename.
pub const NAME_KEY: &str = "name";

/// Extracted payloads, keyed by derived filename in traversal order.
pub type PayloadSet = IndexMap<String, String>;

/// Why a matching node was skipped during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The `byteCode` value was not valid base64.
    InvalidBase64,
    /// The decoded bytes were not valid UTF-8.
    InvalidUtf8,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidBase64 => write!(f, "byteCode is not valid base64"),
            SkipReason::InvalidUtf8 => write!(f, "decoded byteCode is not valid UTF-8"),
        }
    }
}

/// One record that could not be extracted.
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    /// Document path of the offending node, e.g. `.actions[2].subactions[0]`.
    pub path: String,
    pub reason: SkipReason,
}

/// Result of [`extract`].
#[derive(Debug, Default)]
pub struct Extraction {
    /// Extracted (filename, content) records in traversal order.
    pub payloads: PayloadSet,
    /// Matching nodes whose payload could not be decoded.
    pub skipped: Vec<SkippedRecord>,
}

/// Result of [`inject`].
#[derive(Debug, Default)]
pub struct Injection {
    /// Number of `byteCode` references replaced with inline content.
    pub injected: usize,
    /// Filename references the source could not resolve, in traversal order.
    pub missing: Vec<String>,
}

/// Source of script contents for [`inject`].
///
/// The walker never touches a filesystem; callers supply the lookup. Any
/// `Fn(&str) -> Option<String>` works, as does a prebuilt map.
pub trait FileSource {
    /// Resolve a filename to its UTF-8 content, or `None` if unknown.
    fn resolve(&self, filename: &str) -> Option<String>;
}

impl<F> FileSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, filename: &str) -> Option<String> {
        self(filename)
    }
}

impl FileSource for IndexMap<String, String> {
    fn resolve(&self, filename: &str) -> Option<String> {
        self.get(filename).cloned()
    }
}

impl FileSource for std::collections::HashMap<String, String> {
    fn resolve(&self, filename: &str) -> Option<String> {
        self.get(filename).cloned()
    }
}

/// Extract every embedded script payload from a document.
///
/// The document itself is left untouched. Filenames are derived from the
/// node's `name` sibling and disambiguated with the running record counter
/// (see [`crate::naming`]).
pub fn extract(document: &Value) -> Extraction {
    let mut result = Extraction::default();
    extract_node(document, String::new(), &mut result);
    result
}

fn extract_node(node: &Value, path: String, result: &mut Extraction) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(encoded)) = map.get(BYTECODE_KEY) {
                match decode_payload(encoded) {
                    Ok(content) => {
                        let name = match map.get(NAME_KEY) {
                            Some(Value::String(name)) => Some(name.as_str()),
                            _ => None,
                        };
                        let filename = derive_filename(name, result.payloads.len(), |f| {
                            result.payloads.contains_key(f)
                        });
                        result.payloads.insert(filename, content);
                    }
                    Err(reason) => result.skipped.push(SkippedRecord {
                        path: path.clone(),
                        reason,
                    }),
                }
            }
            for (key, value) in map {
                extract_node(value, format!("{}.{}", path, key), result);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                extract_node(value, format!("{}[{}]", path, index), result);
            }
        }
        _ => {}
    }
}

fn decode_payload(encoded: &str) -> Result<String, SkipReason> {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    let bytes = BASE64.decode(encoded).map_err(|_| SkipReason::InvalidBase64)?;
    String::from_utf8(bytes).map_err(|_| SkipReason::InvalidUtf8)
}

fn encode_payload(content: &str) -> String {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    BASE64.encode(content.as_bytes())
}

/// Replace `byteCode` filename references with inline base64 content.
///
/// Only string values ending in `.cs` are treated as references; values
/// already holding inline content are left untouched. Unresolvable
/// references are reported in [`Injection::missing`] and skipped.
pub fn inject(document: &mut Value, source: &impl FileSource) -> Injection {
    let mut result = Injection::default();
    inject_node(document, source, &mut result);
    result
}

fn inject_node(node: &mut Value, source: &impl FileSource, result: &mut Injection) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(value)) = map.get_mut(BYTECODE_KEY) {
                if value.ends_with(SCRIPT_EXTENSION) {
                    match source.resolve(value) {
                        Some(content) => {
                            *value = encode_payload(&content);
                            result.injected += 1;
                        }
                        None => result.missing.push(value.clone()),
                    }
                }
            }
            for (_, value) in map.iter_mut() {
                inject_node(value, source, result);
            }
        }
        Value::Array(items) => {
            for value in items {
                inject_node(value, source, result);
            }
        }
        _ => {}
    }
}
