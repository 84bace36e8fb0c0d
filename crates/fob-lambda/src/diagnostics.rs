//! Compilation diagnostics.
//!
//! The engine reports per-module errors and warnings. They are carried in the
//! build result as [`Diagnostic`] values so one check covers the whole batch.

use serde::{Deserialize, Serialize};

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One error or warning reported by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Module the diagnostic refers to, when it can be determined.
    pub file: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        let message = message.into();
        let file = extract_file_path(&message);
        Self {
            severity,
            message,
            file,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.file {
            Some(file) => write!(f, "{label} in {file}: {}", self.message),
            None => write!(f, "{label}: {}", self.message),
        }
    }
}

/// Marker the engine prints in front of every per-module diagnostic.
const ITEM_MARKER: &str = "BuildDiagnostic";

/// Marker of the wrapper the engine batches its failures in.
const BATCH_MARKER: &str = "BatchedBuildDiagnostic";

/// Fields whose values embed module source text.
const SOURCE_FIELDS: &[&str] = &["source", "source_text", "code"];

/// Extract diagnostics from a formatted engine error.
///
/// Rolldown batches its build failures. The batch wrapper is skipped and each
/// item becomes one diagnostic with a readable message.
pub fn from_engine_error(error: &dyn std::fmt::Debug) -> Vec<Diagnostic> {
    parse_engine_text(&format!("{error:?}"), Severity::Error)
}

/// Readable warning from one formatted engine diagnostic.
pub fn from_engine_warning(warning: &dyn std::fmt::Debug) -> Diagnostic {
    let mut parsed = parse_engine_text(&format!("{warning:?}"), Severity::Warning);
    if parsed.is_empty() {
        Diagnostic::warning(String::new())
    } else {
        parsed.swap_remove(0)
    }
}

fn parse_engine_text(text: &str, severity: Severity) -> Vec<Diagnostic> {
    let mut cleaned = text.to_string();
    for field in SOURCE_FIELDS {
        cleaned = strip_string_field(&cleaned, field);
    }

    let items = split_items(&cleaned);
    if items.is_empty() {
        return vec![describe(severity, &cleaned)];
    }
    items
        .into_iter()
        .map(|item| describe(severity, item))
        .collect()
}

/// Slice the formatted text at every item marker that is not part of the
/// batch marker. Returns nothing when there is no item marker at all.
fn split_items(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = text
        .match_indices(ITEM_MARKER)
        .map(|(pos, _)| pos)
        .filter(|&pos| !is_batch_marker(text, pos))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}

fn is_batch_marker(text: &str, item_pos: usize) -> bool {
    let prefix = &BATCH_MARKER[..BATCH_MARKER.len() - ITEM_MARKER.len()];
    text[..item_pos].ends_with(prefix)
}

/// Turn one formatted engine diagnostic, with its source fields already
/// emptied, into `kind: message`.
fn describe(severity: Severity, cleaned: &str) -> Diagnostic {
    let kind = inner_kind(cleaned);
    let detail = ["message", "specifier", "reason"]
        .iter()
        .find_map(|field| string_field(cleaned, field));
    let file = ["id", "filename", "importer", "path", "module_id"]
        .iter()
        .find_map(|field| string_field(cleaned, field))
        .filter(|value| !value.is_empty());

    let message = match (kind, detail) {
        (Some(kind), Some(detail)) => format!("{}: {}", kind, detail),
        (Some(kind), None) => kind,
        (None, Some(detail)) => detail,
        (None, None) => truncate(cleaned.trim(), 200),
    };

    Diagnostic {
        severity,
        file: file.or_else(|| extract_file_path(&message)),
        message,
    }
}

/// `ParseError` in `BuildDiagnostic { inner: ParseError { .. } }`, as words.
fn inner_kind(text: &str) -> Option<String> {
    let start = text.find("inner: ")? + "inner: ".len();
    let ident: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if ident.is_empty() {
        return None;
    }

    let mut words = String::new();
    for (i, c) in ident.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            words.push(' ');
        }
        words.push(c.to_ascii_lowercase());
    }
    let mut chars = words.chars();
    chars
        .next()
        .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
}

/// Position right after `field: "` at a field boundary.
fn find_string_field(text: &str, field: &str) -> Option<usize> {
    let needle = format!("{field}: \"");
    text.match_indices(&needle)
        .find(|(pos, _)| {
            text[..*pos]
                .chars()
                .next_back()
                .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'))
        })
        .map(|(pos, _)| pos + needle.len())
}

/// Unescaped value of the first `field: "..."` in Debug output.
fn string_field(text: &str, field: &str) -> Option<String> {
    let start = find_string_field(text, field)?;
    let (value, _) = read_debug_string(&text[start..])?;
    Some(value)
}

/// Replace every `field: "..."` value with an empty string.
fn strip_string_field(text: &str, field: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = find_string_field(rest, field) {
        let Some((_, len)) = read_debug_string(&rest[start..]) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + len..];
    }
    out.push_str(rest);
    out
}

/// Read a Debug-escaped string body up to its closing quote. Returns the
/// unescaped value and the number of bytes consumed, excluding the quote.
fn read_debug_string(text: &str) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, i)),
            '\\' => match chars.next()?.1 {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                other => value.push(other),
            },
            other => value.push(other),
        }
    }
    None
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Extract a source path from a diagnostic message.
fn extract_file_path(text: &str) -> Option<String> {
    for ext in [".js", ".ts", ".mjs", ".cjs", ".mts", ".cts", ".json"] {
        if let Some(pos) = text.find(ext) {
            let before = &text[..pos + ext.len()];
            for indicator in ["in ", "at ", "file: ", "path: ", "\"", "'"] {
                if let Some(start) = before.rfind(indicator) {
                    let path = before[start + indicator.len()..].trim();
                    if !path.is_empty() && !path.contains(' ') {
                        return Some(path.to_string());
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_predicates() {
        assert!(Diagnostic::error("boom").is_error());
        assert!(!Diagnostic::error("boom").is_warning());
        assert!(Diagnostic::warning("careful").is_warning());
    }

    #[test]
    fn test_extract_file_path() {
        let diag = Diagnostic::error("Unexpected token in /src/broken.js:3:7");
        assert_eq!(diag.file.as_deref(), Some("/src/broken.js"));

        let diag = Diagnostic::error("Could not resolve \"./missing.ts\"");
        assert_eq!(diag.file.as_deref(), Some("./missing.ts"));

        let diag = Diagnostic::warning("something odd happened");
        assert_eq!(diag.file, None);
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::error("Unexpected token in /src/broken.js");
        assert_eq!(
            diag.to_string(),
            "error in /src/broken.js: Unexpected token in /src/broken.js"
        );
        assert_eq!(Diagnostic::warning("odd").to_string(), "warning: odd");
    }

    const BATCH: &str = r#"BatchedBuildDiagnostic([BuildDiagnostic { inner: ParseError { source: "exports.a = {;\n", id: "/src/a.js", diagnostics: [OxcDiagnostic { inner: OxcDiagnosticInner { message: "Unexpected token", labels: None } }] }, severity: Error }, BuildDiagnostic { inner: UnresolvedImport { specifier: "./missing.js", importer: "/src/b.js" }, severity: Error }])"#;

    #[test]
    fn test_split_items_skips_batch_wrapper() {
        let items = split_items(BATCH);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.starts_with("BuildDiagnostic {")));
        assert!(split_items("plain failure").is_empty());
    }

    #[test]
    fn test_batch_items_get_readable_messages() {
        let diagnostics = parse_engine_text(BATCH, Severity::Error);
        assert_eq!(diagnostics.len(), 2);

        assert_eq!(diagnostics[0].message, "Parse error: Unexpected token");
        assert_eq!(diagnostics[0].file.as_deref(), Some("/src/a.js"));
        assert!(!diagnostics[0].message.contains("exports.a"));

        assert_eq!(diagnostics[1].message, "Unresolved import: ./missing.js");
        assert_eq!(diagnostics[1].file.as_deref(), Some("/src/b.js"));
    }

    #[test]
    fn test_kind_without_message() {
        let item = r#"BuildDiagnostic { inner: Eval { span: Span { start: 30, end: 34 }, source: "exports.handle = async (e) => eval(e);", id: "/src/eval.js" }, severity: Warning }"#;
        let diagnostics = parse_engine_text(item, Severity::Warning);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Eval");
        assert_eq!(diagnostics[0].file.as_deref(), Some("/src/eval.js"));
        assert!(diagnostics[0].is_warning());
    }

    #[test]
    fn test_markers_inside_source_are_ignored() {
        let item = r#"BuildDiagnostic { inner: ParseError { source: "const s = \"message: \\\"x\\\"\"; // BuildDiagnostic", id: "/src/q.js", message: "Expected `;`" } }"#;
        let diagnostics = parse_engine_text(item, Severity::Error);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Parse error: Expected `;`");
        assert_eq!(diagnostics[0].file.as_deref(), Some("/src/q.js"));
    }

    #[test]
    fn test_string_field_respects_boundaries() {
        let text = r#"Foo { module_id: "/a.js", id: "/b.js" }"#;
        assert_eq!(string_field(text, "id").as_deref(), Some("/b.js"));
        assert_eq!(string_field(text, "module_id").as_deref(), Some("/a.js"));
    }

    #[test]
    fn test_from_engine_error_counts_items() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct BuildDiagnostic {
            inner: &'static str,
        }
        #[derive(Debug)]
        #[allow(dead_code)]
        struct BatchedBuildDiagnostic(Vec<BuildDiagnostic>);

        let batch = BatchedBuildDiagnostic(vec![
            BuildDiagnostic { inner: "a" },
            BuildDiagnostic { inner: "b" },
        ]);
        let diagnostics = from_engine_error(&batch);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(Diagnostic::is_error));
    }

    #[test]
    fn test_from_engine_error_single() {
        let diagnostics = from_engine_error(&"plain failure");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
    }
}
