//! Raw config file validation with unknown field detection.
//!
//! serde silently ignores unknown keys, so a typo such as `max_turn` would
//! fall back to the default without notice. This pass walks the raw JSON and
//! reports keys it does not recognise, with a "did you mean" hint.

use std::collections::HashSet;

use serde_json::Value;

/// Known top-level sections and their fields.
const KNOWN_SECTIONS: &[(&str, &[&str])] = &[
    (
        "agent",
        &[
            "model",
            "title_model",
            "max_tokens",
            "temperature",
            "max_iter",
            "max_turns",
        ],
    ),
    ("providers", &["groq", "retry"]),
    ("store", &["base_url", "internal_key"]),
    ("job", &["sync_delay_ms", "history_limit"]),
    ("tools", &["fetch_max_chars", "fetch_max_urls"]),
    ("logging", &["format", "level", "file"]),
    ("dispatcher", &["buffer_size"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

/// A validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, path: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Ok => "[OK]",
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

/// Edit distance between two field names.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b_chars.len() + 1];
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            current[j + 1] = (prev[j + 1] + 1).min(current[j] + 1).min(prev[j] + cost);
        }
        prev = current;
    }
    prev[b_chars.len()]
}

/// Closest known name within distance 3.
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| k.to_string())
}

fn unknown_key(path: &str, key: &str, known: &[&str]) -> Diagnostic {
    let message = match suggest_field(key, known) {
        Some(s) => format!("Unknown field '{}', did you mean '{}'?", key, s),
        None => format!("Unknown field '{}'", key),
    };
    Diagnostic::new(DiagnosticLevel::Error, path, message)
}

/// Validate a raw JSON config value against known field names.
pub fn validate_config(raw: &Value) -> Vec<Diagnostic> {
    let Some(obj) = raw.as_object() else {
        return vec![Diagnostic::new(
            DiagnosticLevel::Error,
            "",
            "Config must be a JSON object",
        )];
    };

    let mut diagnostics = vec![Diagnostic::new(DiagnosticLevel::Ok, "", "Valid JSON")];
    let section_names: Vec<&str> = KNOWN_SECTIONS.iter().map(|(name, _)| *name).collect();
    let mut has_unknown = false;

    for (key, value) in obj {
        let Some((_, fields)) = KNOWN_SECTIONS.iter().find(|(name, _)| *name == key.as_str()) else {
            has_unknown = true;
            diagnostics.push(unknown_key(key, key, &section_names));
            continue;
        };

        let Some(section) = value.as_object() else {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Error,
                key,
                "Section must be a JSON object",
            ));
            continue;
        };

        let known: HashSet<&str> = fields.iter().copied().collect();
        for field in section.keys() {
            if !known.contains(field.as_str()) {
                has_unknown = true;
                diagnostics.push(unknown_key(&format!("{}.{}", key, field), field, fields));
            }
        }
    }

    if !has_unknown {
        diagnostics.push(Diagnostic::new(
            DiagnosticLevel::Ok,
            "",
            "All fields recognized",
        ));
    }

    if obj
        .get("store")
        .and_then(|s| s.get("internal_key"))
        .and_then(Value::as_str)
        .is_some()
    {
        diagnostics.push(Diagnostic::new(
            DiagnosticLevel::Warn,
            "store.internal_key",
            "Stored in plain text; prefer HELMSMAN_STORE_INTERNAL_KEY",
        ));
    }

    diagnostics
}
