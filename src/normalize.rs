use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

/// Matches a Markdown code fence, optionally tagged `json`, across lines.
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```").unwrap());

static LONE_BACKSLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([^\\])\\([^"\\/bfnrtu])"#).unwrap());

/// One bounded textual repair. Strategies are applied cumulatively, in
/// order, re-parsing after each.
type Repair = fn(&str) -> String;

const REPAIRS: [(&str, Repair); 2] = [
    ("escape-lone-backslashes", escape_lone_backslashes),
    ("escape-interior-quotes", escape_interior_quotes),
];

/// Recover a JSON value from free-form LLM output.
///
/// A fenced block wins over the raw text; parse failures go through the
/// repair chain before giving up. Already-valid JSON passes through
/// structurally unchanged.
pub fn extract_json(input: &str) -> Option<Value> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = match FENCE_RE.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str().trim()).unwrap_or(""),
        None => trimmed,
    };
    if candidate.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Some(value);
    }

    let mut repaired = candidate.to_string();
    for (name, repair) in REPAIRS {
        repaired = repair(&repaired);
        match serde_json::from_str::<Value>(&repaired) {
            Ok(value) => {
                debug!("Recovered JSON after repair step '{}'", name);
                return Some(value);
            }
            Err(e) => debug!("Repair step '{}' did not yield valid JSON: {}", name, e),
        }
    }

    None
}

/// Escape single backslashes that do not begin a recognized JSON escape.
fn escape_lone_backslashes(input: &str) -> String {
    LONE_BACKSLASH_RE.replace_all(input, "$1\\\\$2").into_owned()
}

/// Escape stray double quotes inside quoted segments. A quote only closes a
/// string when the next non-space character could legally follow a value.
fn escape_interior_quotes(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string && c == '\\' && i + 1 < chars.len() {
            out.push(c);
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if c == '"' {
            if !in_string {
                in_string = true;
                out.push(c);
            } else {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                match next {
                    Some(n) if matches!(n, ',' | '}' | ']' | ':') => {
                        in_string = false;
                        out.push(c);
                    }
                    None => {
                        in_string = false;
                        out.push(c);
                    }
                    _ => {
                        out.push('\\');
                        out.push('"');
                    }
                }
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}

/// Write-only sink for successfully normalized payloads. Best effort: a
/// failing sink never affects the analysis flow.
pub trait AuditSink: Send + Sync {
    fn persist(&self, id: &str, value: &Value) -> std::io::Result<()>;
}

/// Persists each payload as `analysis-<id>.json` under a directory.
pub struct FileAuditSink {
    dir: PathBuf,
}

impl FileAuditSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileAuditSink { dir: dir.into() }
    }
}

impl AuditSink for FileAuditSink {
    fn persist(&self, id: &str, value: &Value) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("analysis-{}.json", id));
        fs::write(path, serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }
}

/// Normalize a raw completion and record the recovered payload in the audit
/// sink, when one is configured. Returns `None` when the text is
/// unrecoverable as JSON; only the length is logged, never the full text.
pub fn normalize_completion(raw: &str, audit: Option<&dyn AuditSink>) -> Option<Value> {
    match extract_json(raw) {
        Some(value) => {
            if let Some(sink) = audit {
                let id = Uuid::new_v4().to_string();
                if let Err(e) = sink.persist(&id, &value) {
                    warn!("Audit write {} failed: {}", id, e);
                }
            }
            Some(value)
        }
        None => {
            warn!("Completion unrecoverable as JSON ({} chars)", raw.len());
            None
        }
    }
}
