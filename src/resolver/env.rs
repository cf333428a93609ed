//! Environment file parsing and the compile-time define map

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

/// Namespace every env entry is defined under
pub const IMPORT_META_ENV: &str = "import.meta.env";

/// Namespace used when process environment variables are bundled
pub const PROCESS_ENV: &str = "process.env";

/// Key holding the build mode, always defined in both namespaces
pub const MODE_KEY: &str = "NODE_ENV";

static ENV_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:export\s+)?([\w.-]+)\s*=\s*(.*?)\s*$").unwrap()
});

/// JSON number grammar, the only form esbuild accepts as a bare define value
static NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(?:0|[1-9][0-9]*)(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?$").unwrap()
});

/// Compile-time substitution table handed to the bundler.
///
/// Keys are symbolic references such as `import.meta.env.PORT`, values are
/// JavaScript literals ready to be spliced into the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DefineMap(BTreeMap<String, String>);

impl DefineMap {
    /// Insert a raw literal, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, literal: impl Into<String>) {
        self.0.insert(name.into(), literal.into());
    }

    /// Define `name` under `import.meta.env` and, when `process` is set, under
    /// `process.env` as well
    pub fn add_property(&mut self, name: &str, value: &str, process: bool) {
        let literal = literal(value);
        if process {
            self.insert(format!("{}.{}", PROCESS_ENV, name), literal.clone());
        }
        self.insert(format!("{}.{}", IMPORT_META_ENV, name), literal);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    #[cfg(test)]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Whether `value` can be emitted as a bare numeric literal: it must match
/// the JSON number grammar exactly and be finite.
pub fn is_numeric(value: &str) -> bool {
    NUMBER_REGEX.is_match(value) && value.parse::<f64>().map_or(false, f64::is_finite)
}

/// Render an env value as a JavaScript literal
pub fn literal(value: &str) -> String {
    if is_numeric(value) {
        value.to_string()
    } else {
        serde_json::Value::String(value.to_string()).to_string()
    }
}

/// Parse `KEY=VALUE` lines. Lines that don't look like an assignment are
/// skipped; later duplicates win when the result is collected into a map.
pub fn parse(content: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some(caps) = ENV_LINE_REGEX.captures(line) else {
            debug!("Skipping malformed env line: {}", line);
            continue;
        };

        let key = caps[1].to_string();
        let value = unquote(&caps[2]);
        entries.push((key, value));
    }

    entries
}

fn unquote(raw: &str) -> String {
    let quoted = |q: char| raw.len() >= 2 && raw.starts_with(q) && raw.ends_with(q);

    if quoted('"') {
        unescape(&raw[1..raw.len() - 1])
    } else if quoted('\'') || quoted('`') {
        raw[1..raw.len() - 1].to_string()
    } else {
        // Unquoted values may carry a trailing comment
        match raw.find(" #") {
            Some(pos) => raw[..pos].trim_end().to_string(),
            None => raw.to_string(),
        }
    }
}

/// Expand `\n`, `\r`, `\t`, `\"` and `\\` in one pass; any other escape
/// keeps its backslash
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Read and parse an env file. A missing or unreadable file yields no entries.
pub fn load(path: &Path) -> Vec<(String, String)> {
    if !path.exists() {
        debug!("No env file at {}", path.display());
        return Vec::new();
    }

    match fs::read_to_string(path) {
        Ok(content) => parse(&content),
        Err(e) => {
            warn!("Failed to read env file {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Build the define map for a set of env entries.
///
/// The mode key is written last so an env file can never override it.
pub fn define_map(entries: &[(String, String)], production: bool, bundle_env_vars: bool) -> DefineMap {
    let mut define = DefineMap::default();

    for (key, value) in entries {
        define.add_property(key, value, bundle_env_vars);
    }

    let mode = if production { "production" } else { "development" };
    define.add_property(MODE_KEY, mode, true);

    define
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_numeric_boundaries() {
        assert!(is_numeric("42"));
        assert!(is_numeric("3.14"));
        assert!(is_numeric("0"));
        assert!(is_numeric("-7"));
        assert!(is_numeric("1e3"));

        assert!(!is_numeric(""));
        assert!(!is_numeric("0x1"));
        assert!(!is_numeric(" 42"));
        assert!(!is_numeric("42 "));
        assert!(!is_numeric("007"));
        assert!(!is_numeric(".5"));
        assert!(!is_numeric("+5"));
        assert!(!is_numeric("NaN"));
        assert!(!is_numeric("Infinity"));
        assert!(!is_numeric("1e999"));
        assert!(!is_numeric("localhost"));
    }

    #[test]
    fn test_literal_quoting() {
        assert_eq!(literal("42"), "42");
        assert_eq!(literal("localhost"), "\"localhost\"");
        assert_eq!(literal(""), "\"\"");
        assert_eq!(literal(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(literal("a\\b"), r#""a\\b""#);
        assert_eq!(literal("line\nbreak"), r#""line\nbreak""#);
    }

    #[test]
    fn test_double_quoted_escapes() {
        let parsed = parse(r#"P="C:\\new"
TAB="a\tb"
QUOTE="say \"hi\""
OTHER="\d+"
TRAILING="end\"
"#);

        assert_eq!(
            parsed,
            entries(&[
                ("P", r"C:\new"),
                ("TAB", "a\tb"),
                ("QUOTE", r#"say "hi""#),
                ("OTHER", r"\d+"),
                ("TRAILING", r"end\"),
            ])
        );
    }

    #[test]
    fn test_parse_permissive() {
        let content = "\
# database
DB_HOST=localhost
DB_PORT = 5432
export API_KEY=abc123
QUOTED=\"hello world\"
SINGLE='it''s raw'
MULTI=\"a\\nb\"
COMMENTED=value # trailing
this line is garbage
=no-key
EMPTY=
DB_HOST=db.internal
";

        let parsed = parse(content);
        assert_eq!(
            parsed,
            entries(&[
                ("DB_HOST", "localhost"),
                ("DB_PORT", "5432"),
                ("API_KEY", "abc123"),
                ("QUOTED", "hello world"),
                ("SINGLE", "it''s raw"),
                ("MULTI", "a\nb"),
                ("COMMENTED", "value"),
                ("EMPTY", ""),
                ("DB_HOST", "db.internal"),
            ])
        );
    }

    #[test]
    fn test_define_map_without_process_env() {
        let define = define_map(&entries(&[("PORT", "3000"), ("HOST", "localhost")]), false, false);

        assert_eq!(define.get("import.meta.env.PORT"), Some("3000"));
        assert_eq!(define.get("import.meta.env.HOST"), Some("\"localhost\""));
        assert!(!define.contains_key("process.env.PORT"));
        assert_eq!(define.get("import.meta.env.NODE_ENV"), Some("\"development\""));
        assert_eq!(define.get("process.env.NODE_ENV"), Some("\"development\""));
        assert!(define.len() >= 2 + 1);
    }

    #[test]
    fn test_define_map_with_process_env() {
        let define = define_map(&entries(&[("PORT", "3000"), ("HOST", "localhost")]), true, true);

        assert_eq!(define.get("process.env.PORT"), Some("3000"));
        assert_eq!(define.get("process.env.HOST"), Some("\"localhost\""));
        assert_eq!(define.len(), 2 * 2 + 2);
    }

    #[test]
    fn test_mode_key_ignores_env_file() {
        let define = define_map(&entries(&[("NODE_ENV", "test")]), true, true);

        assert_eq!(define.get("import.meta.env.NODE_ENV"), Some("\"production\""));
        assert_eq!(define.get("process.env.NODE_ENV"), Some("\"production\""));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let define = define_map(&entries(&[("A", "1"), ("A", "two")]), false, false);
        assert_eq!(define.get("import.meta.env.A"), Some("\"two\""));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load(&dir.path().join(".env")).is_empty());
    }
}
