//! Import specifier extraction
//!
//! A lexical scan, good enough to discover which specifiers a source tree
//! uses. Actual module resolution is left to the bundler.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Static imports, re-exports and `require` calls
static IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:import|export)\s+(?:[\w*{}\s,$]+?\s+from\s+)?["']([^"']+)["']|require\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap()
});

static DYNAMIC_IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap()
});

const SCRIPT_EXTENSIONS: [&str; 8] = ["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// Whether a file is worth scanning for imports
pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| SCRIPT_EXTENSIONS.contains(&ext))
}

/// Extract import/require specifiers in source order, without duplicates
pub fn extract_specifiers(source: &str) -> Vec<String> {
    let mut specifiers: Vec<String> = Vec::new();

    let static_imports = IMPORT_REGEX
        .captures_iter(source)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)));
    let dynamic_imports = DYNAMIC_IMPORT_REGEX
        .captures_iter(source)
        .filter_map(|cap| cap.get(1));

    for specifier in static_imports.chain(dynamic_imports) {
        let spec = specifier.as_str();
        if !specifiers.iter().any(|s| s == spec) {
            specifiers.push(spec.to_string());
        }
    }

    specifiers
}
