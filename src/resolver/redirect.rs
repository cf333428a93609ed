//! Import prefix redirection
//!
//! A rule maps an import prefix such as `@lib` onto a directory. Imports
//! under the prefix are probed on disk with an ordered list of strategies;
//! the first hit becomes an alias, a miss leaves the import untouched.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use super::{imports, ResolveError};
use crate::bundler::AliasTable;

/// One `prefix -> directory` rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectRule {
    pub prefix: String,
    pub dir: PathBuf,
}

impl RedirectRule {
    pub fn new(prefix: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            dir: dir.into(),
        }
    }

    /// Parse a `PREFIX=DIR` command-line rule, resolving `DIR` against `base`
    pub fn parse(spec: &str, base: &Path) -> Result<Self, ResolveError> {
        match spec.split_once('=') {
            Some((prefix, dir)) if !prefix.is_empty() && !dir.is_empty() => {
                Ok(Self::new(prefix, base.join(dir)))
            }
            _ => Err(ResolveError::InvalidRedirect(spec.to_string())),
        }
    }

    /// Path of `import` below the prefix, if the prefix applies
    fn remainder<'a>(&self, import: &'a str) -> Option<&'a str> {
        let rest = import.strip_prefix(self.prefix.as_str())?;

        if self.prefix.ends_with('/') || rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }
}

/// Outcome of redirecting one import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Resolved(PathBuf),
    PassThrough,
}

/// File probing strategies, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The candidate path is a file
    ExactFile,
    /// `name.*` next to the candidate
    ExtensionGlob,
    /// `index.*` inside the candidate directory
    IndexGlob,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::ExactFile, Strategy::ExtensionGlob, Strategy::IndexGlob];

    pub fn apply(self, candidate: &Path) -> Option<PathBuf> {
        match self {
            Strategy::ExactFile => candidate.is_file().then(|| candidate.to_path_buf()),
            Strategy::ExtensionGlob => {
                let name = candidate.file_name()?.to_str()?;
                let parent = candidate.parent()?;
                first_glob_match(parent, &format!("{}.*", name))
            }
            Strategy::IndexGlob => {
                if candidate.is_dir() {
                    first_glob_match(candidate, "index.*")
                } else {
                    None
                }
            }
        }
    }
}

/// Run every strategy against `candidate`, first hit wins
pub fn probe(candidate: &Path) -> Option<PathBuf> {
    Strategy::ALL
        .iter()
        .find_map(|strategy| strategy.apply(candidate))
}

/// Shortest file name in `dir` matching `pattern`, so `util.ts` is preferred
/// over `util.test.ts`
fn first_glob_match(dir: &Path, pattern: &str) -> Option<PathBuf> {
    let matcher = match Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher(),
        Err(e) => {
            debug!("Unusable glob {}: {}", pattern, e);
            return None;
        }
    };

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && matcher.is_match(entry.file_name()))
        .min_by_key(|entry| entry.file_name().len())
        .map(|entry| entry.into_path())
}

/// Ordered redirection rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RedirectRules(Vec<RedirectRule>);

impl RedirectRules {
    pub fn new(rules: Vec<RedirectRule>) -> Self {
        Self(rules)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RedirectRule> {
        self.0.iter()
    }

    /// Redirect a single import specifier
    pub fn redirect(&self, import: &str) -> Redirect {
        for rule in &self.0 {
            let Some(rest) = rule.remainder(import) else {
                continue;
            };

            if let Some(found) = probe(&rule.dir.join(rest)) {
                debug!("Redirected {} -> {}", import, found.display());
                return Redirect::Resolved(found);
            }
        }

        Redirect::PassThrough
    }

    /// Walk the import graph reachable from `entry` and collect an alias for
    /// every specifier a rule redirects.
    ///
    /// Relative imports are followed; bare imports are only followed when a
    /// rule redirected them. Unreadable files are skipped.
    pub fn collect_aliases(&self, entry: &Path) -> AliasTable {
        let mut aliases = AliasTable::new();
        if self.is_empty() {
            return aliases;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([entry.to_path_buf()]);

        while let Some(file) = queue.pop_front() {
            if !visited.insert(file.clone()) || !imports::is_script(&file) {
                continue;
            }

            let source = match fs::read_to_string(&file) {
                Ok(source) => source,
                Err(e) => {
                    debug!("Skipping {}: {}", file.display(), e);
                    continue;
                }
            };

            let base_dir = file.parent().unwrap_or(Path::new("."));

            for specifier in imports::extract_specifiers(&source) {
                if specifier.starts_with('.') || specifier.starts_with('/') {
                    if let Some(found) = probe(&base_dir.join(&specifier)) {
                        queue.push_back(found);
                    }
                    continue;
                }

                if aliases.contains_key(&specifier) {
                    continue;
                }

                if let Redirect::Resolved(found) = self.redirect(&specifier) {
                    queue.push_back(found.clone());
                    aliases.insert(specifier, found);
                }
            }
        }

        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        write(
            root,
            "src/index.ts",
            r#"
                import { log } from "@lib/log";
                import db from '@lib/db';
                import missing from "@lib/missing";
                import express from "express";
                import { local } from "./local";
                const data = require("@lib/data.json");
            "#,
        );
        write(root, "src/local.ts", "export * from \"@lib/util\";");
        write(root, "lib/log.ts", "export const log = console.log;");
        write(root, "lib/log.test.ts", "");
        write(root, "lib/db/index.js", "export default {};");
        write(root, "lib/util.ts", "export const local = 1;");
        write(root, "lib/data.json", "{}");

        dir
    }

    fn rules(root: &Path) -> RedirectRules {
        RedirectRules::new(vec![RedirectRule::new("@lib", root.join("lib"))])
    }

    #[test]
    fn test_parse_rule() {
        let rule = RedirectRule::parse("@lib=lib", Path::new("/app")).unwrap();
        assert_eq!(rule, RedirectRule::new("@lib", "/app/lib"));

        assert!(RedirectRule::parse("@lib", Path::new("/app")).is_err());
        assert!(RedirectRule::parse("=lib", Path::new("/app")).is_err());
        assert!(RedirectRule::parse("@lib=", Path::new("/app")).is_err());
    }

    #[test]
    fn test_prefix_must_end_at_segment() {
        let rule = RedirectRule::new("@lib", "/app/lib");
        assert_eq!(rule.remainder("@lib/log"), Some("log"));
        assert_eq!(rule.remainder("@lib"), Some(""));
        assert_eq!(rule.remainder("@library/log"), None);

        let rule = RedirectRule::new("~/", "/app/src");
        assert_eq!(rule.remainder("~/utils"), Some("utils"));
    }

    #[test]
    fn test_strategies_in_order() {
        let dir = fixture();
        let lib = dir.path().join("lib");

        assert_eq!(Strategy::ExactFile.apply(&lib.join("data.json")), Some(lib.join("data.json")));
        assert_eq!(Strategy::ExactFile.apply(&lib.join("log")), None);
        assert_eq!(Strategy::ExtensionGlob.apply(&lib.join("log")), Some(lib.join("log.ts")));
        assert_eq!(Strategy::IndexGlob.apply(&lib.join("db")), Some(lib.join("db/index.js")));
        assert_eq!(Strategy::IndexGlob.apply(&lib.join("log")), None);
    }

    #[test]
    fn test_redirect_pass_through() {
        let dir = fixture();
        let rules = rules(dir.path());

        assert_eq!(rules.redirect("@lib/missing"), Redirect::PassThrough);
        assert_eq!(rules.redirect("express"), Redirect::PassThrough);
        assert_eq!(
            rules.redirect("@lib/util"),
            Redirect::Resolved(dir.path().join("lib/util.ts"))
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let dir = fixture();
        write(dir.path(), "vendor/log.js", "");

        let rules = RedirectRules::new(vec![
            RedirectRule::new("@lib", dir.path().join("nowhere")),
            RedirectRule::new("@lib", dir.path().join("vendor")),
            RedirectRule::new("@lib", dir.path().join("lib")),
        ]);

        assert_eq!(
            rules.redirect("@lib/log"),
            Redirect::Resolved(dir.path().join("vendor/log.js"))
        );
    }

    #[test]
    fn test_collect_aliases_follows_imports() {
        let dir = fixture();
        let root = dir.path();

        let aliases = rules(root).collect_aliases(&root.join("src/index.ts"));

        let expected = AliasTable::from([
            ("@lib/data.json".to_string(), root.join("lib/data.json")),
            ("@lib/db".to_string(), root.join("lib/db/index.js")),
            ("@lib/log".to_string(), root.join("lib/log.ts")),
            ("@lib/util".to_string(), root.join("lib/util.ts")),
        ]);
        assert_eq!(aliases, expected);
    }

    #[test]
    fn test_collect_aliases_without_rules() {
        let dir = fixture();
        let aliases = RedirectRules::default().collect_aliases(&dir.path().join("src/index.ts"));

        assert!(aliases.is_empty());
    }
}
