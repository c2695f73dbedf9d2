//! Module specifications: declarative queries for one or more modules.
//!
//! A specification is tagged with a repository technology and carries a union
//! of coordinate clauses. Each clause is a `(group, name, version)` triple of
//! glob patterns, so a single specification may match many identifiers.

use globset::Glob;

use hoist_util::errors::HoistError;

use crate::identifier::Identifier;

/// A single coordinate pattern within a specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl Clause {
    /// Whether this clause matches the identifier's coordinates.
    pub fn matches(&self, id: &Identifier) -> bool {
        glob_match(&self.group, &id.group)
            && glob_match(&self.name, &id.name)
            && glob_match(&self.version, id.version.as_str())
    }

    /// Pin this clause to the identifier's exact coordinates.
    fn pin_to(&mut self, id: &Identifier) {
        self.group = id.group.clone();
        self.name = id.name.clone();
        self.version = id.version.as_str().to_owned();
    }
}

/// A declarative query for one or more modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specification {
    /// Repository technology this specification targets. Empty matches any.
    pub technology: String,
    /// Union of coordinate clauses; a specification matches when any clause
    /// does. Never empty.
    pub clauses: Vec<Clause>,
}

impl Specification {
    /// A specification with a single exact-coordinate clause.
    pub fn exact(technology: &str, group: &str, name: &str, version: &str) -> Self {
        Self {
            technology: technology.to_owned(),
            clauses: vec![Clause {
                group: group.to_owned(),
                name: name.to_owned(),
                version: version.to_owned(),
            }],
        }
    }

    /// Parse a `group:name[:version]` pattern string; a missing version means
    /// any version.
    ///
    /// # Errors
    /// Returns a configuration error when group or name is missing.
    pub fn parse(technology: &str, pattern: &str) -> Result<Self, HoistError> {
        let mut parts = pattern.splitn(3, ':');
        let group = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or("*");
        if group.is_empty() || name.is_empty() {
            return Err(HoistError::Config {
                message: format!("invalid module pattern `{pattern}`: expected group:name[:version]"),
            });
        }
        Ok(Self::exact(technology, group, name, version))
    }

    /// Whether this specification allows the given identifier.
    pub fn allows(&self, id: &Identifier) -> bool {
        self.clauses.iter().any(|c| c.matches(id))
    }

    /// Add another specification's clauses to this one (union).
    pub fn union(&mut self, other: &Specification) {
        for clause in &other.clauses {
            if !self.clauses.contains(clause) {
                self.clauses.push(clause.clone());
            }
        }
    }

    /// Rewrite every clause that matched `old` to pin `new`'s exact
    /// coordinates. Used to propagate post-resolution identity changes.
    pub fn rewrite(&mut self, old: &Identifier, new: &Identifier) {
        for clause in &mut self.clauses {
            if clause.matches(old) {
                clause.pin_to(new);
            }
        }
        self.clauses.dedup();
    }
}

impl std::fmt::Display for Specification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for c in &self.clauses {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{}:{}:{}", c.group, c.name, c.version)?;
            first = false;
        }
        Ok(())
    }
}

/// Glob-match `text` against `pattern`. An empty or `*` pattern matches
/// anything; a pattern that fails to compile falls back to literal equality.
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern.is_empty() || pattern == "*" {
        return true;
    }
    match Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(text),
        Err(_) => pattern == text,
    }
}
