//! Chart version parsing and Helm-style version constraints
//!
//! Index files in the wild carry versions such as `v1.2.3` or `1.2`, so
//! parsing first tries strict semver and then coerces the first
//! `major[.minor[.patch]]` group found in the string.
//!
//! Constraints follow Helm's syntax:
//! - `a || b` alternatives
//! - `1.2 - 1.4.5` hyphen ranges
//! - comparators separated by commas or spaces
//! - a bare version means exactly that version

use once_cell::sync::Lazy;
use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version, VersionReq};

use crate::error::{RepoError, Result};

static COERCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z.-]+))?(?:\+([0-9A-Za-z.-]+))?")
        .expect("valid regex")
});

static HYPHEN_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\S+)\s+-\s+(\S+)").expect("valid regex"));

/// Parse a chart version, coercing loose forms
pub fn parse_version(version: &str) -> Option<Version> {
    let trimmed = version.trim();
    let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(stripped).ok().or_else(|| coerce(stripped))
}

fn coerce(version: &str) -> Option<Version> {
    let caps = COERCE.captures(version)?;
    let number = |i: usize| -> Option<u64> {
        caps.get(i)
            .map(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(Some(0))
    };

    let mut parsed = Version::new(number(1)?, number(2)?, number(3)?);
    if let Some(pre) = caps.get(4).and_then(|m| Prerelease::new(m.as_str()).ok()) {
        parsed.pre = pre;
    }
    if let Some(build) = caps.get(5).and_then(|m| BuildMetadata::new(m.as_str()).ok()) {
        parsed.build = build;
    }
    Some(parsed)
}

/// A parsed version constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    source: String,
    alternatives: Vec<VersionReq>,
}

impl VersionConstraint {
    pub fn parse(constraint: &str) -> Result<Self> {
        let invalid = |message: String| RepoError::InvalidConstraint {
            constraint: constraint.to_string(),
            message,
        };

        let mut alternatives = Vec::new();
        for alternative in constraint.split("||") {
            let normalized = normalize(alternative).map_err(invalid)?;
            let req = VersionReq::parse(&normalized)
                .map_err(|e| invalid(format!("{} (normalized to '{}')", e, normalized)))?;
            alternatives.push(req);
        }

        Ok(Self {
            source: constraint.to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Rewrite one `||` alternative into `semver` requirement syntax
fn normalize(alternative: &str) -> std::result::Result<String, String> {
    let expanded = HYPHEN_RANGE.replace_all(alternative.trim(), ">=$1 <=$2");

    // Operators may be separated from their version by spaces
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    for token in expanded.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        if token.chars().all(is_operator_char) {
            pending_op.push_str(token);
            continue;
        }
        let token = format!("{}{}", std::mem::take(&mut pending_op), token);
        comparators.push(normalize_comparator(&token)?);
    }
    if !pending_op.is_empty() {
        return Err(format!("operator '{}' without a version", pending_op));
    }

    if comparators.is_empty() {
        return Ok("*".to_string());
    }
    Ok(comparators.join(", "))
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '=' | '<' | '>' | '~' | '^' | '!')
}

fn normalize_comparator(token: &str) -> std::result::Result<String, String> {
    let split = token.find(|c: char| !is_operator_char(c)).unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = version.strip_prefix('v').unwrap_or(version);

    if op == "!=" {
        return Err("'!=' comparators are not supported".to_string());
    }

    let wildcard = version == "*"
        || version
            .split('.')
            .any(|part| matches!(part, "*" | "x" | "X"));
    let op = match op {
        "" if wildcard => "",
        "" => "=",
        // `~>` is an alias of `~`
        "~>" => "~",
        other => other,
    };
    Ok(format!("{}{}", op, version))
}
