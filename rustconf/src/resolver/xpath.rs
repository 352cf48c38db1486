//! The restricted XPath grammar and its canonical form.
//!
//! Two shapes are accepted. The strict form `(/name[key='literal'])+` can
//! be resolved without a schema. Anything using the wildcards `//` or `*`
//! is first canonicalized and then resolved against a schema skeleton
//! (build) or by unique-descendant search (prune).

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ResolveError;

/// One segment of a strict XPath: a name with an optional `[key='value']`
/// predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub predicate: Option<(String, String)>,
}

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^([\w.:-]+)(?:\[([\w.:-]+)=(?:'([^']*)'|"([^"]*)")\])?$"#).unwrap()
    })
}

/// Reject XPaths no operation can work with: empty, bare slashes, or a
/// union (`|`) in a build context.
pub fn validate_for_build(xpath: &str) -> Result<(), ResolveError> {
    if xpath.is_empty() || xpath == "/" || xpath == "//" {
        return Err(ResolveError::InvalidXPath(format!(
            "'{}' does not address a node",
            xpath
        )));
    }
    if xpath.contains('|') {
        return Err(ResolveError::InvalidXPath(
            "union expressions are not supported".to_string(),
        ));
    }
    Ok(())
}

/// Whether the strict grammar applies at all (no wildcards anywhere).
pub fn is_strict_candidate(xpath: &str) -> bool {
    !xpath.contains("//") && !xpath.contains('*')
}

/// Parse a strict XPath into segments, or `None` when any segment falls
/// outside the grammar (the caller then falls back to schema resolution).
pub fn parse_strict(xpath: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    for part in xpath.split('/').filter(|s| !s.is_empty()) {
        let caps = segment_regex().captures(part)?;
        let predicate = caps.get(2).map(|key| {
            let literal = caps
                .get(3)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (key.as_str().to_string(), literal.to_string())
        });
        segments.push(Segment {
            name: caps[1].to_string(),
            predicate,
        });
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments)
}

/// Canonicalize a wildcard XPath: `//` becomes `/*/`, runs of `*/*`
/// collapse to `*`, the leading `/` is stripped, and bracket predicates
/// are erased innermost-first.
pub fn canonicalize(xpath: &str) -> String {
    let mut path = xpath.replace("//", "/*/");

    while path.contains("*/*") {
        path = path.replace("*/*", "*");
    }
    if let Some(stripped) = path.strip_prefix('/') {
        path = stripped.to_string();
    }

    // Repeatedly erase the innermost bracket pair.
    let bracket = innermost_bracket_regex();
    loop {
        let next = bracket.replace_all(&path, "").into_owned();
        if next == path {
            break;
        }
        path = next;
    }
    path
}

fn innermost_bracket_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\[\]]*\]").unwrap())
}

/// Canonical segments of a wildcard XPath, empty segments discarded.
pub fn canonical_segments(xpath: &str) -> Vec<String> {
    canonicalize(xpath)
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
