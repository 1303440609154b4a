//! Host pattern matching for allow/block lists.
//!
//! Patterns are either literal hostnames (`api.example.com`, `127.0.0.1`)
//! or wildcard patterns where `*` matches any run of characters
//! (`*.example.com`, `10.0.*`). Matching is case-insensitive, since DNS
//! names are. Note that `*.example.com` matches `api.example.com` and
//! `x.y.example.com` but not `example.com` itself: the dot is part of the
//! required suffix.

/// A compiled host pattern from an allow or block list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern {
    raw: String,
    kind: PatternKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    /// No wildcards: exact (case-insensitive) hostname.
    Exact(String),
    /// Literal segments between `*` wildcards, in order. Empty segments
    /// mark a leading/trailing `*`.
    Glob(Vec<String>),
}

impl HostPattern {
    /// Compile a pattern. Never fails: any string is a valid pattern,
    /// it just may not match anything useful.
    pub fn parse(pattern: &str) -> Self {
        let lowered = pattern.to_ascii_lowercase();
        let kind = if lowered.contains('*') {
            PatternKind::Glob(lowered.split('*').map(str::to_string).collect())
        } else {
            PatternKind::Exact(lowered)
        };
        Self {
            raw: pattern.to_string(),
            kind,
        }
    }

    /// The pattern text as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check whether `host` matches this pattern.
    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        match &self.kind {
            PatternKind::Exact(exact) => *exact == host,
            PatternKind::Glob(parts) => glob_match(parts, &host),
        }
    }
}

/// Segment-wise glob match: the first literal part anchors at the start,
/// the last at the end, middle parts match in order anywhere between.
fn glob_match(parts: &[String], name: &str) -> bool {
    // A pattern of only `*`s matches everything.
    if parts.iter().all(|p| p.is_empty()) {
        return true;
    }

    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }

        if i == 0 {
            if !name.starts_with(part.as_str()) {
                return false;
            }
            pos = part.len();
        } else if i == parts.len() - 1 {
            return name.len() >= pos + part.len() && name[pos..].ends_with(part.as_str());
        } else {
            match name[pos..].find(part.as_str()) {
                Some(idx) => pos += idx + part.len(),
                None => return false,
            }
        }
    }
    true
}

/// One-shot convenience for uncompiled patterns.
pub fn host_matches(pattern: &str, host: &str) -> bool {
    HostPattern::parse(pattern).matches(host)
}

/// Find the first pattern in `patterns` matching `host`, returning the
/// pattern text. Order is the configuration order.
pub fn first_match<'a>(patterns: &'a [HostPattern], host: &str) -> Option<&'a str> {
    patterns
        .iter()
        .find(|p| p.matches(host))
        .map(HostPattern::as_str)
}
