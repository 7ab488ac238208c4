//! Glob matching for tool and model patterns.
//!
//! Patterns support `*` wildcards (`bash:*`, `*_execute`, `gpt-*-mini`).
//! When several patterns match a name, the most specific one decides:
//! an exact pattern beats any wildcard, and among wildcards the one with
//! more literal characters wins. Equal specificity goes to the later entry.

use super::capability::PatternMap;

/// Check whether `text` matches a `*`-glob `pattern`.
pub fn pattern_matches(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return pattern == text;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let last = parts.len() - 1;
    let mut pos = 0;

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !text.starts_with(part) {
                return false;
            }
            pos = part.len();
        } else if i == last {
            // Anchored at the end; must not overlap what was already consumed.
            return text.len() >= pos + part.len() && text.ends_with(part);
        } else {
            match text[pos..].find(part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }
    }

    true
}

/// Specificity rank of a pattern. Exact patterns outrank every wildcard.
pub fn specificity(pattern: &str) -> usize {
    if pattern.contains('*') {
        pattern.chars().filter(|c| *c != '*').count()
    } else {
        usize::MAX
    }
}

/// Verdict of the most specific pattern in `map` matching `name`.
pub fn lookup(map: &PatternMap, name: &str) -> Option<bool> {
    map.iter()
        .filter(|(pattern, _)| pattern_matches(pattern, name))
        .max_by_key(|(pattern, _)| specificity(pattern))
        .map(|(_, allowed)| *allowed)
}
