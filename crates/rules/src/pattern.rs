//! `*` wildcard matching.
//!
//! A pattern without `*` must equal the value exactly. Each `*` matches any
//! run of characters, including none; consecutive stars act as one. There
//! is no escape syntax and no `?`.

/// Match `value` against a single wildcard `pattern`.
///
/// Two-pointer scan. On `*` the scan records a resume point; when a later
/// literal fails, it backtracks to the most recent star and lets it absorb
/// one more character. Retrying only the latest star is sufficient because
/// any earlier star can be re-expressed by the later one.
pub fn matches(value: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return value == pattern;
    }

    // Byte-wise comparison is sound for UTF-8: literals can only align on
    // character boundaries.
    let p = pattern.as_bytes();
    let v = value.as_bytes();

    let mut p_idx = 0;
    let mut v_idx = 0;
    // (pattern index just past the star, value index the star currently ends at)
    let mut backtrack: Option<(usize, usize)> = None;

    while v_idx < v.len() {
        match p.get(p_idx).copied() {
            Some(b'*') => {
                while p.get(p_idx).copied() == Some(b'*') {
                    p_idx += 1;
                }
                backtrack = Some((p_idx, v_idx));
            }
            Some(c) if c == v[v_idx] => {
                p_idx += 1;
                v_idx += 1;
            }
            _ => match backtrack {
                Some((star_p, star_v)) => {
                    p_idx = star_p;
                    v_idx = star_v + 1;
                    backtrack = Some((star_p, star_v + 1));
                }
                None => return false,
            },
        }
    }

    // Input exhausted: only trailing stars may remain.
    p[p_idx..].iter().all(|&c| c == b'*')
}

/// True iff `patterns` is non-empty and any element matches `value`.
pub fn matches_any<S: AsRef<str>>(value: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| matches(value, p.as_ref()))
}

/// First pattern in `patterns` that matches `value`, verbatim.
pub fn first_match<'a, S: AsRef<str>>(value: &str, patterns: &'a [S]) -> Option<&'a str> {
    patterns
        .iter()
        .map(AsRef::as_ref)
        .find(|p| matches(value, p))
}
