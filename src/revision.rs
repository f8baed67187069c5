//! Revisioned file names
//!
//! A revisioned name decorates the base name of a relative path with a
//! `[tag<N>]` prefix: `docs/report.pdf` becomes `docs/[rem0]report.pdf`,
//! and `docs/[rem0]report.pdf` becomes `docs/[rem1]report.pdf`. Directory
//! components are never touched.

use std::collections::HashSet;

/// Tag used for remote content preserved by a push
pub const REMOTE_TAG: &str = "rem";

/// Tag used for local content preserved by a pull
pub const LOCAL_TAG: &str = "loc";

/// Match `[<tag><digits>]<name>` against a base name, returning (digits, name)
///
/// The tag is compared literally and only ASCII digits form a counter.
/// A prefix with nothing after it is not a revision.
fn parse_revision<'a>(base: &'a str, tag: &str) -> Option<(&'a str, &'a str)> {
    let rest = base.strip_prefix('[')?.strip_prefix(tag)?;
    let len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return None;
    }
    let (digits, rest) = rest.split_at(len);
    match rest.strip_prefix(']') {
        Some(name) if !name.is_empty() => Some((digits, name)),
        _ => None,
    }
}

/// Split a `/`-separated relative path into (parent with trailing slash, base name)
fn split_base(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    }
}

/// Add one to an ASCII decimal digit string of any length
fn increment_decimal(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    let mut out: Vec<u8> = trimmed.bytes().collect();
    let mut i = out.len();
    loop {
        if i == 0 {
            out.insert(0, b'1');
            break;
        }
        i -= 1;
        if out[i] == b'9' {
            out[i] = b'0';
        } else {
            out[i] += 1;
            break;
        }
    }
    out.into_iter().map(char::from).collect()
}

/// Compute the next revisioned name for `path` under `tag`
///
/// ```
/// use bucket_sync::revision::next_revision;
///
/// assert_eq!(next_revision("filename.ext", "rev"), "[rev0]filename.ext");
/// assert_eq!(next_revision("[rev9]filename.ext", "rev"), "[rev10]filename.ext");
/// assert_eq!(
///     next_revision("subfolder/[rev9]filename.ext", "rev"),
///     "subfolder/[rev10]filename.ext"
/// );
/// ```
pub fn next_revision(path: &str, tag: &str) -> String {
    let (parent, base) = split_base(path);

    match parse_revision(base, tag) {
        Some((digits, name)) => {
            format!("{}[{}{}]{}", parent, tag, increment_decimal(digits), name)
        }
        None => format!("{}[{}0]{}", parent, tag, base),
    }
}

/// Whether the base name of `path` already carries a `[tag<N>]` prefix
pub fn is_revision(path: &str, tag: &str) -> bool {
    let (_, base) = split_base(path);
    parse_revision(base, tag).is_some()
}

/// Apply [`next_revision`] until the result is neither taken by `exists`
/// nor already in `claimed`, then record it in `claimed`
pub fn next_free_revision<F>(
    path: &str,
    tag: &str,
    claimed: &mut HashSet<String>,
    mut exists: F,
) -> String
where
    F: FnMut(&str) -> bool,
{
    let mut candidate = next_revision(path, tag);
    while claimed.contains(&candidate) || exists(&candidate) {
        candidate = next_revision(&candidate, tag);
    }
    claimed.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_revision() {
        assert_eq!(next_revision("filename.ext", "rev"), "[rev0]filename.ext");
    }

    #[test]
    fn test_update_revision() {
        assert_eq!(next_revision("[rev9]filename.ext", "rev"), "[rev10]filename.ext");
        assert_eq!(next_revision("[rev007]a", "rev"), "[rev8]a");
    }

    #[test]
    fn test_subfolder_revision() {
        assert_eq!(
            next_revision("subfolder/[rev9]filename.ext", "rev"),
            "subfolder/[rev10]filename.ext"
        );
    }

    #[test]
    fn test_directory_lookalike_untouched() {
        assert_eq!(next_revision("[rev3]dir/file", "rev"), "[rev3]dir/[rev0]file");
    }

    #[test]
    fn test_foreign_tag_concatenates() {
        assert_eq!(next_revision("[rem3]x.txt", "loc"), "[loc0][rem3]x.txt");
        assert_eq!(next_revision("[loc0][rem3]x.txt", "loc"), "[loc1][rem3]x.txt");
    }

    #[test]
    fn test_metacharacter_tag_escaped() {
        assert_eq!(next_revision("a.txt", "r.+"), "[r.+0]a.txt");
        assert_eq!(next_revision("[r.+0]a.txt", "r.+"), "[r.+1]a.txt");
        // Unescaped, `r.+` would also match `rxx`
        assert_eq!(next_revision("[rxx4]a.txt", "r.+"), "[r.+0][rxx4]a.txt");
    }

    #[test]
    fn test_prefix_without_name_is_not_a_revision() {
        assert_eq!(next_revision("[rev1]", "rev"), "[rev0][rev1]");
        assert!(!is_revision("[rev1]", "rev"));
    }

    #[test]
    fn test_huge_counter_does_not_overflow() {
        let name = format!("[rev{}]f", "9".repeat(40));
        let expected = format!("[rev1{}]f", "0".repeat(40));
        assert_eq!(next_revision(&name, "rev"), expected);
    }

    #[test]
    fn test_non_ascii_digits_are_not_a_counter() {
        assert_eq!(next_revision("[rev\u{669}]f", "rev"), "[rev0][rev\u{669}]f");
        assert_eq!(next_revision("[rev\u{1D7FF}]f", "rev"), "[rev0][rev\u{1D7FF}]f");
        assert!(!is_revision("[rev\u{669}]f", "rev"));
    }

    #[test]
    fn test_long_tag() {
        let tag = "x".repeat(100_000);
        let first = next_revision("a.txt", &tag);
        assert_eq!(first, format!("[{}0]a.txt", tag));
        assert_eq!(next_revision(&first, &tag), format!("[{}1]a.txt", tag));
        assert!(is_revision(&first, &tag));
    }

    #[test]
    fn test_newline_in_name() {
        assert_eq!(next_revision("[rev2]a\nb", "rev"), "[rev3]a\nb");
    }

    #[test]
    fn test_is_revision() {
        assert!(is_revision("a/b/[rem0]c", REMOTE_TAG));
        assert!(!is_revision("[rem0]a/c", REMOTE_TAG));
        assert!(!is_revision("a/b/[loc0]c", REMOTE_TAG));
    }

    #[test]
    fn test_next_free_revision_skips_taken_names() {
        let existing: HashSet<&str> = ["[rem0]c", "[rem1]c"].into_iter().collect();
        let mut claimed = HashSet::new();

        let first = next_free_revision("c", REMOTE_TAG, &mut claimed, |n| existing.contains(n));
        assert_eq!(first, "[rem2]c");

        let second = next_free_revision("c", REMOTE_TAG, &mut claimed, |n| existing.contains(n));
        assert_eq!(second, "[rem3]c");
    }
}
