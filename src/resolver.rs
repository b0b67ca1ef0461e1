//! Path resolution module
//!
//! Pure lookups over the archive snapshot: suffix (extension) scans, fuzzy
//! substring matching for asset references, and file-name extraction from
//! URL-shaped strings. None of these mutate the snapshot, so they can run
//! against a shared archive from any number of concurrent readers.

use indexmap::IndexMap;
use log::warn;

use crate::{error::FolioError, types::Entry};

/// Returns every file entry whose path ends with the given suffix
///
/// Matching entries are returned in archive-enumeration order; directory
/// entries never match. No match yields an empty vector, not an error.
pub fn find_by_extension<'a>(
    entries: &'a IndexMap<String, Entry>,
    suffix: &str,
) -> Vec<&'a Entry> {
    entries
        .values()
        .filter(|entry| !entry.is_directory && entry.path.ends_with(suffix))
        .collect()
}

/// Returns the first file entry whose path contains the given fragment
///
/// Substring matching is a deliberate heuristic: page references rarely use
/// the exact archive path, so the first entry containing the fragment wins.
/// When several entries contain the fragment the match is ambiguous; the
/// first one in enumeration order is returned and a warning names the choice.
///
/// ## Parameters
/// - `entries`: The archive snapshot to search
/// - `fragment`: Substring to look for, typically a file name or a path tail
///
/// ## Return
/// - `Some(&Entry)`: The first matching file entry in enumeration order
/// - `None`: No entry contains the fragment
pub fn find_by_path_fragment<'a>(
    entries: &'a IndexMap<String, Entry>,
    fragment: &str,
) -> Option<&'a Entry> {
    let mut matches = entries
        .values()
        .filter(|entry| !entry.is_directory && entry.path.contains(fragment));

    let first = matches.next()?;
    if let Some(second) = matches.next() {
        warn!(
            "Ambiguous fragment \"{}\": picked \"{}\" over \"{}\"",
            fragment, first.path, second.path
        );
    }

    Some(first)
}

/// Extracts the file name from a URL-shaped string
///
/// The input must carry a `scheme://` prefix; anything else, including bare
/// relative paths, is rejected. Query and fragment suffixes are stripped and
/// the final path segment is percent-decoded.
///
/// ## Parameters
/// - `url`: The reference to parse, e.g. `http://host/images/pic%201.png`
///
/// ## Return
/// - `Ok(String)`: The decoded final path segment, e.g. `pic 1.png`
/// - `Err(FolioError)`: The input is not a syntactically valid URL
pub fn extract_file_name(url: &str) -> Result<String, FolioError> {
    let malformed = || FolioError::MalformedUrl {
        url: url.to_string(),
    };

    let (scheme, remainder) = url.split_once("://").ok_or_else(malformed)?;
    let mut scheme_chars = scheme.chars();
    let valid_scheme = scheme_chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme_chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme || remainder.is_empty() {
        return Err(malformed());
    }

    let path = remainder
        .split(['?', '#'])
        .next()
        .unwrap_or(remainder);
    let segment = path.rsplit('/').next().unwrap_or(path);

    let decoded = urlencoding::decode(segment)
        .map(|segment| segment.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(paths: &[(&str, bool)]) -> IndexMap<String, Entry> {
        paths
            .iter()
            .map(|(path, is_directory)| {
                (
                    path.to_string(),
                    Entry {
                        path: path.to_string(),
                        is_directory: *is_directory,
                    },
                )
            })
            .collect()
    }

    /// Extension matches keep enumeration order and skip directories
    #[test]
    fn test_find_by_extension() {
        let entries = snapshot(&[
            ("OEBPS/", true),
            ("OEBPS/ch2.html", false),
            ("OEBPS/ch1.html", false),
            ("OEBPS/nav.xhtml", false),
        ]);

        let matched = find_by_extension(&entries, ".html");
        let paths: Vec<&str> = matched.iter().map(|entry| entry.path.as_str()).collect();
        assert_eq!(paths, vec!["OEBPS/ch2.html", "OEBPS/ch1.html"]);
    }

    /// The `.html` suffix must not swallow `.xhtml` entries
    #[test]
    fn test_find_by_extension_xhtml_disjoint() {
        let entries = snapshot(&[("a.xhtml", false), ("b.html", false)]);

        let html = find_by_extension(&entries, ".html");
        assert_eq!(html.len(), 1);
        assert_eq!(html[0].path, "b.html");
    }

    /// No matching entries yields an empty vector
    #[test]
    fn test_find_by_extension_empty() {
        let entries = snapshot(&[("book.opf", false)]);
        assert!(find_by_extension(&entries, ".css").is_empty());
    }

    /// The first entry containing the fragment wins
    #[test]
    fn test_find_by_path_fragment() {
        let entries = snapshot(&[
            ("OEBPS/images/cover.jpg", false),
            ("OEBPS/backup/cover.jpg", false),
        ]);

        let matched = find_by_path_fragment(&entries, "cover.jpg").unwrap();
        assert_eq!(matched.path, "OEBPS/images/cover.jpg");

        assert!(find_by_path_fragment(&entries, "missing.png").is_none());
    }

    /// Directory entries never resolve a fragment
    #[test]
    fn test_find_by_path_fragment_skips_directories() {
        let entries = snapshot(&[("images/", true), ("images/pic.png", false)]);

        let matched = find_by_path_fragment(&entries, "images").unwrap();
        assert_eq!(matched.path, "images/pic.png");
    }

    /// File names come from the final URL path segment
    #[test]
    fn test_extract_file_name() {
        assert_eq!(
            extract_file_name("http://x/img1.png").unwrap(),
            "img1.png".to_string()
        );
        assert_eq!(
            extract_file_name("https://host/a/b/pic.jpg?w=100#top").unwrap(),
            "pic.jpg".to_string()
        );
        assert_eq!(
            extract_file_name("file://local/pic%201.png").unwrap(),
            "pic 1.png".to_string()
        );
    }

    /// Inputs without a scheme are malformed
    #[test]
    fn test_extract_file_name_malformed() {
        for url in ["images/pic.png", "", "://host/pic.png", "1a://host/p.png"] {
            let result = extract_file_name(url);
            assert_eq!(
                result.unwrap_err(),
                FolioError::MalformedUrl {
                    url: url.to_string()
                }
            );
        }
    }
}
