//! Plain-text word lists: one entry per line, `#` starts a comment.
//!
//! The default tag list and the exclusion list ship in this format; the
//! engine itself only ever sees the resulting string vectors.

use std::fs;
use std::io;
use std::path::Path;

/// Load a word list from disk.
pub fn load_wordlist(path: &Path) -> io::Result<Vec<String>> {
    Ok(parse_wordlist(&fs::read_to_string(path)?))
}

/// Parse word-list text: strip comments, trim, drop empty lines.
pub fn parse_wordlist(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "# default tags\nbunker\n\namenity=hospital  # inline note\n   \nruins\n";
        assert_eq!(
            parse_wordlist(text),
            vec!["bunker", "amenity=hospital", "ruins"]
        );
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_wordlist("").is_empty());
        assert!(parse_wordlist("# only comments\n#more\n").is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "military=bunker\n# skip me\nhistoric").unwrap();
        let words = load_wordlist(file.path()).unwrap();
        assert_eq!(words, vec!["military=bunker", "historic"]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_wordlist(Path::new("/nonexistent/tags.txt")).is_err());
    }
}
