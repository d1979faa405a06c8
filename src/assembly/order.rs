//! Natural ordering of artifact file names
//!
//! Artifacts carry their page number only in the file name, so restoring page
//! order means comparing embedded integers by value: `page_2` sorts before
//! `page_10`.

use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn chunk_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+|\D+").expect("static pattern"))
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk<'a> {
    // Digits compare before text, then by value, then by width so that
    // "01" and "1" still have a stable order.
    Number { value: u128, width: usize },
    Text(&'a str),
}

fn chunks(name: &str) -> impl Iterator<Item = Chunk<'_>> {
    chunk_pattern().find_iter(name).map(|m| {
        let s = m.as_str();
        if s.as_bytes()[0].is_ascii_digit() {
            let trimmed = s.trim_start_matches('0');
            match trimmed.parse::<u128>() {
                Ok(value) => Chunk::Number {
                    value,
                    width: s.len(),
                },
                // Empty after trimming means all zeros; overflow falls back to text.
                Err(_) if trimmed.is_empty() => Chunk::Number {
                    value: 0,
                    width: s.len(),
                },
                Err(_) => Chunk::Text(s),
            }
        } else {
            Chunk::Text(s)
        }
    })
}

/// Compare two names, treating digit runs as numbers
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    chunks(a).cmp(chunks(b))
}

/// Sort paths by file name in natural order
pub fn sort_naturally(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
}

fn file_name(path: &Path) -> std::borrow::Cow<'_, str> {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default()
}
