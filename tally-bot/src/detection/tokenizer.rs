//! Message text to normalized alphabetic tokens.

use std::str::SplitWhitespace;

/// Lazy token iterator over a message.
///
/// Each whitespace-delimited chunk is lower-cased and stripped of everything
/// except `a`-`z`; chunks that end up empty are skipped. Cloning the iterator
/// restarts from the same position.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    chunks: SplitWhitespace<'a>,
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for chunk in self.chunks.by_ref() {
            let token = normalize_chunk(chunk);
            if !token.is_empty() {
                return Some(token);
            }
        }
        None
    }
}

/// Tokenize raw message text.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens {
        chunks: text.split_whitespace(),
    }
}

fn normalize_chunk(chunk: &str) -> String {
    chunk
        .chars()
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> Vec<String> {
        tokenize(text).collect()
    }

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        assert_eq!(collect("Bruh, what a DAY!!"), vec!["bruh", "what", "a", "day"]);
    }

    #[test]
    fn test_drops_chunks_without_letters() {
        assert_eq!(collect("123 ... :) ok"), vec!["ok"]);
        assert!(collect("42 !!! ---").is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(collect("").is_empty());
        assert!(collect("   \t\n ").is_empty());
    }

    #[test]
    fn test_inner_punctuation_joins_letters() {
        assert_eq!(collect("don't b.r.u-h"), vec!["dont", "bruh"]);
    }

    #[test]
    fn test_non_ascii_letters_removed() {
        assert_eq!(collect("café naïve"), vec!["caf", "nave"]);
    }

    #[test]
    fn test_splits_on_any_whitespace_run() {
        assert_eq!(collect("a\t\tb\n\nc   d"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_tokenizing_is_idempotent() {
        let samples = [
            "Bruh what a day",
            "  brush...it OFF!! 123 ",
            "ÉCOLE l'été, x-y-z",
            "",
        ];
        for sample in samples {
            let first: Vec<String> = tokenize(sample).collect();
            let joined = first.join(" ");
            let second: Vec<String> = tokenize(&joined).collect();
            assert_eq!(first, second, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_clone_restarts() {
        let tokens = tokenize("one two three");
        let mut partial = tokens.clone();
        partial.next();
        assert_eq!(tokens.count(), 3);
        assert_eq!(partial.collect::<Vec<_>>(), vec!["two", "three"]);
    }
}
