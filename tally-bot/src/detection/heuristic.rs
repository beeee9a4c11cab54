//! Match strategies deciding whether a token counts toward a target.

use std::collections::HashSet;
use std::path::Path;

/// Remainders that turn a target prefix into an unrelated real word.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "ht", "eria", "hness", "ella", "gled", "hed", "ra", "hty", "iri", "ras", "re", "garded",
];

const VOWELS: &[u8] = b"aeiou";

/// Pure classifier for (token, target) pairs.
///
/// Both arguments are expected to be normalized already (lower-case a-z).
pub trait MatchStrategy: Send + Sync {
    fn should_count(&self, token: &str, target: &str) -> bool;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Prefix match with two layers of false-positive suppression: an exact
/// remainder denylist, then rejection of remainders starting with a vowel.
#[derive(Debug, Clone)]
pub struct SuffixHeuristic {
    denylist: HashSet<String>,
}

impl SuffixHeuristic {
    pub fn new<I, S>(denylist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denylist: denylist.into_iter().map(Into::into).collect(),
        }
    }

    /// Built-in denylist plus any extra remainders.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut heuristic = Self::default();
        heuristic.denylist.extend(extra.into_iter().map(Into::into));
        heuristic
    }

    pub fn is_denylisted(&self, remainder: &str) -> bool {
        self.denylist.contains(remainder)
    }
}

impl Default for SuffixHeuristic {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST.iter().copied())
    }
}

impl MatchStrategy for SuffixHeuristic {
    fn should_count(&self, token: &str, target: &str) -> bool {
        if token.is_empty() || target.is_empty() {
            return false;
        }

        let Some(remainder) = token.strip_prefix(target) else {
            return false;
        };

        if remainder.is_empty() {
            return true;
        }

        if self.is_denylisted(remainder) {
            return false;
        }

        // Vowel-initial remainders usually start a new syllable of a real word
        !VOWELS.contains(&remainder.as_bytes()[0])
    }

    fn name(&self) -> &'static str {
        "suffix"
    }
}

/// Counts a token when it contains the target anywhere and the whole token
/// is not a known dictionary word.
#[derive(Debug, Clone, Default)]
pub struct DictionaryContainment {
    dictionary: HashSet<String>,
}

impl DictionaryContainment {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dictionary: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a newline-separated word list. Entries are trimmed and lower-cased.
    pub fn from_word_list(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read dictionary {}: {}", path.display(), e))?;

        let dictionary: HashSet<String> = raw
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();

        if dictionary.is_empty() {
            return Err(format!("Dictionary {} contains no words", path.display()));
        }

        log::info!(
            "[DETECTION] Loaded {} dictionary words from {}",
            dictionary.len(),
            path.display()
        );
        Ok(Self { dictionary })
    }

    pub fn len(&self) -> usize {
        self.dictionary.len()
    }
}

impl MatchStrategy for DictionaryContainment {
    fn should_count(&self, token: &str, target: &str) -> bool {
        if token.is_empty() || target.is_empty() {
            return false;
        }
        token.contains(target) && !self.dictionary.contains(token)
    }

    fn name(&self) -> &'static str {
        "dictionary"
    }
}
