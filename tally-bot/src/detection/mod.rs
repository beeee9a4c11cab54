//! Token detection: tokenizer, match strategies and the configured target set.

pub mod heuristic;
pub mod tokenizer;

pub use heuristic::{DictionaryContainment, MatchStrategy, SuffixHeuristic};
pub use tokenizer::tokenize;

use std::sync::Arc;

/// Ordered, de-duplicated list of lower-case targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    targets: Vec<String>,
}

impl TargetSet {
    /// Parse a comma-separated list. Entries are trimmed and lower-cased;
    /// empty entries and repeats are dropped, first occurrence wins.
    pub fn parse(raw: &str) -> Self {
        let mut targets: Vec<String> = Vec::new();
        for entry in raw.split(',') {
            let target = entry.trim().to_lowercase();
            if !target.is_empty() && !targets.contains(&target) {
                targets.push(target);
            }
        }
        Self { targets }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.targets.iter().any(|t| t == target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }
}

/// Tokenizer plus strategy over a fixed target set.
#[derive(Clone)]
pub struct Detector {
    targets: Arc<TargetSet>,
    strategy: Arc<dyn MatchStrategy>,
}

impl Detector {
    pub fn new(targets: TargetSet, strategy: Arc<dyn MatchStrategy>) -> Self {
        Self {
            targets: Arc::new(targets),
            strategy,
        }
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// One entry per qualifying (token, target) pair, in token order.
    pub fn scan(&self, text: &str) -> Vec<String> {
        let mut hits = Vec::new();
        for token in tokenize(text) {
            for target in self.targets.iter() {
                if self.strategy.should_count(&token, target) {
                    log::debug!("[DETECTION] Counted: {} (matches {})", token, target);
                    hits.push(target.to_string());
                }
            }
        }
        hits
    }
}
