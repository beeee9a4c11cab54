use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::backfill::{BackfillOptions, MAX_PAGE_SIZE};
use crate::detection::{DictionaryContainment, MatchStrategy, SuffixHeuristic, TargetSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyKind {
    Suffix,
    Dictionary,
}

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub targets: TargetSet,
    pub database_url: String,
    pub command_prefix: String,
    pub strategy: StrategyKind,
    pub extra_denylist: Vec<String>,
    pub dictionary_path: Option<PathBuf>,
    /// Empty means every guild the bot is in
    pub monitored_guilds: HashSet<u64>,
    pub backfill: BackfillOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = var("DISCORD_TOKEN")
            .or_else(|| var("TOKEN"))
            .ok_or("DISCORD_TOKEN must be set")?;

        let targets = TargetSet::parse(
            &var("TARGET_WORDS").or_else(|| var("TARGET_WORD")).unwrap_or_default(),
        );
        if targets.is_empty() {
            return Err("TARGET_WORDS must list at least one word".to_string());
        }

        let strategy = match var("MATCH_STRATEGY").as_deref().map(str::trim) {
            None | Some("suffix") => StrategyKind::Suffix,
            Some("dictionary") => StrategyKind::Dictionary,
            Some(other) => {
                return Err(format!(
                    "MATCH_STRATEGY must be 'suffix' or 'dictionary', got '{}'",
                    other
                ));
            }
        };

        let dictionary_path = var("DICTIONARY_PATH").map(|p| PathBuf::from(p.trim()));
        if strategy == StrategyKind::Dictionary && dictionary_path.is_none() {
            return Err("DICTIONARY_PATH must be set when MATCH_STRATEGY=dictionary".to_string());
        }

        let extra_denylist = var("EXTRA_DENYLIST")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let monitored_guilds = match var("MONITORED_GUILD_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u64>()
                        .map_err(|_| format!("MONITORED_GUILD_IDS has invalid id '{}'", s))
                })
                .collect::<Result<HashSet<u64>, String>>()?,
            None => HashSet::new(),
        };

        let defaults = BackfillOptions::default();
        let page_size: u64 = parse_number(&var, "BACKFILL_PAGE_SIZE", defaults.page_size as u64)?;
        let backfill = BackfillOptions {
            page_size: page_size.clamp(1, MAX_PAGE_SIZE as u64) as u8,
            max_pages: parse_number(&var, "BACKFILL_MAX_PAGES", defaults.max_pages)?.max(1),
            concurrency: parse_number(&var, "BACKFILL_CONCURRENCY", defaults.concurrency)?.max(1),
            fetch_retries: parse_number(&var, "BACKFILL_FETCH_RETRIES", defaults.fetch_retries)?,
            retry_base_delay: Duration::from_millis(parse_number(
                &var,
                "BACKFILL_RETRY_DELAY_MS",
                defaults.retry_base_delay.as_millis() as u64,
            )?),
        };

        Ok(Self {
            discord_token,
            targets,
            database_url: var("DATABASE_URL").unwrap_or_else(|| "./wordcount.db".to_string()),
            command_prefix: var("COMMAND_PREFIX")
                .map(|p| p.trim().to_string())
                .unwrap_or_else(|| "!".to_string()),
            strategy,
            extra_denylist,
            dictionary_path,
            monitored_guilds,
            backfill,
        })
    }

    /// Build the configured match strategy. Loads the dictionary from disk
    /// for the dictionary variant.
    pub fn build_strategy(&self) -> Result<Arc<dyn MatchStrategy>, String> {
        match self.strategy {
            StrategyKind::Suffix => Ok(Arc::new(SuffixHeuristic::with_extra(
                self.extra_denylist.iter().cloned(),
            ))),
            StrategyKind::Dictionary => {
                let path = self
                    .dictionary_path
                    .as_ref()
                    .ok_or("DICTIONARY_PATH must be set when MATCH_STRATEGY=dictionary")?;
                Ok(Arc::new(DictionaryContainment::from_word_list(path)?))
            }
        }
    }

    pub fn is_monitored_guild(&self, guild_id: u64) -> bool {
        self.monitored_guilds.is_empty() || self.monitored_guilds.contains(&guild_id)
    }
}

fn parse_number<T, F>(var: &F, key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a valid number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = load(&[("DISCORD_TOKEN", "abc"), ("TARGET_WORDS", "Bru, ok")]).unwrap();
        assert_eq!(config.targets.iter().collect::<Vec<_>>(), vec!["bru", "ok"]);
        assert_eq!(config.database_url, "./wordcount.db");
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.strategy, StrategyKind::Suffix);
        assert_eq!(config.backfill.page_size, 100);
        assert_eq!(config.backfill.concurrency, 1);
        assert!(config.is_monitored_guild(12345));
    }

    #[test]
    fn test_legacy_variable_names() {
        let config = load(&[("TOKEN", "abc"), ("TARGET_WORD", "bru")]).unwrap();
        assert_eq!(config.discord_token, "abc");
        assert!(config.targets.contains("bru"));
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let err = load(&[("TARGET_WORDS", "bru")]).err().unwrap();
        assert!(err.contains("DISCORD_TOKEN"));
    }

    #[test]
    fn test_missing_targets_is_fatal() {
        assert!(load(&[("DISCORD_TOKEN", "abc")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("TARGET_WORDS", " , ")]).is_err());
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("TARGET_WORDS", "bru"),
            ("BACKFILL_MAX_PAGES", "lots"),
        ])
        .err()
        .unwrap();
        assert!(err.contains("BACKFILL_MAX_PAGES"));
    }

    #[test]
    fn test_page_size_clamped() {
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("TARGET_WORDS", "bru"),
            ("BACKFILL_PAGE_SIZE", "500"),
        ])
        .unwrap();
        assert_eq!(config.backfill.page_size, 100);
    }

    #[test]
    fn test_monitored_guilds() {
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("TARGET_WORDS", "bru"),
            ("MONITORED_GUILD_IDS", "1, 2"),
        ])
        .unwrap();
        assert!(config.is_monitored_guild(2));
        assert!(!config.is_monitored_guild(3));

        assert!(load(&[
            ("DISCORD_TOKEN", "abc"),
            ("TARGET_WORDS", "bru"),
            ("MONITORED_GUILD_IDS", "1,x"),
        ])
        .is_err());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(load(&[
            ("DISCORD_TOKEN", "abc"),
            ("TARGET_WORDS", "bru"),
            ("MATCH_STRATEGY", "ml"),
        ])
        .is_err());
    }

    #[test]
    fn test_dictionary_strategy_requires_path() {
        assert!(load(&[
            ("DISCORD_TOKEN", "abc"),
            ("TARGET_WORDS", "bru"),
            ("MATCH_STRATEGY", "dictionary"),
        ])
        .is_err());
    }

    #[test]
    fn test_build_dictionary_strategy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "brush").unwrap();
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("TARGET_WORDS", "bru"),
            ("MATCH_STRATEGY", "dictionary"),
            ("DICTIONARY_PATH", file.path().to_str().unwrap()),
        ])
        .unwrap();
        let strategy = config.build_strategy().unwrap();
        assert_eq!(strategy.name(), "dictionary");
        assert!(!strategy.should_count("brush", "bru"));
    }

    #[test]
    fn test_build_suffix_strategy_with_extra_denylist() {
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("TARGET_WORDS", "bru"),
            ("EXTRA_DENYLIST", " SH ,"),
        ])
        .unwrap();
        let strategy = config.build_strategy().unwrap();
        assert_eq!(strategy.name(), "suffix");
        assert!(!strategy.should_count("brush", "bru"));
        assert!(strategy.should_count("bruh", "bru"));
    }
}
