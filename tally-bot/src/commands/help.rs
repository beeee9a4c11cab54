//! Help command - shows available commands

/// Execute the help command
pub fn execute(prefix: &str) -> String {
    format!(
        "**Word Tally Commands**\n\n\
        - `{p}count [word]` - How many times you said a tracked word (all words if omitted)\n\
        - `{p}leaderboard [word]` - Top 10 for a word, or combined across all words\n\
        - `{p}backfill` - Count the server's message history\n\
        - `{p}help` - Show this help message",
        p = prefix
    )
}
