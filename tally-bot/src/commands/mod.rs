//! Text-prefixed chat commands

pub mod backfill;
mod count;
mod help;
mod leaderboard;

use crate::store::CounterStore;

/// Commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Caller's count for one target, or their combined total: `count [target]`
    Count(Option<String>),
    /// Top 10 for one target, or combined: `leaderboard [target]`
    Leaderboard(Option<String>),
    /// Replay the whole server history: `backfill`
    Backfill,
    /// Show help: `help`
    Help,
}

/// Parse a command from message text. Returns `None` for ordinary chat.
pub fn parse(text: &str, prefix: &str) -> Option<Command> {
    let rest = text.trim().strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        return None;
    }

    let parts: Vec<&str> = rest.split_whitespace().collect();
    let command = parts.first()?.to_lowercase();
    let argument = parts.get(1).map(|arg| arg.to_lowercase());

    log::debug!(
        "[COMMANDS] Parsing '{}' -> command '{}' argument {:?}",
        text,
        command,
        argument
    );

    match command.as_str() {
        "count" => Some(Command::Count(argument)),
        "leaderboard" | "lb" => Some(Command::Leaderboard(argument)),
        "backfill" => Some(Command::Backfill),
        "help" => Some(Command::Help),
        _ => None,
    }
}

/// Execute a query command and return the reply text.
///
/// Returns `None` for `Backfill`, which the channel adapter runs itself
/// because it needs the platform connection.
pub async fn execute(
    cmd: &Command,
    user_id: &str,
    store: &dyn CounterStore,
    prefix: &str,
) -> Option<String> {
    match cmd {
        Command::Count(target) => Some(count::execute(user_id, target.as_deref(), store).await),
        Command::Leaderboard(target) => Some(leaderboard::execute(target.as_deref(), store).await),
        Command::Help => Some(help::execute(prefix)),
        Command::Backfill => None,
    }
}
