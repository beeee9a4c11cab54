use crate::backfill::{self, HistoryChannel, HistorySource};
use crate::channels::util::{split_message, DISCORD_MESSAGE_LIMIT};
use crate::commands::{self, Command};
use crate::AppState;
use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelType, Client, Context, EventHandler, GatewayIntents, GetMessages, GuildId,
    Http, Message, MessageId, Ready, User,
};
use std::num::NonZeroU16;
use std::sync::Arc;
use tally_types::ObservedMessage;

/// Discord moved away from discriminators; include one only when present
fn format_user_name(name: &str, discriminator: Option<NonZeroU16>) -> String {
    match discriminator {
        Some(disc) => format!("{}#{:04}", name, disc),
        None => name.to_string(),
    }
}

fn user_name(user: &User) -> String {
    format_user_name(&user.name, user.discriminator)
}

fn observed_message(msg: &Message) -> ObservedMessage {
    ObservedMessage {
        message_id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.to_string(),
        author_name: user_name(&msg.author),
        author_is_bot: msg.author.bot,
        content: msg.content.clone(),
    }
}

/// Channel kinds that carry a message history
fn is_text_capable(kind: ChannelType) -> bool {
    matches!(
        kind,
        ChannelType::Text
            | ChannelType::News
            | ChannelType::Voice
            | ChannelType::Stage
            | ChannelType::PublicThread
            | ChannelType::PrivateThread
            | ChannelType::NewsThread
    )
}

/// Text-capable channels sorted by id, each listed once
fn history_channels(
    channels: impl IntoIterator<Item = (u64, String, ChannelType)>,
) -> Vec<HistoryChannel> {
    let mut listed: Vec<HistoryChannel> = channels
        .into_iter()
        .filter(|(_, _, kind)| is_text_capable(*kind))
        .map(|(id, name, _)| HistoryChannel { id, name })
        .collect();
    listed.sort_by_key(|channel| channel.id);
    listed.dedup_by_key(|channel| channel.id);
    listed
}

/// Reply to a message, split to Discord's length limit
async fn reply(http: &Arc<Http>, msg: &Message, text: &str) {
    for chunk in split_message(text, DISCORD_MESSAGE_LIMIT) {
        if let Err(e) = msg.reply(http, chunk).await {
            log::error!("[DISCORD] Failed to send reply: {}", e);
        }
    }
}

/// Guild history read over the Discord HTTP API
pub struct DiscordHistory {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl DiscordHistory {
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }
}

#[async_trait]
impl HistorySource for DiscordHistory {
    async fn text_channels(&self) -> Result<Vec<HistoryChannel>, String> {
        let channels = self
            .guild_id
            .channels(&self.http)
            .await
            .map_err(|e| format!("Failed to list channels: {}", e))?;

        // Active threads are not part of the channel list; archived ones are not walked
        let threads = match self.guild_id.get_active_threads(&self.http).await {
            Ok(data) => data.threads,
            Err(e) => {
                log::warn!("[DISCORD] Failed to list active threads for {}: {}", self.guild_id, e);
                Vec::new()
            }
        };

        Ok(history_channels(
            channels
                .into_values()
                .chain(threads)
                .map(|channel| (channel.id.get(), channel.name, channel.kind)),
        ))
    }

    async fn fetch_page(
        &self,
        channel_id: u64,
        before: Option<u64>,
        limit: u8,
    ) -> Result<Vec<ObservedMessage>, String> {
        let mut request = GetMessages::new().limit(limit);
        if let Some(before) = before {
            request = request.before(MessageId::new(before));
        }

        let messages = ChannelId::new(channel_id)
            .messages(&self.http, request)
            .await
            .map_err(|e| format!("Failed to fetch messages: {}", e))?;

        Ok(messages.iter().map(observed_message).collect())
    }
}

struct DiscordHandler {
    state: Arc<AppState>,
}

impl DiscordHandler {
    async fn handle_command(&self, ctx: &Context, msg: &Message, guild_id: GuildId, cmd: Command) {
        let user_id = msg.author.id.to_string();
        log::info!("[DISCORD] Command {:?} from {} ({})", cmd, msg.author.name, user_id);

        if cmd == Command::Backfill {
            self.start_backfill(ctx, msg, guild_id).await;
            return;
        }

        let response = commands::execute(
            &cmd,
            &user_id,
            self.state.store.as_ref(),
            &self.state.config.command_prefix,
        )
        .await;
        if let Some(text) = response {
            reply(&ctx.http, msg, &text).await;
        }
    }

    /// Runs in the background; replies once on start and once on completion.
    async fn start_backfill(&self, ctx: &Context, msg: &Message, guild_id: GuildId) {
        let Some(guard) = self.state.backfills.try_start(guild_id.get()) else {
            reply(&ctx.http, msg, &commands::backfill::already_running_message()).await;
            return;
        };

        log::info!("[DISCORD] Backfill requested for guild {} by {}", guild_id, msg.author.name);
        reply(&ctx.http, msg, &commands::backfill::started_message()).await;

        let http = ctx.http.clone();
        let state = self.state.clone();
        let msg = msg.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let source = DiscordHistory::new(http.clone(), guild_id);
            let text = match backfill::run_backfill(&source, &state.ingestor, &state.config.backfill)
                .await
            {
                Ok(report) => commands::backfill::completed_message(&report),
                Err(e) => {
                    log::error!("[DISCORD] Backfill for guild {} failed: {}", guild_id, e);
                    commands::backfill::failed_message(&e)
                }
            };
            reply(&http, &msg, &text).await;
        });
    }
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore messages from bots (including ourselves)
        if msg.author.bot || msg.content.is_empty() {
            return;
        }

        let Some(guild_id) = msg.guild_id else {
            return;
        };
        if !self.state.config.is_monitored_guild(guild_id.get()) {
            return;
        }

        if let Some(cmd) = commands::parse(&msg.content, &self.state.config.command_prefix) {
            self.handle_command(&ctx, &msg, guild_id, cmd).await;
            return;
        }

        self.state.ingestor.ingest(&observed_message(&msg)).await;
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        log::info!(
            "[DISCORD] Bot connected as {} in {} guilds, watching {} targets ({} strategy)",
            ready.user.name,
            ready.guilds.len(),
            self.state.ingestor.detector().targets().len(),
            self.state.ingestor.detector().strategy_name()
        );
    }
}

/// Connect to Discord and process events until Ctrl-C or a client error.
pub async fn start_discord_listener(state: Arc<AppState>) -> Result<(), String> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = DiscordHandler {
        state: state.clone(),
    };

    let mut client = Client::builder(&state.config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| format!("Failed to create Discord client: {}", e))?;

    log::info!("[DISCORD] Client created successfully");

    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("[DISCORD] Received shutdown signal");
            shard_manager.shutdown_all().await;
        }
        result = client.start() => {
            if let Err(e) = result {
                let error = format!("Discord client error: {}", e);
                log::error!("[DISCORD] {}", error);
                return Err(error);
            }
            log::info!("[DISCORD] Client stopped");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_name_without_discriminator() {
        assert_eq!(format_user_name("alice", None), "alice");
    }

    #[test]
    fn test_user_name_with_discriminator() {
        assert_eq!(format_user_name("bob", NonZeroU16::new(42)), "bob#0042");
    }

    #[test]
    fn test_text_capable_channels() {
        assert!(is_text_capable(ChannelType::Text));
        assert!(is_text_capable(ChannelType::News));
        assert!(is_text_capable(ChannelType::Voice));
        assert!(is_text_capable(ChannelType::Stage));
        assert!(is_text_capable(ChannelType::PublicThread));
        assert!(is_text_capable(ChannelType::PrivateThread));
        assert!(is_text_capable(ChannelType::NewsThread));
        assert!(!is_text_capable(ChannelType::Category));
    }

    #[test]
    fn test_history_channels_include_threads() {
        let listed = history_channels(vec![
            (30, "lore".to_string(), ChannelType::PublicThread),
            (10, "general".to_string(), ChannelType::Text),
            (5, "Info".to_string(), ChannelType::Category),
            (20, "stage".to_string(), ChannelType::Stage),
            (10, "general".to_string(), ChannelType::Text),
        ]);
        let ids: Vec<u64> = listed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(listed[2].name, "lore");
    }
}
