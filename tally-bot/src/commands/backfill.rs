//! Backfill command replies

use tally_types::BackfillReport;

pub fn started_message() -> String {
    "Starting full server backfill...".to_string()
}

pub fn already_running_message() -> String {
    "A backfill is already running for this server.".to_string()
}

pub fn failed_message(error: &str) -> String {
    format!("Backfill failed: {}", error)
}

/// Completion reply, naming any channels that aborted part way
pub fn completed_message(report: &BackfillReport) -> String {
    let summary = format!(
        "{} channels, {} messages scanned, {} newly counted, {} occurrences.",
        report.channels.len(),
        report.messages_scanned(),
        report.messages_counted(),
        report.occurrences()
    );

    if report.is_complete() {
        return format!("Backfill complete. {}", summary);
    }

    let mut reply = format!("Backfill finished with errors. {}\n", summary);
    for channel in report.failed() {
        reply.push_str(&format!(
            "- #{} stopped: {}\n",
            channel.channel_name,
            channel.error.as_deref().unwrap_or("unknown error")
        ));
    }
    reply
}
