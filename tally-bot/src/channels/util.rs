//! Shared utilities for channel implementations.

/// Discord's per-message character limit
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Split a message into chunks respecting a platform's character limit.
/// Splits on line boundaries; lines exceeding `max_len` are hard-split on
/// character boundaries.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if current.len() + line.len() + 1 > max_len {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if line.len() > max_len {
                let mut remaining = line;
                while remaining.len() > max_len {
                    let cut = floor_char_boundary(remaining, max_len);
                    chunks.push(remaining[..cut].to_string());
                    remaining = &remaining[cut..];
                }
                current = remaining.to_string();
            } else {
                current = line.to_string();
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut cut = index.min(text.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut == 0 {
        // max_len smaller than the first character
        text.chars().next().map(char::len_utf8).unwrap_or(0)
    } else {
        cut
    }
}

/// Parse "Retry after Xs" from a platform API error string.
/// Returns the number of seconds to wait, or None if not a rate-limit error.
pub fn parse_retry_after(err: &str) -> Option<u64> {
    let lower = err.to_lowercase();
    let pos = lower.find("retry after ")?;
    let digits: String = lower[pos + 12..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().ok()
}
