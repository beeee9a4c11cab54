pub mod counts;
pub mod processed_messages;
