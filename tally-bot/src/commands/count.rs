//! Count command - shows the caller's own tally

use crate::store::CounterStore;

/// Execute the count command
pub async fn execute(user_id: &str, target: Option<&str>, store: &dyn CounterStore) -> String {
    match target {
        Some(target) => {
            let count = store.get_count(user_id, target).await.unwrap_or_else(|e| {
                log::error!("[COMMANDS] count: {}", e);
                0
            });
            format_count(target, count)
        }
        None => {
            let total = store.get_total(user_id).await.unwrap_or_else(|e| {
                log::error!("[COMMANDS] count total: {}", e);
                0
            });
            format_total(total)
        }
    }
}

pub fn format_count(target: &str, count: i64) -> String {
    format!("You have said \"{}\" {} times.", target, count)
}

pub fn format_total(total: i64) -> String {
    format!("You have said tracked words {} times in total.", total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_count_for_target() {
        let db = Database::new(":memory:").unwrap();
        db.increment_count("u1", "Alice", "bru").unwrap();
        db.increment_count("u1", "Alice", "bru").unwrap();
        assert_eq!(execute("u1", Some("bru"), &db).await, "You have said \"bru\" 2 times.");
        assert_eq!(execute("u2", Some("bru"), &db).await, "You have said \"bru\" 0 times.");
    }

    #[tokio::test]
    async fn test_count_total() {
        let db = Database::new(":memory:").unwrap();
        db.increment_count("u1", "Alice", "bru").unwrap();
        db.increment_count("u1", "Alice", "ok").unwrap();
        assert_eq!(execute("u1", None, &db).await, format_total(2));
        assert_eq!(execute("nobody", None, &db).await, format_total(0));
    }
}
