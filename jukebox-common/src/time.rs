//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Current UTC time, used for votes, history and runtime rows
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_successive_timestamps_advance() {
        let first = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(now() > first);
    }
}
