use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::engine::Engine;

/// Background task that cancels PENDING bookings whose check-in date has
/// passed without confirmation.
pub async fn run_expiry_sweep(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let today = Utc::now().date_naive();
        let expired = engine.expire_stale_pending(today).await;
        if expired > 0 {
            metrics::counter!(crate::observability::BOOKINGS_EXPIRED_TOTAL)
                .increment(expired as u64);
            info!(expired, "expiry sweep cancelled stale bookings");
        }
    }
}

/// Background task that rewrites the WAL once enough appends accumulate.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends >= threshold {
            match engine.compact_wal().await {
                Ok(()) => info!(appends, "compacted WAL"),
                Err(e) => tracing::warn!("WAL compaction failed: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::OpenDirectory;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use ulid::Ulid;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("vacancy_test_reaper");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let path = test_wal_path("sweep_idempotent.wal");
        let engine = Arc::new(Engine::new(path, Arc::new(OpenDirectory)).unwrap());

        let room = Ulid::new();
        engine
            .register_room(room, Ulid::new(), Ulid::new(), "101".into(), "100.00".parse().unwrap(), 2)
            .await
            .unwrap();
        engine
            .create_booking(Ulid::new(), Ulid::new(), room, d(2025, 6, 1), d(2025, 6, 5))
            .await
            .unwrap();

        // First pass cancels the stale booking, the second finds nothing
        let today = d(2025, 6, 10);
        assert_eq!(engine.expire_stale_pending(today).await, 1);
        assert_eq!(engine.expire_stale_pending(today).await, 0);
    }

    #[tokio::test]
    async fn compactor_threshold_resets_after_compaction() {
        let path = test_wal_path("compactor_threshold.wal");
        let engine = Arc::new(Engine::new(path, Arc::new(OpenDirectory)).unwrap());

        let room = Ulid::new();
        engine
            .register_room(room, Ulid::new(), Ulid::new(), "101".into(), "100.00".parse().unwrap(), 2)
            .await
            .unwrap();
        engine
            .create_booking(Ulid::new(), Ulid::new(), room, d(2025, 6, 1), d(2025, 6, 5))
            .await
            .unwrap();

        assert!(engine.wal_appends_since_compact().await >= 2);
        engine.compact_wal().await.unwrap();
        assert_eq!(engine.wal_appends_since_compact().await, 0);
    }
}
