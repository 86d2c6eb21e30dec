use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;

/// Expected capacity and false-positive rate for the filter.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;
const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Answers "is this username free?" without touching the database in the
/// common cases:
/// - the cuckoo filter gives a definite "never seen" (fast negative)
/// - the cache gives a definite "taken" (fast positive)
/// - anything else falls back to the `users` table.
pub struct UsernameIndex {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, ()>,
}

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

impl Default for UsernameIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl UsernameIndex {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// False positives possible, false negatives not.
    pub fn might_exist(&self, username: &str) -> bool {
        let username = normalize(username);
        self.filter
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&username)
    }

    pub async fn mark_taken(&self, username: &str) {
        let username = normalize(username);
        self.insert_filter(std::slice::from_ref(&username));
        self.taken.insert(username, ()).await;
    }

    pub async fn is_known_taken(&self, username: &str) -> bool {
        self.taken.get(&normalize(username)).await.is_some()
    }

    /// true => username AVAILABLE
    pub async fn is_available(&self, username: &str, pool: &MySqlPool) -> Result<bool, sqlx::Error> {
        if !self.might_exist(username) {
            return Ok(true);
        }

        if self.is_known_taken(username).await {
            return Ok(false);
        }

        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT CAST(EXISTS(SELECT 1 FROM users WHERE LOWER(username) = ?) AS SIGNED)",
        )
        .bind(normalize(username))
        .fetch_one(pool)
        .await?
            != 0;

        if exists {
            self.taken.insert(normalize(username), ()).await;
        }

        Ok(!exists)
    }

    /// Loads every username into the filter and users seen in the last
    /// `recent_days` into the cache, streaming in batches.
    pub async fn warmup(&self, pool: &MySqlPool, recent_days: u32, batch_size: usize) -> Result<usize> {
        let batch_size = batch_size.max(1);
        let mut stream = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT username,
                   CAST(COALESCE(last_login_at >= NOW() - INTERVAL ? DAY, 0) AS SIGNED) AS recent
            FROM users
            "#,
        )
        .bind(recent_days)
        .fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut recent = Vec::new();
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let (username, is_recent) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
            let username = normalize(&username);
            if is_recent != 0 {
                recent.push(username.clone());
            }
            batch.push(username);
            total += 1;

            if batch.len() == batch_size {
                self.insert_filter(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_filter(&batch);
        }

        let recent_count = recent.len();
        futures::future::join_all(recent.into_iter().map(|u| self.taken.insert(u, ()))).await;

        info!(total, recent = recent_count, "Username index warmup complete");
        Ok(total)
    }

    fn insert_filter(&self, usernames: &[String]) {
        let mut filter = self
            .filter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for username in usernames {
            if !filter.contains(username) {
                filter.add(username);
            }
        }
    }
}
