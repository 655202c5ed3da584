use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::models::{History, Query};
use crate::provider::DataProvider;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    history: Arc<History>,
    fetched_at: Instant,
}

/// Time-boxed memo of provider results keyed by (symbol, period, interval).
///
/// Entries are created on first lookup and only ever replaced after they
/// expire. Nothing is evicted explicitly.
pub struct PriceCache<P> {
    provider: P,
    ttl: Duration,
    entries: HashMap<Query, CacheEntry>,
    diagnostic: Option<String>,
}

impl<P: DataProvider> PriceCache<P> {
    pub fn new(provider: P, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entries: HashMap::new(),
            diagnostic: None,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached history for `query` while it is fresh, otherwise
    /// asks the provider and caches whatever comes back.
    ///
    /// Provider failures never reach the caller: they become an empty
    /// history, and the error text is kept for [`take_diagnostic`].
    ///
    /// [`take_diagnostic`]: PriceCache::take_diagnostic
    pub async fn fetch_cached(&mut self, query: &Query) -> Arc<History> {
        if let Some(entry) = self.entries.get(query) {
            let age = Instant::now().duration_since(entry.fetched_at);
            if age < self.ttl {
                debug!("{query}: cache hit, age {}ms", age.as_millis());
                return entry.history.clone();
            }
        }

        let history = match self.provider.fetch(query).await {
            Ok(history) => history,
            Err(err) => {
                let message = format!("Error fetching data for {}: {err}", query.symbol());
                warn!("{message}");
                self.diagnostic = Some(message);
                History::empty(query.symbol())
            }
        };

        let history = Arc::new(history);
        self.entries.insert(
            query.clone(),
            CacheEntry {
                history: history.clone(),
                fetched_at: Instant::now(),
            },
        );
        history
    }

    /// Most recent fetch failure, if it has not been reported yet.
    pub fn take_diagnostic(&mut self) -> Option<String> {
        self.diagnostic.take()
    }
}
