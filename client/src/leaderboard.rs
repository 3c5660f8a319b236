//! Ranked user leaderboard with a shared 24-hour document cache.

use crate::error::Result;
use crate::poll::Address;
use crate::store::{DocumentStore, LeaderboardCache, LeaderboardUser};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub const CACHE_FRESHNESS_HOURS: i64 = 24;
/// The live rebuild query is capped at this many profiles.
pub const QUERY_CAP: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One page of the (possibly cached) ranking, plus the requesting wallet's
/// own position in the unfiltered set.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardView {
    pub entries: Vec<LeaderboardUser>,
    pub filtered_count: usize,
    pub total_pages: usize,
    pub current_user_rank: Option<u64>,
    pub current_user: Option<LeaderboardUser>,
}

pub struct Leaderboard<S> {
    store: Arc<S>,
    page_size: usize,
}

impl<S: DocumentStore> Leaderboard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Leaderboard {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Clamped to at least one entry per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Searchable, paginated view over the working set. `page` is 1-based.
    pub async fn fetch(
        &self,
        page: usize,
        search: &str,
        wallet: Option<Address>,
    ) -> Result<LeaderboardView> {
        self.fetch_at(Utc::now(), page, search, wallet).await
    }

    /// Forces a rebuild from the live profile query and returns the new
    /// ranking.
    pub async fn refresh(&self) -> Result<Vec<LeaderboardUser>> {
        self.working_set(Utc::now(), true).await
    }

    pub(crate) async fn fetch_at(
        &self,
        now: DateTime<Utc>,
        page: usize,
        search: &str,
        wallet: Option<Address>,
    ) -> Result<LeaderboardView> {
        let working_set = self.working_set(now, false).await?;

        let query = search.to_lowercase();
        let filtered: Vec<&LeaderboardUser> = working_set
            .iter()
            .filter(|user| {
                query.is_empty()
                    || user.nickname.to_lowercase().contains(&query)
                    || user.wallet_address.to_string().contains(&query)
            })
            .collect();
        let filtered_count = filtered.len();
        let total_pages = (filtered_count + self.page_size - 1) / self.page_size;
        let start = page.saturating_sub(1) * self.page_size;
        let entries = filtered
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();

        // rank against the unfiltered set, independent of search/pagination
        let position = wallet.and_then(|wallet| {
            working_set
                .iter()
                .position(|user| user.wallet_address == wallet)
        });
        Ok(LeaderboardView {
            entries,
            filtered_count,
            total_pages,
            current_user_rank: position.map(|index| index as u64 + 1),
            current_user: position.map(|index| working_set[index].clone()),
        })
    }

    async fn working_set(
        &self,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<Vec<LeaderboardUser>> {
        if !force {
            if let Some(cache) = self.store.leaderboard_cache().await? {
                if now - cache.last_updated < Duration::hours(CACHE_FRESHNESS_HOURS) {
                    log::debug!("using cached leaderboard data");
                    return Ok(cache.users);
                }
            }
        }
        log::info!("rebuilding leaderboard from live profile query");
        let profiles = self.store.top_profiles_by_polls(QUERY_CAP).await?;
        let mut users: Vec<LeaderboardUser> =
            profiles.iter().map(LeaderboardUser::from).collect();
        // defensive re-sort in case the query ordering diverges; stable, so
        // ties keep fetch order
        users.sort_by(|a, b| b.polls_created.cmp(&a.polls_created));
        for (index, user) in users.iter_mut().enumerate() {
            user.rank = index as u64 + 1;
        }
        self.store
            .put_leaderboard_cache(&LeaderboardCache {
                users: users.clone(),
                last_updated: now,
            })
            .await?;
        Ok(users)
    }
}
