//! Aggregated load for the community dashboard: global counters, the first
//! leaderboard page and the connected wallet's own numbers in one pass.

use crate::chain::{to_tokens, PollChain};
use crate::client::HubClient;
use crate::error::Result;
use crate::events::{Event, Subscription};
use crate::leaderboard::LeaderboardView;
use crate::store::{DocumentStore, GlobalStats};

#[derive(Clone, Debug, PartialEq)]
pub struct UserStats {
    pub polls_created: u64,
    pub votes_cast: u64,
    pub reputation: i64,
    pub token_balance: f64,
    pub rank: Option<u64>,
}

pub struct DashboardData {
    pub global: GlobalStats,
    pub leaderboard: LeaderboardView,
    pub user_stats: Option<UserStats>,
    /// A wallet is connected but has no profile document yet.
    pub registration_required: bool,
}

pub struct Dashboard<'a, C, S> {
    client: &'a HubClient<C, S>,
}

impl<'a, C: PollChain, S: DocumentStore> Dashboard<'a, C, S> {
    pub(crate) fn new(client: &'a HubClient<C, S>) -> Self {
        Dashboard { client }
    }

    /// One aggregated read for the dashboard view. Profile-derived numbers
    /// come from the document store, balance and poll count from the
    /// contract, rank from the leaderboard working set.
    pub async fn load(&self) -> Result<DashboardData> {
        let wallet = self.client.wallet();
        let global = self.client.stats().current().await?;
        let leaderboard = self.client.leaderboard().fetch(1, "", wallet).await?;

        let mut user_stats = None;
        let mut registration_required = false;
        if let Some(wallet) = wallet {
            match self.client.profiles().get(wallet).await? {
                Some(profile) => {
                    let chain = self.client.chain();
                    user_stats = Some(UserStats {
                        polls_created: chain.total_polls_created(wallet).await?,
                        votes_cast: profile.votes_cast,
                        reputation: profile.reputation,
                        token_balance: to_tokens(chain.balance_of(wallet).await?),
                        rank: leaderboard.current_user_rank,
                    });
                }
                None => registration_required = true,
            }
        }
        Ok(DashboardData {
            global,
            leaderboard,
            user_stats,
            registration_required,
        })
    }

    /// Applies queued vote events to the global counter between refreshes.
    pub async fn process_events(&self, sub: &Subscription) -> Result<u32> {
        let mut applied = 0;
        for event in sub.drain() {
            if let Event::UserVoted { .. } = event {
                self.client.stats().increment_votes().await?;
                applied += 1;
            }
        }
        Ok(applied)
    }
}
