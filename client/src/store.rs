//! Off-chain document model and the store it lives in.
//!
//! Collections mirror the hosted document database the web client used:
//! `users/{wallet}`, `globalStats/current` and `leaderboardCache/current`.

use crate::error::{Error, Result};
use crate::poll::Address;
use async_std::sync::RwLock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const STATS_KEY: &str = "globalStats/current";
const LEADERBOARD_KEY: &str = "leaderboardCache/current";

/// Per-wallet profile document. The nickname is intended to be immutable
/// once set and globally unique; uniqueness is checked with a query before
/// the write, not transactionally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub wallet_address: Address,
    pub nickname: String,
    pub avatar: String,
    pub registered_at: DateTime<Utc>,
    pub polls_created: u64,
    pub votes_cast: u64,
    /// Whole tokens, converted from the 18-decimal balance.
    pub total_earned: f64,
    pub reputation: i64,
    pub last_active: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(
        wallet_address: Address,
        nickname: impl Into<String>,
        avatar: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        UserProfile {
            wallet_address,
            nickname: nickname.into(),
            avatar: avatar.into(),
            registered_at: now,
            polls_created: 0,
            votes_cast: 0,
            total_earned: 0.0,
            reputation: 0,
            last_active: now,
        }
    }
}

/// Partial profile write. `None` fields are left untouched; every merge
/// stamps `last_active`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub polls_created: Option<u64>,
    pub votes_cast: Option<u64>,
    pub total_earned: Option<f64>,
    pub reputation: Option<i64>,
}

impl ProfileUpdate {
    fn apply(self, profile: &mut UserProfile, now: DateTime<Utc>) {
        if let Some(nickname) = self.nickname {
            profile.nickname = nickname;
        }
        if let Some(avatar) = self.avatar {
            profile.avatar = avatar;
        }
        if let Some(polls_created) = self.polls_created {
            profile.polls_created = polls_created;
        }
        if let Some(votes_cast) = self.votes_cast {
            profile.votes_cast = votes_cast;
        }
        if let Some(total_earned) = self.total_earned {
            profile.total_earned = total_earned;
        }
        if let Some(reputation) = self.reputation {
            profile.reputation = reputation;
        }
        profile.last_active = now;
    }
}

/// Singleton counters document, lazily initialized to zeros.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_polls: u64,
    pub total_users: u64,
    pub total_votes: u64,
    pub active_polls: u64,
    pub last_updated: DateTime<Utc>,
}

impl GlobalStats {
    pub fn zeroed(now: DateTime<Utc>) -> Self {
        GlobalStats {
            total_polls: 0,
            total_users: 0,
            total_votes: 0,
            active_polls: 0,
            last_updated: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatField {
    TotalPolls,
    TotalUsers,
    TotalVotes,
    ActivePolls,
}

impl StatField {
    fn slot<'a>(&self, stats: &'a mut GlobalStats) -> &'a mut u64 {
        match self {
            StatField::TotalPolls => &mut stats.total_polls,
            StatField::TotalUsers => &mut stats.total_users,
            StatField::TotalVotes => &mut stats.total_votes,
            StatField::ActivePolls => &mut stats.active_polls,
        }
    }
}

/// One ranked leaderboard entry; `rank` is dense and 1-based.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardUser {
    pub wallet_address: Address,
    pub nickname: String,
    pub avatar: String,
    pub polls_created: u64,
    pub votes_cast: u64,
    pub total_earned: f64,
    pub reputation: i64,
    pub rank: u64,
}

impl From<&UserProfile> for LeaderboardUser {
    fn from(profile: &UserProfile) -> Self {
        LeaderboardUser {
            wallet_address: profile.wallet_address,
            nickname: profile.nickname.clone(),
            avatar: profile.avatar.clone(),
            polls_created: profile.polls_created,
            votes_cast: profile.votes_cast,
            total_earned: profile.total_earned,
            reputation: profile.reputation,
            rank: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardCache {
    pub users: Vec<LeaderboardUser>,
    pub last_updated: DateTime<Utc>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn profile(&self, wallet: Address) -> Result<Option<UserProfile>>;
    async fn put_profile(&self, profile: &UserProfile) -> Result<()>;
    /// Merge partial fields into an existing document; fails if absent.
    async fn merge_profile(
        &self,
        wallet: Address,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserProfile>;
    /// Case-sensitive, as the uniqueness query was implemented.
    async fn nickname_exists(&self, nickname: &str) -> Result<bool>;
    /// Profiles ordered by `polls_created` descending, capped at `limit`.
    async fn top_profiles_by_polls(&self, limit: usize) -> Result<Vec<UserProfile>>;

    async fn global_stats(&self) -> Result<Option<GlobalStats>>;
    async fn put_global_stats(&self, stats: &GlobalStats) -> Result<()>;
    /// Atomic counter increment, initializing the document when missing.
    async fn bump_stat(
        &self,
        field: StatField,
        delta: u64,
        now: DateTime<Utc>,
    ) -> Result<GlobalStats>;
    async fn set_stat(
        &self,
        field: StatField,
        value: u64,
        now: DateTime<Utc>,
    ) -> Result<GlobalStats>;

    async fn leaderboard_cache(&self) -> Result<Option<LeaderboardCache>>;
    async fn put_leaderboard_cache(&self, cache: &LeaderboardCache) -> Result<()>;
}

/// Sled-backed store; documents are JSON values in per-collection trees.
pub struct SledStore {
    users: sled::Tree,
    singletons: sled::Tree,
    // serializes read-modify-write sequences within this process
    write_lock: RwLock<()>,
}

impl SledStore {
    pub fn new(db: &sled::Db) -> Result<Self> {
        Ok(SledStore {
            users: db.open_tree("users")?,
            singletons: db.open_tree("singletons")?,
            write_lock: RwLock::new(()),
        })
    }

    /// In-memory store for tests.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        SledStore::new(&db)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        tree: &sled::Tree,
        key: &str,
    ) -> Result<Option<T>> {
        match tree.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(tree: &sled::Tree, key: &str, value: &T) -> Result<()> {
        tree.insert(key, serde_json::to_vec(value)?)?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn profile(&self, wallet: Address) -> Result<Option<UserProfile>> {
        Self::get_json(&self.users, &wallet.to_string())
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<()> {
        let _guard = self.write_lock.write().await;
        Self::put_json(&self.users, &profile.wallet_address.to_string(), profile)
    }

    async fn merge_profile(
        &self,
        wallet: Address,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserProfile> {
        let _guard = self.write_lock.write().await;
        let mut profile: UserProfile = Self::get_json(&self.users, &wallet.to_string())?
            .ok_or(Error::ProfileNotFound(wallet))?;
        update.apply(&mut profile, now);
        Self::put_json(&self.users, &wallet.to_string(), &profile)?;
        Ok(profile)
    }

    async fn nickname_exists(&self, nickname: &str) -> Result<bool> {
        for entry in self.users.iter() {
            let (_, raw) = entry?;
            let profile: UserProfile = serde_json::from_slice(&raw)?;
            if profile.nickname == nickname {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn top_profiles_by_polls(&self, limit: usize) -> Result<Vec<UserProfile>> {
        let mut profiles = Vec::new();
        for entry in self.users.iter() {
            let (_, raw) = entry?;
            profiles.push(serde_json::from_slice::<UserProfile>(&raw)?);
        }
        // stable, so equal counts keep key order
        profiles.sort_by(|a, b| b.polls_created.cmp(&a.polls_created));
        profiles.truncate(limit);
        Ok(profiles)
    }

    async fn global_stats(&self) -> Result<Option<GlobalStats>> {
        Self::get_json(&self.singletons, STATS_KEY)
    }

    async fn put_global_stats(&self, stats: &GlobalStats) -> Result<()> {
        let _guard = self.write_lock.write().await;
        Self::put_json(&self.singletons, STATS_KEY, stats)
    }

    async fn bump_stat(
        &self,
        field: StatField,
        delta: u64,
        now: DateTime<Utc>,
    ) -> Result<GlobalStats> {
        let _guard = self.write_lock.write().await;
        let mut stats: GlobalStats = Self::get_json(&self.singletons, STATS_KEY)?
            .unwrap_or_else(|| GlobalStats::zeroed(now));
        *field.slot(&mut stats) += delta;
        stats.last_updated = now;
        Self::put_json(&self.singletons, STATS_KEY, &stats)?;
        Ok(stats)
    }

    async fn set_stat(
        &self,
        field: StatField,
        value: u64,
        now: DateTime<Utc>,
    ) -> Result<GlobalStats> {
        let _guard = self.write_lock.write().await;
        let mut stats: GlobalStats = Self::get_json(&self.singletons, STATS_KEY)?
            .unwrap_or_else(|| GlobalStats::zeroed(now));
        *field.slot(&mut stats) = value;
        stats.last_updated = now;
        Self::put_json(&self.singletons, STATS_KEY, &stats)?;
        Ok(stats)
    }

    async fn leaderboard_cache(&self) -> Result<Option<LeaderboardCache>> {
        Self::get_json(&self.singletons, LEADERBOARD_KEY)
    }

    async fn put_leaderboard_cache(&self, cache: &LeaderboardCache) -> Result<()> {
        let _guard = self.write_lock.write().await;
        Self::put_json(&self.singletons, LEADERBOARD_KEY, cache)
    }
}
