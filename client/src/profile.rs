//! Per-wallet profile documents and their synchronization with chain state.

use crate::chain::{to_tokens, PollChain};
use crate::error::{Error, Result};
use crate::events::{Event, Subscription};
use crate::poll::Address;
use crate::store::{DocumentStore, ProfileUpdate, StatField, UserProfile};
use chrono::Utc;
use std::sync::Arc;

pub const MIN_NICKNAME_LEN: usize = 3;
/// Reputation granted per recorded vote.
pub const VOTE_REPUTATION: i64 = 10;
pub const DEFAULT_AVATAR: &str = "👤";

pub struct ProfileService<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> ProfileService<S> {
    pub fn new(store: Arc<S>) -> Self {
        ProfileService { store }
    }

    pub async fn get(&self, wallet: Address) -> Result<Option<UserProfile>> {
        self.store.profile(wallet).await
    }

    /// Registers a new profile. Validation rejects before any store write;
    /// the global user counter bump afterwards is best effort.
    pub async fn create(
        &self,
        wallet: Address,
        nickname: &str,
        avatar: &str,
    ) -> Result<UserProfile> {
        let nickname = nickname.trim();
        if nickname.chars().count() < MIN_NICKNAME_LEN {
            return Err(Error::NicknameTooShort(MIN_NICKNAME_LEN));
        }
        if self.store.nickname_exists(nickname).await? {
            return Err(Error::NicknameTaken(nickname.to_string()));
        }
        let avatar = if avatar.is_empty() {
            DEFAULT_AVATAR
        } else {
            avatar
        };
        let profile = UserProfile::new(wallet, nickname, avatar, Utc::now());
        self.store.put_profile(&profile).await?;
        log::info!("registered profile `{}` for {}", profile.nickname, wallet);
        if let Err(err) = self.store.bump_stat(StatField::TotalUsers, 1, Utc::now()).await {
            log::warn!("user counter increment failed after registration: {}", err);
        }
        Ok(profile)
    }

    pub async fn update(&self, wallet: Address, update: ProfileUpdate) -> Result<UserProfile> {
        self.store.merge_profile(wallet, update, Utc::now()).await
    }

    /// Pushes the latest contract-derived stats into the profile document
    /// whenever they differ from the stored values. Runs on every call, no
    /// debouncing.
    pub async fn sync_chain_stats<C: PollChain>(&self, chain: &C, wallet: Address) -> Result<()> {
        let profile = match self.store.profile(wallet).await? {
            Some(profile) => profile,
            None => return Ok(()),
        };
        let polls_created = chain.total_polls_created(wallet).await?;
        let total_earned = to_tokens(chain.balance_of(wallet).await?);
        if polls_created == profile.polls_created && total_earned == profile.total_earned {
            return Ok(());
        }
        self.update(
            wallet,
            ProfileUpdate {
                polls_created: Some(polls_created),
                total_earned: Some(total_earned),
                ..ProfileUpdate::default()
            },
        )
        .await?;
        Ok(())
    }

    /// Applies one cast vote: votes_cast += 1, reputation += 10. There is no
    /// idempotency key, so a duplicate event delivery double-counts.
    pub async fn record_vote(&self, wallet: Address) -> Result<Option<UserProfile>> {
        let profile = match self.store.profile(wallet).await? {
            Some(profile) => profile,
            None => {
                log::debug!("vote by {} with no profile, nothing to record", wallet);
                return Ok(None);
            }
        };
        let updated = self
            .update(
                wallet,
                ProfileUpdate {
                    votes_cast: Some(profile.votes_cast + 1),
                    reputation: Some(profile.reputation + VOTE_REPUTATION),
                    ..ProfileUpdate::default()
                },
            )
            .await?;
        Ok(Some(updated))
    }

    /// Drains a subscription, recording every `UserVoted` event that matches
    /// the connected wallet. Returns how many votes were recorded.
    pub async fn process_events(&self, sub: &Subscription, wallet: Address) -> Result<u32> {
        let mut recorded = 0;
        for event in sub.drain() {
            if let Event::UserVoted { voter, .. } = event {
                if voter == wallet {
                    self.record_vote(wallet).await?;
                    recorded += 1;
                }
            }
        }
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::{DevChain, VOTER_REWARD};
    use crate::events::EventBus;
    use crate::store::SledStore;

    fn addr(tag: u8) -> Address {
        Address::from_bytes([tag; 20])
    }

    fn service() -> (ProfileService<SledStore>, Arc<SledStore>) {
        let store = Arc::new(SledStore::temporary().unwrap());
        (ProfileService::new(store.clone()), store)
    }

    #[async_std::test]
    async fn create_writes_zeroed_profile_and_bumps_user_counter() {
        let (service, store) = service();
        let profile = service.create(addr(1), "abc", "🐶").await.unwrap();
        assert_eq!(profile.nickname, "abc");
        assert_eq!(profile.avatar, "🐶");
        assert_eq!(profile.polls_created, 0);
        assert_eq!(profile.votes_cast, 0);
        assert_eq!(profile.reputation, 0);
        assert_eq!(store.profile(addr(1)).await.unwrap(), Some(profile));
        let stats = store.global_stats().await.unwrap().unwrap();
        assert_eq!(stats.total_users, 1);
    }

    #[async_std::test]
    async fn short_nickname_rejected_before_any_write() {
        let (service, store) = service();
        let err = service.create(addr(1), "ab", "🐶").await.unwrap_err();
        assert!(matches!(err, Error::NicknameTooShort(_)));
        assert_eq!(store.profile(addr(1)).await.unwrap(), None);
        assert_eq!(store.global_stats().await.unwrap(), None);
    }

    #[async_std::test]
    async fn duplicate_nickname_rejected() {
        let (service, _) = service();
        service.create(addr(1), "alice", "🦊").await.unwrap();
        let err = service.create(addr(2), "alice", "🐶").await.unwrap_err();
        assert!(matches!(err, Error::NicknameTaken(_)));
        // different case is a different nickname
        service.create(addr(2), "Alice", "🐶").await.unwrap();
    }

    #[async_std::test]
    async fn record_vote_increments_votes_and_reputation() {
        let (service, _) = service();
        service.create(addr(1), "alice", "🦊").await.unwrap();
        let updated = service.record_vote(addr(1)).await.unwrap().unwrap();
        assert_eq!(updated.votes_cast, 1);
        assert_eq!(updated.reputation, VOTE_REPUTATION);
        // no profile, no record
        assert!(service.record_vote(addr(9)).await.unwrap().is_none());
    }

    #[async_std::test]
    async fn duplicate_events_double_count() {
        let (service, _) = service();
        service.create(addr(1), "alice", "🦊").await.unwrap();
        let bus = EventBus::new();
        let sub = bus.subscribe();
        let event = Event::UserVoted {
            poll_id: 5,
            voter: addr(1),
        };
        bus.dispatch(event.clone());
        bus.dispatch(event);
        bus.dispatch(Event::UserVoted {
            poll_id: 5,
            voter: addr(2),
        });
        let recorded = service.process_events(&sub, addr(1)).await.unwrap();
        assert_eq!(recorded, 2);
        let profile = service.get(addr(1)).await.unwrap().unwrap();
        assert_eq!(profile.votes_cast, 2);
        assert_eq!(profile.reputation, 2 * VOTE_REPUTATION);
    }

    #[async_std::test]
    async fn chain_stats_sync_updates_only_on_change() {
        let (service, store) = service();
        service.create(addr(1), "alice", "🦊").await.unwrap();
        let db = sled::Config::new().temporary(true).open().unwrap();
        let chain = DevChain::open(db.open_tree("ledger").unwrap()).unwrap();

        // nothing on chain yet, profile untouched
        let before = store.profile(addr(1)).await.unwrap().unwrap();
        service.sync_chain_stats(&chain, addr(1)).await.unwrap();
        assert_eq!(store.profile(addr(1)).await.unwrap().unwrap(), before);

        let options = vec!["a".to_string(), "b".to_string()];
        chain
            .submit_create_poll("p", &options, addr(1))
            .await
            .unwrap();
        chain.submit_vote(0, 0, addr(1)).await.unwrap();
        service.sync_chain_stats(&chain, addr(1)).await.unwrap();
        let after = store.profile(addr(1)).await.unwrap().unwrap();
        assert_eq!(after.polls_created, 1);
        assert!((after.total_earned - to_tokens(VOTER_REWARD)).abs() < f64::EPSILON);
    }
}
