//! Embedded development ledger.
//!
//! Implements [`PollChain`] against a sled tree so the CLI and the tests run
//! the full stack without a node connection. Revert reasons match the
//! messages the hosted contract surfaces to clients.

use crate::chain::{PollChain, PollInfo, PollOptions, SubmittedPoll, TxId, TxStatus, ONE_TOKEN};
use crate::error::{Error, Result};
use crate::poll::{Address, PollId};
use async_std::sync::RwLock;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_POLL_DURATION_SECS: i64 = 7 * 86400;
/// Polls one wallet may create per UTC day.
pub const DAILY_POLL_LIMIT: u64 = 5;
/// Minted to the voter on every vote.
pub const VOTER_REWARD: u128 = 10 * ONE_TOKEN;
/// Accrued to the poll creator on every vote, claimable later.
pub const CREATOR_REWARD_PER_VOTE: u128 = ONE_TOKEN;

const STATE_KEY: &str = "state";

#[derive(Clone, Serialize, Deserialize)]
struct PollRecord {
    id: PollId,
    title: String,
    creator: Address,
    end_time: i64,
    option_names: Vec<String>,
    option_votes: Vec<u64>,
    voters: Vec<Address>,
}

#[derive(Clone, Serialize, Deserialize)]
struct DailyCount {
    day: String,
    count: u64,
}

#[derive(Default, Serialize, Deserialize)]
struct LedgerState {
    polls: Vec<PollRecord>,
    balances: HashMap<String, u128>,
    pending_rewards: HashMap<String, u128>,
    daily: HashMap<String, DailyCount>,
    receipts: HashMap<String, TxStatus>,
    next_tx: u64,
}

pub struct DevChain {
    tree: sled::Tree,
    state: RwLock<LedgerState>,
    poll_duration: i64,
}

impl DevChain {
    pub fn open(tree: sled::Tree) -> Result<Self> {
        let state = match tree.get(STATE_KEY)? {
            Some(raw) => serde_json::from_slice(&raw)?,
            None => LedgerState::default(),
        };
        Ok(DevChain {
            tree,
            state: RwLock::new(state),
            poll_duration: DEFAULT_POLL_DURATION_SECS,
        })
    }

    pub fn with_poll_duration(mut self, secs: i64) -> Self {
        self.poll_duration = secs;
        self
    }

    fn persist(&self, state: &LedgerState) -> Result<()> {
        self.tree.insert(STATE_KEY, serde_json::to_vec(state)?)?;
        Ok(())
    }

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    fn next_tx(state: &mut LedgerState) -> TxId {
        state.next_tx += 1;
        TxId::new(format!("0x{:064x}", state.next_tx))
    }

    /// Records the receipt for a submission, successful or reverted.
    fn settle(
        &self,
        state: &mut LedgerState,
        outcome: core::result::Result<(), String>,
    ) -> Result<TxId> {
        let tx = Self::next_tx(state);
        let status = match outcome {
            Ok(()) => TxStatus::Confirmed,
            Err(reason) => {
                log::debug!("dev ledger revert for {}: {}", tx, reason);
                TxStatus::Reverted(reason)
            }
        };
        state.receipts.insert(tx.as_str().to_string(), status);
        self.persist(state)?;
        Ok(tx)
    }
}

#[async_trait]
impl PollChain for DevChain {
    async fn poll_count(&self) -> Result<u64> {
        Ok(self.state.read().await.polls.len() as u64)
    }

    async fn poll_info(&self, id: PollId) -> Result<PollInfo> {
        let state = self.state.read().await;
        let poll = state
            .polls
            .get(id as usize)
            .ok_or(Error::PollNotFound(id))?;
        Ok(PollInfo {
            title: poll.title.clone(),
            creator: poll.creator,
            ended: Self::now() >= poll.end_time,
            end_time: poll.end_time,
            total_votes: poll.option_votes.iter().sum(),
        })
    }

    async fn poll_options(&self, id: PollId) -> Result<PollOptions> {
        let state = self.state.read().await;
        let poll = state
            .polls
            .get(id as usize)
            .ok_or(Error::PollNotFound(id))?;
        Ok(PollOptions {
            names: poll.option_names.clone(),
            votes: poll.option_votes.clone(),
        })
    }

    async fn has_voted(&self, id: PollId, wallet: Address) -> Result<bool> {
        let state = self.state.read().await;
        let poll = state
            .polls
            .get(id as usize)
            .ok_or(Error::PollNotFound(id))?;
        Ok(poll.voters.contains(&wallet))
    }

    async fn balance_of(&self, wallet: Address) -> Result<u128> {
        let state = self.state.read().await;
        Ok(state
            .balances
            .get(&wallet.to_string())
            .copied()
            .unwrap_or(0))
    }

    async fn pending_creator_rewards(&self, wallet: Address) -> Result<u128> {
        let state = self.state.read().await;
        Ok(state
            .pending_rewards
            .get(&wallet.to_string())
            .copied()
            .unwrap_or(0))
    }

    async fn total_polls_created(&self, wallet: Address) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.polls.iter().filter(|p| p.creator == wallet).count() as u64)
    }

    async fn daily_polls_created(&self, wallet: Address) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .daily
            .get(&wallet.to_string())
            .filter(|d| d.day == Self::today())
            .map(|d| d.count)
            .unwrap_or(0))
    }

    async fn submit_create_poll(
        &self,
        title: &str,
        options: &[String],
        creator: Address,
    ) -> Result<SubmittedPoll> {
        let mut state = self.state.write().await;
        // the id the poll gets if this submission lands
        let poll_id = state.polls.len() as PollId;
        if title.trim().is_empty() {
            let tx = self.settle(&mut state, Err("title required".to_string()))?;
            return Ok(SubmittedPoll { tx, poll_id });
        }
        if options.len() < 2 {
            let tx = self.settle(&mut state, Err("at least 2 options required".to_string()))?;
            return Ok(SubmittedPoll { tx, poll_id });
        }
        let today = Self::today();
        let daily = state
            .daily
            .entry(creator.to_string())
            .or_insert_with(|| DailyCount {
                day: today.clone(),
                count: 0,
            });
        if daily.day != today {
            daily.day = today;
            daily.count = 0;
        }
        if daily.count >= DAILY_POLL_LIMIT {
            let tx = self.settle(&mut state, Err("daily poll limit reached".to_string()))?;
            return Ok(SubmittedPoll { tx, poll_id });
        }
        daily.count += 1;
        let record = PollRecord {
            id: poll_id,
            title: title.trim().to_string(),
            creator,
            end_time: Self::now() + self.poll_duration,
            option_names: options.to_vec(),
            option_votes: vec![0; options.len()],
            voters: Vec::new(),
        };
        state.polls.push(record);
        log::info!("dev ledger: poll {} created by {}", poll_id, creator);
        let tx = self.settle(&mut state, Ok(()))?;
        Ok(SubmittedPoll { tx, poll_id })
    }

    async fn submit_vote(&self, id: PollId, option: usize, voter: Address) -> Result<TxId> {
        let mut state = self.state.write().await;
        let outcome = match state.polls.get(id as usize) {
            None => Err("poll not found".to_string()),
            Some(poll) if Self::now() >= poll.end_time => Err("poll has ended".to_string()),
            Some(poll) if poll.voters.contains(&voter) => Err("already voted".to_string()),
            Some(poll) if option >= poll.option_names.len() => {
                Err("invalid option".to_string())
            }
            Some(_) => Ok(()),
        };
        if outcome.is_ok() {
            let creator = {
                let poll = &mut state.polls[id as usize];
                poll.option_votes[option] += 1;
                poll.voters.push(voter);
                poll.creator
            };
            *state.balances.entry(voter.to_string()).or_insert(0) += VOTER_REWARD;
            *state
                .pending_rewards
                .entry(creator.to_string())
                .or_insert(0) += CREATOR_REWARD_PER_VOTE;
            log::info!("dev ledger: {} voted option {} in poll {}", voter, option, id);
        }
        self.settle(&mut state, outcome)
    }

    async fn submit_claim_reward(&self, wallet: Address) -> Result<TxId> {
        let mut state = self.state.write().await;
        let key = wallet.to_string();
        let pending = state.pending_rewards.get(&key).copied().unwrap_or(0);
        if pending == 0 {
            return self.settle(&mut state, Err("nothing to claim".to_string()));
        }
        *state.balances.entry(key.clone()).or_insert(0) += pending;
        state.pending_rewards.insert(key, 0);
        log::info!("dev ledger: {} claimed creator rewards", wallet);
        self.settle(&mut state, Ok(()))
    }

    async fn wait_for_confirmation(&self, tx: &TxId) -> Result<TxStatus> {
        let state = self.state.read().await;
        state
            .receipts
            .get(tx.as_str())
            .cloned()
            .ok_or_else(|| Error::UnknownTransaction(tx.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tag: u8) -> Address {
        Address::from_bytes([tag; 20])
    }

    fn chain() -> DevChain {
        let db = sled::Config::new().temporary(true).open().unwrap();
        DevChain::open(db.open_tree("ledger").unwrap()).unwrap()
    }

    fn options() -> Vec<String> {
        vec!["yes".to_string(), "no".to_string()]
    }

    async fn expect_confirmed(chain: &DevChain, tx: &TxId) {
        assert_eq!(
            chain.wait_for_confirmation(tx).await.unwrap(),
            TxStatus::Confirmed
        );
    }

    async fn expect_reverted(chain: &DevChain, tx: &TxId, reason: &str) {
        assert_eq!(
            chain.wait_for_confirmation(tx).await.unwrap(),
            TxStatus::Reverted(reason.to_string())
        );
    }

    #[async_std::test]
    async fn create_assigns_sequential_ids() {
        let chain = chain();
        for expected in 0..3u64 {
            let submitted = chain
                .submit_create_poll("Best color?", &options(), addr(1))
                .await
                .unwrap();
            expect_confirmed(&chain, &submitted.tx).await;
            assert_eq!(submitted.poll_id, expected);
            assert_eq!(chain.poll_count().await.unwrap(), expected + 1);
        }
        let info = chain.poll_info(2).await.unwrap();
        assert_eq!(info.creator, addr(1));
        assert!(!info.ended);
        assert_eq!(chain.total_polls_created(addr(1)).await.unwrap(), 3);
        assert_eq!(chain.daily_polls_created(addr(1)).await.unwrap(), 3);
    }

    #[async_std::test]
    async fn daily_limit_reverts_further_creates() {
        let chain = chain();
        for _ in 0..DAILY_POLL_LIMIT {
            let submitted = chain
                .submit_create_poll("p", &options(), addr(1))
                .await
                .unwrap();
            expect_confirmed(&chain, &submitted.tx).await;
        }
        let submitted = chain
            .submit_create_poll("p", &options(), addr(1))
            .await
            .unwrap();
        expect_reverted(&chain, &submitted.tx, "daily poll limit reached").await;
        assert_eq!(chain.poll_count().await.unwrap(), DAILY_POLL_LIMIT);
        // other wallets are unaffected
        let submitted = chain
            .submit_create_poll("p", &options(), addr(2))
            .await
            .unwrap();
        expect_confirmed(&chain, &submitted.tx).await;
        assert_eq!(submitted.poll_id, DAILY_POLL_LIMIT);
    }

    #[async_std::test]
    async fn vote_updates_tallies_and_rewards() {
        let chain = chain();
        let submitted = chain
            .submit_create_poll("Best pet?", &options(), addr(1))
            .await
            .unwrap();
        expect_confirmed(&chain, &submitted.tx).await;

        let tx = chain.submit_vote(0, 1, addr(2)).await.unwrap();
        expect_confirmed(&chain, &tx).await;

        let opts = chain.poll_options(0).await.unwrap();
        assert_eq!(opts.votes, vec![0, 1]);
        assert_eq!(chain.poll_info(0).await.unwrap().total_votes, 1);
        assert!(chain.has_voted(0, addr(2)).await.unwrap());
        assert!(!chain.has_voted(0, addr(3)).await.unwrap());
        assert_eq!(chain.balance_of(addr(2)).await.unwrap(), VOTER_REWARD);
        assert_eq!(
            chain.pending_creator_rewards(addr(1)).await.unwrap(),
            CREATOR_REWARD_PER_VOTE
        );
    }

    #[async_std::test]
    async fn vote_revert_cases() {
        let chain = chain();
        let submitted = chain
            .submit_create_poll("p", &options(), addr(1))
            .await
            .unwrap();
        expect_confirmed(&chain, &submitted.tx).await;

        let tx = chain.submit_vote(9, 0, addr(2)).await.unwrap();
        expect_reverted(&chain, &tx, "poll not found").await;

        let tx = chain.submit_vote(0, 5, addr(2)).await.unwrap();
        expect_reverted(&chain, &tx, "invalid option").await;

        let tx = chain.submit_vote(0, 0, addr(2)).await.unwrap();
        expect_confirmed(&chain, &tx).await;
        let tx = chain.submit_vote(0, 1, addr(2)).await.unwrap();
        expect_reverted(&chain, &tx, "already voted").await;
        // the reverted double vote left no trace
        assert_eq!(chain.poll_info(0).await.unwrap().total_votes, 1);
    }

    #[async_std::test]
    async fn expired_polls_reject_votes() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let chain = DevChain::open(db.open_tree("ledger").unwrap())
            .unwrap()
            .with_poll_duration(0);
        let submitted = chain
            .submit_create_poll("p", &options(), addr(1))
            .await
            .unwrap();
        expect_confirmed(&chain, &submitted.tx).await;
        assert!(chain.poll_info(0).await.unwrap().ended);
        let tx = chain.submit_vote(0, 0, addr(2)).await.unwrap();
        expect_reverted(&chain, &tx, "poll has ended").await;
    }

    #[async_std::test]
    async fn claim_pays_out_once() {
        let chain = chain();
        let submitted = chain
            .submit_create_poll("p", &options(), addr(1))
            .await
            .unwrap();
        expect_confirmed(&chain, &submitted.tx).await;
        let tx = chain.submit_vote(0, 0, addr(2)).await.unwrap();
        expect_confirmed(&chain, &tx).await;

        let tx = chain.submit_claim_reward(addr(1)).await.unwrap();
        expect_confirmed(&chain, &tx).await;
        assert_eq!(
            chain.balance_of(addr(1)).await.unwrap(),
            CREATOR_REWARD_PER_VOTE
        );
        assert_eq!(chain.pending_creator_rewards(addr(1)).await.unwrap(), 0);

        let tx = chain.submit_claim_reward(addr(1)).await.unwrap();
        expect_reverted(&chain, &tx, "nothing to claim").await;
    }

    #[async_std::test]
    async fn unknown_transactions_are_an_error() {
        let chain = chain();
        let missing = TxId::new("0xdeadbeef");
        assert!(chain.wait_for_confirmation(&missing).await.is_err());
    }

    #[async_std::test]
    async fn state_survives_reopen() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let tree = db.open_tree("ledger").unwrap();
        {
            let chain = DevChain::open(tree.clone()).unwrap();
            let submitted = chain
                .submit_create_poll("p", &options(), addr(1))
                .await
                .unwrap();
            expect_confirmed(&chain, &submitted.tx).await;
        }
        let chain = DevChain::open(tree).unwrap();
        assert_eq!(chain.poll_count().await.unwrap(), 1);
        assert_eq!(chain.poll_info(0).await.unwrap().title, "p");
    }
}
