//! Facade over the on-chain voting contract.
//!
//! Reads mirror the contract's view functions; writes submit a transaction
//! and return its id before finality. Callers must suspend on
//! [`PollChain::wait_for_confirmation`] before treating a write as applied.

use crate::error::Result;
use crate::poll::{Address, PollId};
use async_trait::async_trait;
use core::fmt;
use serde::{Deserialize, Serialize};

/// 18-decimal fixed-point token unit.
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Convert an 18-decimal amount into whole tokens for display and documents.
pub fn to_tokens(amount: u128) -> f64 {
    amount as f64 / ONE_TOKEN as f64
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        TxId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TxStatus {
    Confirmed,
    Reverted(String),
}

/// Handle for an in-flight poll creation. The id is assigned when the
/// ledger accepts the submission and is only meaningful once the
/// transaction confirms.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmittedPoll {
    pub tx: TxId,
    pub poll_id: PollId,
}

/// `getPollInfo` result.
#[derive(Clone, Debug, PartialEq)]
pub struct PollInfo {
    pub title: String,
    pub creator: Address,
    pub ended: bool,
    pub end_time: i64,
    pub total_votes: u64,
}

/// `getPollOptionsWithVotes` result; the vectors are parallel.
#[derive(Clone, Debug, PartialEq)]
pub struct PollOptions {
    pub names: Vec<String>,
    pub votes: Vec<u64>,
}

#[async_trait]
pub trait PollChain: Send + Sync {
    async fn poll_count(&self) -> Result<u64>;
    async fn poll_info(&self, id: PollId) -> Result<PollInfo>;
    async fn poll_options(&self, id: PollId) -> Result<PollOptions>;
    async fn has_voted(&self, id: PollId, wallet: Address) -> Result<bool>;
    /// Token balance in 18-decimal units.
    async fn balance_of(&self, wallet: Address) -> Result<u128>;
    async fn pending_creator_rewards(&self, wallet: Address) -> Result<u128>;
    async fn total_polls_created(&self, wallet: Address) -> Result<u64>;
    async fn daily_polls_created(&self, wallet: Address) -> Result<u64>;

    async fn submit_create_poll(
        &self,
        title: &str,
        options: &[String],
        creator: Address,
    ) -> Result<SubmittedPoll>;
    async fn submit_vote(&self, id: PollId, option: usize, voter: Address) -> Result<TxId>;
    async fn submit_claim_reward(&self, wallet: Address) -> Result<TxId>;

    /// Suspends until the ledger acknowledges the transaction as final.
    async fn wait_for_confirmation(&self, tx: &TxId) -> Result<TxStatus>;
}
