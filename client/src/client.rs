//! Top-level client composing the contract facade, the document store and
//! the event bus into the operations the views consume.

use crate::chain::{PollChain, TxStatus};
use crate::dashboard::Dashboard;
use crate::error::{Error, Result};
use crate::events::{Event, EventBus, Subscription};
use crate::flows::WriteFlow;
use crate::leaderboard::Leaderboard;
use crate::poll::{filter_and_sort, Address, PollFilters, PollId, PollSummary};
use crate::profile::ProfileService;
use crate::stats::StatsService;
use crate::store::DocumentStore;
use std::sync::Arc;

pub struct HubClient<C, S> {
    chain: Arc<C>,
    store: Arc<S>,
    bus: EventBus,
    wallet: Option<Address>,
    profiles: ProfileService<S>,
    stats: StatsService<S>,
    leaderboard: Leaderboard<S>,
    // drives the event-fed counters after each of this client's own writes
    own_events: Subscription,
}

impl<C: PollChain, S: DocumentStore> HubClient<C, S> {
    pub fn new(chain: Arc<C>, store: Arc<S>, bus: EventBus) -> Self {
        let own_events = bus.subscribe();
        HubClient {
            chain: chain.clone(),
            store: store.clone(),
            bus,
            wallet: None,
            profiles: ProfileService::new(store.clone()),
            stats: StatsService::new(store.clone()),
            leaderboard: Leaderboard::new(store),
            own_events,
        }
    }

    pub fn connect_wallet(&mut self, wallet: Address) {
        log::info!("wallet {} connected", wallet);
        self.wallet = Some(wallet);
    }

    pub fn disconnect_wallet(&mut self) {
        self.wallet = None;
    }

    pub fn wallet(&self) -> Option<Address> {
        self.wallet
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn profiles(&self) -> &ProfileService<S> {
        &self.profiles
    }

    pub fn stats(&self) -> &StatsService<S> {
        &self.stats
    }

    pub fn leaderboard(&self) -> &Leaderboard<S> {
        &self.leaderboard
    }

    pub fn dashboard(&self) -> Dashboard<'_, C, S> {
        Dashboard::new(self)
    }

    fn require_wallet(&self) -> Result<Address> {
        self.wallet.ok_or(Error::WalletNotConnected)
    }

    /// Composes the contract reads for one poll into a summary for the
    /// connected wallet.
    pub async fn poll(&self, id: PollId) -> Result<PollSummary> {
        let info = self.chain.poll_info(id).await?;
        let options = self.chain.poll_options(id).await?;
        let has_voted = match self.wallet {
            Some(wallet) => self.chain.has_voted(id, wallet).await?,
            None => false,
        };
        Ok(PollSummary {
            id,
            title: info.title,
            creator: info.creator,
            ended: info.ended,
            end_time: info.end_time,
            total_votes: info.total_votes,
            option_names: options.names,
            option_votes: options.votes,
            has_voted,
        })
    }

    pub async fn all_polls(&self) -> Result<Vec<PollSummary>> {
        let count = self.chain.poll_count().await?;
        let mut polls = Vec::with_capacity(count as usize);
        for id in 0..count {
            polls.push(self.poll(id).await?);
        }
        Ok(polls)
    }

    pub async fn polls_filtered(&self, filters: &PollFilters) -> Result<Vec<PollSummary>> {
        let polls = self.all_polls().await?;
        Ok(filter_and_sort(&polls, filters, self.wallet))
    }

    pub async fn balance(&self) -> Result<u128> {
        self.chain.balance_of(self.require_wallet()?).await
    }

    pub async fn pending_rewards(&self) -> Result<u128> {
        self.chain
            .pending_creator_rewards(self.require_wallet()?)
            .await
    }

    /// Creates a poll and, once the transaction is confirmed, fans the
    /// result out to events and the shared counter documents.
    pub async fn create_poll(&self, title: &str, options: Vec<String>) -> Result<PollId> {
        let wallet = self.require_wallet()?;
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(Error::EmptyTitle);
        }
        let options: Vec<String> = options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if options.len() < 2 {
            return Err(Error::TooFewOptions);
        }
        let mut flow = WriteFlow::new("create-poll");
        match self.create_poll_confirmed(&mut flow, wallet, &title, &options).await {
            Ok(poll_id) => {
                self.bus.dispatch(Event::PollCreated { poll_id });
                self.bus
                    .dispatch(Event::success_toast(format!("Poll \"{}\" created", title)));
                self.refresh_poll_counters().await?;
                self.profiles.sync_chain_stats(self.chain.as_ref(), wallet).await?;
                self.pump_events().await?;
                Ok(poll_id)
            }
            Err(err) => {
                flow.failed(err.to_string());
                self.bus.dispatch(Event::error_toast(err.to_string()));
                Err(err)
            }
        }
    }

    async fn create_poll_confirmed(
        &self,
        flow: &mut WriteFlow,
        wallet: Address,
        title: &str,
        options: &[String],
    ) -> Result<PollId> {
        flow.submitting()?;
        let submitted = self
            .chain
            .submit_create_poll(title, options, wallet)
            .await?;
        log::info!("create-poll transaction sent: {}", submitted.tx);
        flow.awaiting(submitted.tx.clone())?;
        match self.chain.wait_for_confirmation(&submitted.tx).await? {
            TxStatus::Confirmed => {}
            TxStatus::Reverted(reason) => return Err(classify_failure(reason)),
        }
        flow.confirmed()?;
        // the id was fixed at submission, so creates landing in between
        // cannot shift it
        Ok(submitted.poll_id)
    }

    /// Casts a vote. Preflight checks reject without submitting; after the
    /// confirmed write the vote is fanned out to events, the voter profile
    /// and the global counters.
    pub async fn vote(&self, poll_id: PollId, option: usize) -> Result<()> {
        let wallet = self.require_wallet()?;
        let summary = self.poll(poll_id).await?;
        if summary.ended {
            return Err(Error::PollEnded(poll_id));
        }
        if summary.has_voted {
            return Err(Error::AlreadyVoted(poll_id));
        }
        if option >= summary.option_names.len() {
            return Err(Error::InvalidOption {
                poll: poll_id,
                option,
            });
        }
        let mut flow = WriteFlow::new("vote");
        match self.vote_confirmed(&mut flow, poll_id, option, wallet).await {
            Ok(()) => {
                self.bus.dispatch(Event::VoteCompleted { poll_id });
                self.bus.dispatch(Event::UserVoted {
                    poll_id,
                    voter: wallet,
                });
                self.bus.dispatch(Event::success_toast(format!(
                    "Vote cast in poll {}",
                    poll_id
                )));
                self.pump_events().await?;
                self.profiles.sync_chain_stats(self.chain.as_ref(), wallet).await?;
                Ok(())
            }
            Err(err) => {
                flow.failed(err.to_string());
                self.bus.dispatch(Event::error_toast(err.to_string()));
                Err(err)
            }
        }
    }

    async fn vote_confirmed(
        &self,
        flow: &mut WriteFlow,
        poll_id: PollId,
        option: usize,
        wallet: Address,
    ) -> Result<()> {
        flow.submitting()?;
        let tx = self.chain.submit_vote(poll_id, option, wallet).await?;
        log::info!("vote transaction sent: {}", tx);
        flow.awaiting(tx.clone())?;
        match self.chain.wait_for_confirmation(&tx).await? {
            TxStatus::Confirmed => {}
            TxStatus::Reverted(reason) => return Err(classify_failure(reason)),
        }
        flow.confirmed()?;
        Ok(())
    }

    /// Claims pending creator rewards; returns the claimed 18-decimal
    /// amount.
    pub async fn claim_reward(&self) -> Result<u128> {
        let wallet = self.require_wallet()?;
        let pending = self.chain.pending_creator_rewards(wallet).await?;
        if pending == 0 {
            return Err(Error::NothingToClaim);
        }
        let mut flow = WriteFlow::new("claim-reward");
        match self.claim_confirmed(&mut flow, wallet).await {
            Ok(()) => {
                self.bus.dispatch(Event::RewardClaimed {
                    wallet,
                    amount: pending,
                });
                self.bus
                    .dispatch(Event::success_toast("Creator rewards claimed"));
                self.pump_events().await?;
                self.profiles.sync_chain_stats(self.chain.as_ref(), wallet).await?;
                Ok(pending)
            }
            Err(err) => {
                flow.failed(err.to_string());
                self.bus.dispatch(Event::error_toast(err.to_string()));
                Err(err)
            }
        }
    }

    async fn claim_confirmed(&self, flow: &mut WriteFlow, wallet: Address) -> Result<()> {
        flow.submitting()?;
        let tx = self.chain.submit_claim_reward(wallet).await?;
        log::info!("claim-reward transaction sent: {}", tx);
        flow.awaiting(tx.clone())?;
        match self.chain.wait_for_confirmation(&tx).await? {
            TxStatus::Confirmed => {}
            TxStatus::Reverted(reason) => return Err(classify_failure(reason)),
        }
        flow.confirmed()?;
        Ok(())
    }

    /// Refreshes the shared poll counters from the source of truth.
    async fn refresh_poll_counters(&self) -> Result<()> {
        let polls = self.all_polls().await?;
        let active = polls.iter().filter(|p| !p.ended).count() as u64;
        self.stats.update_poll_count(polls.len() as u64).await?;
        self.stats.update_active_polls(active).await?;
        Ok(())
    }

    /// Applies the event-fed increments queued by this client's own
    /// dispatches: every `UserVoted` bumps the global vote counter and, when
    /// it matches the connected wallet, the profile's vote stats.
    async fn pump_events(&self) -> Result<()> {
        for event in self.own_events.drain() {
            if let Event::UserVoted { voter, .. } = event {
                self.stats.increment_votes().await?;
                if Some(voter) == self.wallet {
                    self.profiles.record_vote(voter).await?;
                }
            }
        }
        Ok(())
    }
}

/// The failure taxonomy is message-substring based: wallet rejections are
/// distinguished from contract reverts by their text.
fn classify_failure(reason: String) -> Error {
    let lower = reason.to_lowercase();
    if lower.contains("rejected") || lower.contains("denied") {
        Error::Rejected(reason)
    } else {
        Error::Reverted(reason)
    }
}
