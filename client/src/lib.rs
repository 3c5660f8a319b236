mod chain;
mod client;
mod dashboard;
mod dev;
mod error;
mod events;
mod flows;
mod leaderboard;
mod poll;
mod profile;
mod scheduler;
mod stats;
mod store;

pub use chain::{
    to_tokens, PollChain, PollInfo, PollOptions, SubmittedPoll, TxId, TxStatus, ONE_TOKEN,
};
pub use client::HubClient;
pub use dashboard::{Dashboard, DashboardData, UserStats};
pub use dev::{
    DevChain, CREATOR_REWARD_PER_VOTE, DAILY_POLL_LIMIT, DEFAULT_POLL_DURATION_SECS, VOTER_REWARD,
};
pub use error::{Error, Result};
pub use events::{Event, EventBus, Subscription, ToastKind};
pub use flows::{FlowState, WriteFlow};
pub use leaderboard::{
    Leaderboard, LeaderboardView, CACHE_FRESHNESS_HOURS, DEFAULT_PAGE_SIZE, QUERY_CAP,
};
pub use poll::{
    filter_and_sort, filter_polls, is_ending_soon, poll_set_stats, poll_status, sort_polls,
    time_remaining, Address, PollFilters, PollId, PollSetStats, PollStatus, PollSummary, SortBy,
};
pub use profile::{ProfileService, DEFAULT_AVATAR, MIN_NICKNAME_LEN, VOTE_REPUTATION};
pub use scheduler::{RefreshScheduler, DASHBOARD_REFRESH, POLLS_REFRESH};
pub use stats::StatsService;
pub use store::{
    DocumentStore, GlobalStats, LeaderboardCache, LeaderboardUser, ProfileUpdate, SledStore,
    StatField, UserProfile,
};
