use crate::chain::TxId;
use crate::poll::{Address, PollId};
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no wallet connected")]
    WalletNotConnected,
    #[error("invalid wallet address `{0}`")]
    InvalidAddress(String),
    #[error("nickname must be at least {0} characters")]
    NicknameTooShort(usize),
    #[error("nickname `{0}` is already taken")]
    NicknameTaken(String),
    #[error("no profile registered for {0}")]
    ProfileNotFound(Address),
    #[error("poll title must not be empty")]
    EmptyTitle,
    #[error("a poll needs at least two options")]
    TooFewOptions,
    #[error("poll {0} not found")]
    PollNotFound(PollId),
    #[error("poll {0} has already ended")]
    PollEnded(PollId),
    #[error("already voted in poll {0}")]
    AlreadyVoted(PollId),
    #[error("poll {poll} has no option {option}")]
    InvalidOption { poll: PollId, option: usize },
    #[error("no pending creator rewards to claim")]
    NothingToClaim,
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxId),
    #[error("invalid {op} transition from {from} to {to}")]
    FlowTransition {
        op: &'static str,
        from: &'static str,
        to: &'static str,
    },
    #[error("unknown sort key `{0}`")]
    UnknownSortKey(String),
    #[error(transparent)]
    Store(#[from] sled::Error),
    #[error(transparent)]
    Codec(#[from] serde_json::Error),
}
