use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] hubvote_client::Error),
    #[error(transparent)]
    Sled(#[from] sled::Error),

    #[error("Failed to find config dir. Use `--path` to supply a suitable directory.")]
    ConfigDirNotFound,
    #[error("No wallet connected. Run `hubvote wallet connect <address>` first.")]
    NoWalletConnected,
    #[error("No profile for {0}. Run `hubvote profile register <nickname>` first.")]
    NoProfile(String),
    #[error("Stored session is corrupt; run `hubvote wallet connect` again.")]
    CorruptSession,
}
