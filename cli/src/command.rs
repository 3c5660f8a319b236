use clap::Clap;
use std::path::PathBuf;

#[derive(Clone, Debug, Clap)]
pub struct Opts {
    #[clap(subcommand)]
    pub cmd: SubCommand,
    #[clap(short = 'p', long = "path")]
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, Clap)]
pub enum SubCommand {
    Wallet(WalletCommand),
    Profile(ProfileCommand),
    Poll(PollCommand),
    Vote(VoteSubmitCommand),
    Claim,
    Leaderboard(LeaderboardCommand),
    Stats,
    Dashboard(DashboardCommand),
}

#[derive(Clone, Debug, Clap)]
pub struct WalletCommand {
    #[clap(subcommand)]
    pub cmd: WalletSubCommand,
}

#[derive(Clone, Debug, Clap)]
pub enum WalletSubCommand {
    Connect(WalletConnectCommand),
    Disconnect,
    Show,
}

#[derive(Clone, Debug, Clap)]
pub struct WalletConnectCommand {
    /// 20-byte hex address, with or without the 0x prefix.
    pub address: String,
}

#[derive(Clone, Debug, Clap)]
pub struct ProfileCommand {
    #[clap(subcommand)]
    pub cmd: ProfileSubCommand,
}

#[derive(Clone, Debug, Clap)]
pub enum ProfileSubCommand {
    Register(ProfileRegisterCommand),
    Show(ProfileShowCommand),
    Update(ProfileUpdateCommand),
}

#[derive(Clone, Debug, Clap)]
pub struct ProfileRegisterCommand {
    pub nickname: String,
    #[clap(short = 'a', long = "avatar")]
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, Clap)]
pub struct ProfileShowCommand {
    /// Defaults to the connected wallet.
    pub address: Option<String>,
}

#[derive(Clone, Debug, Clap)]
pub struct ProfileUpdateCommand {
    #[clap(short = 'n', long = "nickname")]
    pub nickname: Option<String>,
    #[clap(short = 'a', long = "avatar")]
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, Clap)]
pub struct PollCommand {
    #[clap(subcommand)]
    pub cmd: PollSubCommand,
}

#[derive(Clone, Debug, Clap)]
pub enum PollSubCommand {
    Create(PollCreateCommand),
    List(PollListCommand),
    Show(PollShowCommand),
}

#[derive(Clone, Debug, Clap)]
pub struct PollCreateCommand {
    pub title: String,
    /// At least two option labels.
    #[clap(required = true)]
    pub options: Vec<String>,
}

#[derive(Clone, Debug, Clap)]
pub struct PollListCommand {
    #[clap(long = "active")]
    pub active: bool,
    #[clap(long = "ended")]
    pub ended: bool,
    #[clap(long = "my-polls")]
    pub my_polls: bool,
    #[clap(long = "voted")]
    pub voted: bool,
    #[clap(short = 's', long = "search")]
    pub search: Option<String>,
    /// newest, most-votes or ending-soon.
    #[clap(long = "sort", default_value = "newest")]
    pub sort: String,
}

#[derive(Clone, Debug, Clap)]
pub struct PollShowCommand {
    pub poll_id: u64,
}

#[derive(Clone, Debug, Clap)]
pub struct VoteSubmitCommand {
    pub poll_id: u64,
    /// Zero-based option index.
    pub option: usize,
}

#[derive(Clone, Debug, Clap)]
pub struct LeaderboardCommand {
    #[clap(default_value = "1")]
    pub page: usize,
    #[clap(short = 's', long = "search")]
    pub search: Option<String>,
    /// Rebuild the ranking from a live profile query instead of the cache.
    #[clap(long = "refresh")]
    pub refresh: bool,
}

#[derive(Clone, Debug, Clap)]
pub struct DashboardCommand {
    /// Keep refreshing on the view intervals instead of printing once.
    #[clap(short = 'w', long = "watch")]
    pub watch: bool,
}
