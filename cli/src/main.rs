use crate::command::*;
use crate::error::Error;
use clap::Clap;
use exitfailure::ExitDisplay;
use hubvote_client::{
    poll_set_stats, poll_status, time_remaining, to_tokens, Address, DevChain, Event, EventBus,
    HubClient, PollFilters, ProfileUpdate, RefreshScheduler, SledStore, SortBy, Subscription,
    ToastKind, DASHBOARD_REFRESH, DEFAULT_AVATAR, POLLS_REFRESH,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

mod command;
mod error;

#[async_std::main]
async fn main() -> Result<(), ExitDisplay<Error>> {
    Ok(run().await?)
}

type Client = HubClient<DevChain, SledStore>;

struct Paths {
    _root: PathBuf,
    db: PathBuf,
}

impl Paths {
    fn new(root: Option<PathBuf>) -> Result<Self, Error> {
        let root = if let Some(root) = root {
            root
        } else {
            dirs::config_dir()
                .ok_or(Error::ConfigDirNotFound)?
                .join("hubvote")
        };
        let db = root.join("db");
        Ok(Paths { _root: root, db })
    }
}

const SESSION_WALLET_KEY: &str = "wallet";

async fn run() -> Result<(), Error> {
    env_logger::init();
    let opts: Opts = Opts::parse();
    // initialize the embedded ledger and document store
    let paths = Paths::new(opts.path)?;
    log::debug!("opening database at {}", paths.db.display());
    let db = sled::open(&paths.db)?;
    let session = db.open_tree("session")?;
    let chain = Arc::new(DevChain::open(db.open_tree("ledger")?)?);
    let store = Arc::new(SledStore::new(&db)?);
    let bus = EventBus::new();
    let toasts = bus.subscribe();
    let mut client = Client::new(chain, store, bus.clone());
    if let Some(wallet) = stored_wallet(&session)? {
        client.connect_wallet(wallet);
    }
    // match on the passed in command
    match opts.cmd {
        SubCommand::Wallet(WalletCommand { cmd }) => match cmd {
            WalletSubCommand::Connect(WalletConnectCommand { address }) => {
                let wallet = Address::from_str(&address)?;
                session.insert(SESSION_WALLET_KEY, wallet.to_string().as_bytes())?;
                client.connect_wallet(wallet);
                println!("Connected wallet {}", wallet);
            }
            WalletSubCommand::Disconnect => {
                session.remove(SESSION_WALLET_KEY)?;
                client.disconnect_wallet();
                println!("Wallet disconnected");
            }
            WalletSubCommand::Show => match client.wallet() {
                Some(wallet) => {
                    println!("Wallet:   {}", wallet);
                    println!("Balance:  {} HUB", to_tokens(client.balance().await?));
                    println!(
                        "Pending:  {} HUB",
                        to_tokens(client.pending_rewards().await?)
                    );
                }
                None => println!("No wallet connected"),
            },
        },
        SubCommand::Profile(ProfileCommand { cmd }) => match cmd {
            ProfileSubCommand::Register(ProfileRegisterCommand { nickname, avatar }) => {
                let wallet = require_wallet(&client)?;
                let avatar = avatar.as_deref().unwrap_or(DEFAULT_AVATAR);
                let profile = client.profiles().create(wallet, &nickname, avatar).await?;
                println!("Registered {} {} for {}", profile.avatar, profile.nickname, wallet);
            }
            ProfileSubCommand::Show(ProfileShowCommand { address }) => {
                let wallet = match address {
                    Some(address) => {
                        Address::from_str(&address)?
                    }
                    None => require_wallet(&client)?,
                };
                let profile = client
                    .profiles()
                    .get(wallet)
                    .await?
                    .ok_or_else(|| Error::NoProfile(wallet.to_string()))?;
                println!("{} {}", profile.avatar, profile.nickname);
                println!("Wallet:       {}", profile.wallet_address);
                println!("Polls:        {}", profile.polls_created);
                println!("Votes:        {}", profile.votes_cast);
                println!("Reputation:   {}", profile.reputation);
                println!("Earned:       {} HUB", profile.total_earned);
                println!("Joined:       {}", profile.registered_at.format("%Y-%m-%d"));
            }
            ProfileSubCommand::Update(ProfileUpdateCommand { nickname, avatar }) => {
                let wallet = require_wallet(&client)?;
                let update = ProfileUpdate {
                    nickname,
                    avatar,
                    ..ProfileUpdate::default()
                };
                let profile = client.profiles().update(wallet, update).await?;
                println!("Profile updated: {} {}", profile.avatar, profile.nickname);
            }
        },
        SubCommand::Poll(PollCommand { cmd }) => match cmd {
            PollSubCommand::Create(PollCreateCommand { title, options }) => {
                let poll_id = client.create_poll(&title, options).await?;
                println!("Created poll {}", poll_id);
            }
            PollSubCommand::List(list) => {
                let filters = build_filters(&list)?;
                let polls = client.polls_filtered(&filters).await?;
                let stats = poll_set_stats(&polls, client.wallet());
                println!("{} ({} shown)", filters.summary(), polls.len());
                for poll in &polls {
                    let voted = if poll.has_voted { " [voted]" } else { "" };
                    println!(
                        "#{:<4} {:<40} {:>5} votes  {}{}",
                        poll.id,
                        poll.title,
                        poll.total_votes,
                        time_remaining(poll.end_time, now_ts()),
                        voted
                    );
                }
                println!(
                    "{} active, {} ended, {:.1} votes/poll",
                    stats.active, stats.ended, stats.average_votes
                );
            }
            PollSubCommand::Show(PollShowCommand { poll_id }) => {
                let poll = client.poll(poll_id).await?;
                println!("#{} {}", poll.id, poll.title);
                println!("Creator:  {}", poll.creator);
                println!(
                    "Status:   {:?} ({})",
                    poll_status(&poll, now_ts()),
                    time_remaining(poll.end_time, now_ts())
                );
                for (i, name) in poll.option_names.iter().enumerate() {
                    let votes = poll.option_votes[i];
                    let share = if poll.total_votes == 0 {
                        0.0
                    } else {
                        votes as f64 * 100.0 / poll.total_votes as f64
                    };
                    println!("  [{}] {:<30} {:>5} ({:.0}%)", i, name, votes, share);
                }
            }
        },
        SubCommand::Vote(VoteSubmitCommand { poll_id, option }) => {
            client.vote(poll_id, option).await?;
            println!("Voted option {} in poll {}", option, poll_id);
        }
        SubCommand::Claim => {
            let claimed = client.claim_reward().await?;
            println!("Claimed {} HUB", to_tokens(claimed));
        }
        SubCommand::Leaderboard(LeaderboardCommand {
            page,
            search,
            refresh,
        }) => {
            if refresh {
                let users = client.leaderboard().refresh().await?;
                println!("Leaderboard rebuilt ({} users)", users.len());
            }
            let search = search.unwrap_or_default();
            let view = client
                .leaderboard()
                .fetch(page, &search, client.wallet())
                .await?;
            println!(
                "Leaderboard page {}/{} ({} users)",
                page,
                view.total_pages.max(1),
                view.filtered_count
            );
            for user in &view.entries {
                println!(
                    "{:>3}. {} {:<20} {:>4} polls  {:>4} votes  rep {}",
                    user.rank, user.avatar, user.nickname, user.polls_created, user.votes_cast,
                    user.reputation
                );
            }
            if let Some(rank) = view.current_user_rank {
                println!("Your rank: #{}", rank);
            }
        }
        SubCommand::Stats => {
            let stats = client.stats().current().await?;
            println!("Polls:   {} ({} active)", stats.total_polls, stats.active_polls);
            println!("Users:   {}", stats.total_users);
            println!("Votes:   {}", stats.total_votes);
            println!("Updated: {}", stats.last_updated.format("%Y-%m-%d %H:%M UTC"));
        }
        SubCommand::Dashboard(DashboardCommand { watch }) => {
            if watch {
                watch_dashboard(&client, &bus).await?;
            } else {
                print_dashboard(&client).await?;
            }
        }
    }
    print_toasts(&toasts);
    Ok(())
}

fn stored_wallet(session: &sled::Tree) -> Result<Option<Address>, Error> {
    let raw = match session.get(SESSION_WALLET_KEY)? {
        Some(raw) => raw,
        None => return Ok(None),
    };
    let text = std::str::from_utf8(&raw).map_err(|_| Error::CorruptSession)?;
    let wallet = Address::from_str(text).map_err(|_| Error::CorruptSession)?;
    Ok(Some(wallet))
}

fn require_wallet(client: &Client) -> Result<Address, Error> {
    client.wallet().ok_or(Error::NoWalletConnected)
}

fn build_filters(list: &PollListCommand) -> Result<PollFilters, Error> {
    let mut filters = PollFilters::default();
    // any explicit status flag replaces the default active-only view
    if list.active || list.ended || list.my_polls || list.voted {
        filters.active = list.active;
        filters.ended = list.ended;
        filters.my_polls = list.my_polls;
        filters.voted = list.voted;
    }
    filters.sort_by = SortBy::from_str(&list.sort)?;
    filters.search = list.search.clone().unwrap_or_default();
    Ok(filters)
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

async fn print_dashboard(client: &Client) -> Result<(), Error> {
    let data = client.dashboard().load().await?;
    println!(
        "Community: {} polls ({} active), {} users, {} votes",
        data.global.total_polls,
        data.global.active_polls,
        data.global.total_users,
        data.global.total_votes
    );
    if data.registration_required {
        println!("No profile yet; run `hubvote profile register <nickname>`");
    }
    if let Some(stats) = &data.user_stats {
        let rank = stats
            .rank
            .map(|r| format!("#{}", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "You: {} polls, {} votes, rep {}, {} HUB, rank {}",
            stats.polls_created, stats.votes_cast, stats.reputation, stats.token_balance, rank
        );
    }
    for user in &data.leaderboard.entries {
        println!(
            "{:>3}. {} {:<20} {:>4} polls",
            user.rank, user.avatar, user.nickname, user.polls_created
        );
    }
    Ok(())
}

/// Re-renders on the view refresh intervals until interrupted.
async fn watch_dashboard(client: &Client, bus: &EventBus) -> Result<(), Error> {
    let votes = bus.subscribe();
    let mut scheduler = RefreshScheduler::new();
    scheduler.register("polls", POLLS_REFRESH);
    scheduler.register("dashboard", DASHBOARD_REFRESH);
    loop {
        let now = Instant::now();
        for task in scheduler.due(now) {
            match task {
                "polls" => {
                    let polls = client.all_polls().await?;
                    let stats = poll_set_stats(&polls, client.wallet());
                    println!(
                        "[polls] {} total, {} active, {} votes",
                        stats.total, stats.active, stats.total_votes
                    );
                }
                "dashboard" => {
                    client.dashboard().process_events(&votes).await?;
                    print_dashboard(client).await?;
                }
                _ => unreachable!(),
            }
            scheduler.mark_ran(task, now);
        }
        let pause = scheduler
            .next_deadline(Instant::now())
            .unwrap_or(DASHBOARD_REFRESH);
        async_std::task::sleep(pause.max(std::time::Duration::from_millis(100))).await;
    }
}

fn print_toasts(toasts: &Subscription) {
    for event in toasts.drain() {
        if let Event::Toast { message, kind } = event {
            let prefix = match kind {
                ToastKind::Success => "ok",
                ToastKind::Error => "error",
                ToastKind::Info => "info",
            };
            println!("[{}] {}", prefix, message);
        }
    }
}
