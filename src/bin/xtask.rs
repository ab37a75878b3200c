use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use leaderboard::{
    Leaderboard, LeaderboardOptions, Order, RankPolicy, RedisStore, RequestOptions,
};
use log::info;
use std::{
    process::{Command, Stdio},
    thread,
    time::Duration,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Launch a throwaway valkey-server for poking at leaderboards by hand.
    StartValkey {
        /// Optional fixed port. If omitted an unused one is picked automatically.
        #[arg(long)]
        port: Option<u16>,
        /// Extra arguments forwarded verbatim to valkey-server
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Fill a leaderboard with `count` members scored from a fixed sequence.
    Seed {
        #[command(flatten)]
        board: BoardArgs,
        #[arg(long, default_value_t = 100)]
        count: usize,
        /// Number of distinct scores to spread the members over.
        #[arg(long, default_value_t = 20)]
        distinct: usize,
    },
    /// Print one page of a leaderboard, or the page around a member.
    Show {
        #[command(flatten)]
        board: BoardArgs,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long)]
        around: Option<String>,
    },
    /// Compare a leaderboard's tie index with its scores, optionally repairing it.
    CheckTies {
        #[command(flatten)]
        board: BoardArgs,
        #[arg(long)]
        repair: bool,
    },
}

#[derive(Args)]
struct BoardArgs {
    #[arg(long, default_value = "redis://127.0.0.1:6379")]
    url: String,
    #[arg(long, default_value = "highscores")]
    name: String,
    #[arg(long, value_enum, default_value = "standard")]
    policy: PolicyArg,
    #[arg(long)]
    low_to_high: bool,
    #[arg(long, default_value_t = leaderboard::DEFAULT_PAGE_SIZE)]
    page_size: usize,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum PolicyArg {
    Standard,
    TieAware,
    Dense,
}

impl BoardArgs {
    fn open(&self) -> Result<Leaderboard<RedisStore>> {
        let store =
            RedisStore::open(&self.url).with_context(|| format!("connecting to {}", self.url))?;
        let policy = match self.policy {
            PolicyArg::Standard => RankPolicy::Standard,
            PolicyArg::TieAware => RankPolicy::TieAware,
            PolicyArg::Dense => RankPolicy::Dense,
        };
        let order = if self.low_to_high {
            Order::LowToHigh
        } else {
            Order::HighToLow
        };
        let options = LeaderboardOptions::default()
            .with_policy(policy)
            .with_order(order)
            .with_page_size(self.page_size);
        Ok(Leaderboard::with_options(&self.name, store, options))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::StartValkey { port, args } => start_valkey(port, &args),
        Cmd::Seed {
            board,
            count,
            distinct,
        } => seed(&board, count, distinct),
        Cmd::Show {
            board,
            page,
            around,
        } => show(&board, page, around.as_deref()),
        Cmd::CheckTies { board, repair } => check_ties(&board, repair),
    }
}

fn seed(args: &BoardArgs, count: usize, distinct: usize) -> Result<()> {
    anyhow::ensure!(distinct > 0, "--distinct must be positive");
    let mut board = args.open()?;
    let members: Vec<(String, f64)> = (0..count)
        .map(|i| (format!("member_{i}"), ((i * 7919) % distinct) as f64 * 10.0))
        .collect();
    board.rank_members(&members)?;
    info!("seeded {count} members into {}", board.name());
    let total = board.total_members()?;
    println!("{} now holds {total} members", board.name());
    Ok(())
}

fn show(args: &BoardArgs, page: i64, around: Option<&str>) -> Result<()> {
    let mut board = args.open()?;
    let request = RequestOptions::default();
    let entries = match around {
        Some(member) => board.around_me(member, &request)?,
        None => board.leaders(page, &request)?,
    };
    if entries.is_empty() {
        println!("(empty)");
    }
    for entry in entries {
        let rank = entry.rank.map_or_else(|| "-".to_owned(), |r| r.to_string());
        let score = entry.score.map_or_else(|| "-".to_owned(), |s| s.to_string());
        println!("{rank:>6}  {score:>12}  {}", entry.member);
    }
    Ok(())
}

fn check_ties(args: &BoardArgs, repair: bool) -> Result<()> {
    let mut board = args.open()?;
    let report = board.check_tie_index()?;
    println!(
        "missing: {:?}\nstale:   {:?}",
        report.missing, report.stale
    );
    if repair && !report.is_consistent() {
        let written = board.rebuild_tie_index()?;
        println!("rebuilt {} with {written} scores", board.ties_key());
    }
    Ok(())
}

fn start_valkey(port_opt: Option<u16>, extra_args: &[String]) -> Result<()> {
    let port = match port_opt {
        Some(port) => port,
        None => portpicker::pick_unused_port().context("no free ports")?,
    };

    let mut cmd = Command::new("valkey-server");
    cmd.arg("--port")
        .arg(port.to_string())
        .arg("--save")
        .arg("") // disable RDB
        .arg("--daemonize")
        .arg("no")
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    // pass-through additional flags
    cmd.args(extra_args);

    let mut child = cmd.spawn().context("failed to start valkey-server")?;

    // wait until the server answers PING
    for _ in 0..20u8 {
        if redis::Client::open(format!("redis://127.0.0.1:{port}"))
            .and_then(|c| c.get_connection())
            .and_then(|mut con| redis::cmd("PING").query::<String>(&mut con))
            .map(|p| p == "PONG")
            .unwrap_or(false)
        {
            println!("=> valkey-server on port {port}");
            println!("=> redis url  redis://127.0.0.1:{port}");
            println!("=> try: cargo run --bin xtask -- seed --url redis://127.0.0.1:{port}");
            let status = child.wait()?;
            anyhow::bail!("valkey-server exited with status {status}");
        }
        thread::sleep(Duration::from_millis(100));
    }
    let _ = child.kill();
    anyhow::bail!("valkey-server failed to start");
}
