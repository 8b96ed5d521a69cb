//! vfl-poller entry point.
//!
//! Subcommands: continuous polling, a single cycle, a reachability probe,
//! the host process with health endpoints, and three read-only reports.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use axum::Router;
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use vfl_poller::api;
use vfl_poller::app_state::AppState;
use vfl_poller::config::{PollerConfig, SinkConfig};
use vfl_poller::domain::{CompetitionId, Fetched, MatchOdds, MatchesSnapshot, TimingsSnapshot};
use vfl_poller::feed::{self, FeedSource, HttpFeed};
use vfl_poller::persistence::tabular::{ODDS_COLUMNS, odds_rows};
use vfl_poller::persistence::{Sink, SnapshotFiles, write_table};
use vfl_poller::poller::{CycleOutcome, MatchesOutcome, Poller, TimingsOutcome};
use vfl_poller::report;

#[derive(Debug, Parser)]
#[command(name = "vfl-poller")]
#[command(about = "Adaptive poller for the virtual-football timings feed", version)]
struct Cli {
    /// Override the feed base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct SinkArgs {
    /// Line-delimited JSON log to append changes to.
    #[arg(long)]
    jsonl: Option<PathBuf>,
    /// CSV file to append changes to.
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Directory for the latest timings.json / matches.json.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl SinkArgs {
    fn apply(self, sinks: &mut SinkConfig) {
        if self.jsonl.is_some() {
            sinks.jsonl_path = self.jsonl;
        }
        if self.csv.is_some() {
            sinks.csv_path = self.csv;
        }
        if self.data_dir.is_some() {
            sinks.data_dir = self.data_dir;
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Poll until interrupted.
    Poll(SinkArgs),
    /// Run exactly one cycle and exit.
    PollOnce(SinkArgs),
    /// Check that both endpoints are reachable; persists nothing.
    Probe,
    /// Poll in the background and serve health and snapshot endpoints.
    Serve {
        /// Address to listen on (overrides `LISTEN_ADDR`).
        #[arg(long)]
        listen: Option<SocketAddr>,
        #[command(flatten)]
        sinks: SinkArgs,
    },
    /// Show the next match on every channel.
    Upcoming,
    /// Show 1X2 odds for the next matches.
    Odds {
        /// Also write the table to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List the rounds of the active competition.
    Rounds,
}

/// Exit status after a second interrupt.
const FORCED_EXIT: i32 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = PollerConfig::from_env()?;
    if let Some(url) = &cli.base_url {
        config.feed = config.feed.with_base_url(url)?;
    }
    let feed = HttpFeed::new(&config.feed)?;
    tracing::debug!(base_url = feed.base_url(), "feed configured");

    match cli.command {
        Command::Poll(sinks) => {
            sinks.apply(&mut config.sinks);
            let mut poller = Poller::new(feed, Sink::new(&config.sinks), config.matches_refresh);
            poller.run(shutdown_on_interrupt()).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::PollOnce(sinks) => {
            sinks.apply(&mut config.sinks);
            let mut poller = Poller::new(feed, Sink::new(&config.sinks), config.matches_refresh);
            print_outcome(&poller.run_cycle().await);
            Ok(ExitCode::SUCCESS)
        }
        Command::Probe => Ok(probe(&feed).await),
        Command::Serve { listen, sinks } => {
            sinks.apply(&mut config.sinks);
            let addr = listen.unwrap_or(config.listen_addr);
            serve(feed, config, addr).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Upcoming => {
            let (timings, matches) = fetch_pair(&feed).await?;
            println!("Next match per channel:");
            for row in report::upcoming(&timings, &matches) {
                println!("  {row}");
            }
            println!("Last finished per channel:");
            for row in report::last_finished(&timings, &matches) {
                println!("  {row}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Odds { csv } => {
            let (timings, matches) = fetch_pair(&feed).await?;
            let mut odds: Vec<MatchOdds> = Vec::new();
            for match_id in report::next_match_ids(&timings, &matches, report::ODDS_MATCH_LIMIT) {
                match feed.fetch_match_odds(match_id).await {
                    Ok(fetched) => {
                        odds.push(MatchOdds::from_document(match_id, &fetched.into_document()));
                    }
                    Err(error) => tracing::warn!(match_id, %error, "odds request failed"),
                }
            }
            for row in &odds {
                println!("{row}");
            }
            if let Some(path) = csv {
                write_table(&path, &ODDS_COLUMNS, &odds_rows(&odds)).await?;
                tracing::info!(path = %path.display(), rows = odds.len(), "odds table written");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Rounds => {
            let (timings, matches) = fetch_pair(&feed).await?;
            let summary = report::round_summary(&timings, &matches);
            print!("{summary}");
            println!();
            println!("# JSON output");
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// A receiver that flips to `true` on Ctrl-C. A second Ctrl-C exits the
/// process at once, abandoning any in-flight cycle.
fn shutdown_on_interrupt() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        relay_interrupts(tokio::signal::ctrl_c, tx).await;
        tracing::warn!("second interrupt, exiting now");
        std::process::exit(FORCED_EXIT);
    });
    rx
}

/// Sends `true` on the first interrupt and returns on the second.
///
/// Never returns if interrupts cannot be received; the sender is kept
/// alive so receivers do not observe a close.
async fn relay_interrupts<F, Fut>(mut interrupt: F, tx: watch::Sender<bool>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(error) = interrupt().await {
        tracing::warn!(%error, "cannot listen for interrupts");
        std::future::pending::<()>().await;
    }
    tracing::info!("interrupt received, stopping after the current cycle");
    let _ = tx.send(true);
    if interrupt().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn serve(feed: HttpFeed, config: PollerConfig, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    let shutdown = shutdown_on_interrupt();
    let poller = Poller::new(feed, Sink::new(&config.sinks), config.matches_refresh);
    let (handle, liveness) = poller.spawn(shutdown.clone());

    let state = AppState {
        snapshots: config.sinks.data_dir.clone().map(SnapshotFiles::new),
        poller: liveness,
    };
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    tracing::info!(%addr, "server listening");

    let mut stop = shutdown;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop.wait_for(|stopped| *stopped).await;
        })
        .await;

    if served.is_err() {
        handle.abort();
    }
    // On shutdown the poller stops between cycles; wait for its last writes.
    match handle.await {
        Err(error) if !error.is_cancelled() => tracing::error!(%error, "poller task failed"),
        _ => {}
    }
    served?;
    Ok(())
}

async fn probe(feed: &HttpFeed) -> ExitCode {
    let timings_url = feed::timings_url(feed.base_url());
    let timings = match feed.probe(&timings_url).await {
        Ok(report) => report,
        Err(error) => {
            println!("[probe] timings -> ERROR: {error}");
            return ExitCode::FAILURE;
        }
    };
    println!("[probe] timings -> {} {} bytes", timings.status, timings.bytes);

    let snapshot = TimingsSnapshot::from_fetched(Fetched::from_body(&timings.body));
    let Some(competition_id) = snapshot.competition_id() else {
        println!("[probe] competition id not found in timings");
        return ExitCode::FAILURE;
    };
    println!("[probe] competition_id: {competition_id}");

    let matches_url = feed::matches_url(feed.base_url(), competition_id);
    let matches = match feed.probe(&matches_url).await {
        Ok(report) => report,
        Err(error) => {
            println!("[probe] matches -> ERROR: {error}");
            return ExitCode::FAILURE;
        }
    };
    println!("[probe] matches -> {} {} bytes", matches.status, matches.bytes);

    if timings.is_ok() && matches.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn fetch_pair(feed: &HttpFeed) -> anyhow::Result<(TimingsSnapshot, MatchesSnapshot)> {
    let timings = TimingsSnapshot::from_fetched(
        feed.fetch_timings().await.context("timings fetch failed")?,
    );
    let competition_id: CompetitionId = timings
        .competition_id()
        .context("competition id not found in timings")?;
    let matches = MatchesSnapshot::from_fetched(
        feed.fetch_matches(competition_id)
            .await
            .with_context(|| format!("matches fetch failed for competition {competition_id}"))?,
    );
    Ok((timings, matches))
}

fn print_outcome(outcome: &CycleOutcome) {
    let Some(report) = outcome.report() else {
        println!("request failed; retry in {:?}", outcome.next_delay());
        return;
    };
    match &report.timings {
        TimingsOutcome::Changed { channels, .. } => {
            for summary in channels {
                println!("{summary}");
            }
        }
        TimingsOutcome::Unchanged => println!("timings unchanged"),
    }
    match &report.matches {
        MatchesOutcome::Changed {
            competition_id,
            total_matches,
            ..
        } => println!("matches changed: {total_matches} matches (competition {competition_id})"),
        MatchesOutcome::Unchanged => println!("matches unchanged"),
        MatchesOutcome::Skipped(reason) => println!("matches skipped: {reason:?}"),
        MatchesOutcome::RequestFailed(error) => println!("matches request failed: {error}"),
    }
    println!("next poll in {} ms", report.next_delay.as_millis());
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[test]
    fn poll_accepts_destinations() {
        let Ok(cli) = Cli::try_parse_from([
            "vfl-poller",
            "poll",
            "--jsonl",
            "events.jsonl",
            "--csv",
            "events.csv",
        ]) else {
            panic!("parse failed");
        };
        let Command::Poll(sinks) = cli.command else {
            panic!("expected poll");
        };
        assert_eq!(sinks.jsonl, Some(PathBuf::from("events.jsonl")));
        assert_eq!(sinks.csv, Some(PathBuf::from("events.csv")));
        assert!(sinks.data_dir.is_none());
    }

    #[test]
    fn poll_once_without_destinations() {
        let Ok(cli) = Cli::try_parse_from(["vfl-poller", "poll-once"]) else {
            panic!("parse failed");
        };
        let Command::PollOnce(sinks) = cli.command else {
            panic!("expected poll-once");
        };
        assert!(sinks.jsonl.is_none());
        assert!(sinks.csv.is_none());
    }

    #[test]
    fn global_base_url_and_serve_flags() {
        let Ok(cli) = Cli::try_parse_from([
            "vfl-poller",
            "serve",
            "--listen",
            "127.0.0.1:8080",
            "--data-dir",
            "/tmp/vfl",
            "--base-url",
            "http://localhost:9000",
        ]) else {
            panic!("parse failed");
        };
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:9000"));
        let Command::Serve { listen, sinks } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(listen.map(|a| a.port()), Some(8080));
        assert_eq!(sinks.data_dir, Some(PathBuf::from("/tmp/vfl")));
    }

    #[test]
    fn odds_takes_optional_csv() {
        let Ok(cli) = Cli::try_parse_from(["vfl-poller", "odds", "--csv", "odds.csv"]) else {
            panic!("parse failed");
        };
        let Command::Odds { csv } = cli.command else {
            panic!("expected odds");
        };
        assert_eq!(csv, Some(PathBuf::from("odds.csv")));
        assert!(matches!(
            Cli::try_parse_from(["vfl-poller", "odds"]).map(|c| c.command),
            Ok(Command::Odds { csv: None })
        ));
    }

    #[tokio::test]
    async fn second_interrupt_ends_the_relay() {
        let signal = Arc::new(Notify::new());
        let source = Arc::clone(&signal);
        let interrupt = move || {
            let source = Arc::clone(&source);
            async move {
                source.notified().await;
                Ok(())
            }
        };
        let (tx, mut rx) = watch::channel(false);
        let relay = tokio::spawn(relay_interrupts(interrupt, tx));

        signal.notify_one();
        assert!(rx.wait_for(|stop| *stop).await.is_ok());
        assert!(!relay.is_finished());

        signal.notify_one();
        assert!(relay.await.is_ok());
    }

    #[test]
    fn unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["vfl-poller", "scrape"]).is_err());
    }

    #[test]
    fn sink_args_override_only_what_is_set() {
        let mut sinks = SinkConfig {
            jsonl_path: Some(PathBuf::from("env.jsonl")),
            csv_path: Some(PathBuf::from("env.csv")),
            data_dir: None,
        };
        SinkArgs {
            jsonl: None,
            csv: Some(PathBuf::from("cli.csv")),
            data_dir: None,
        }
        .apply(&mut sinks);
        assert_eq!(sinks.jsonl_path, Some(PathBuf::from("env.jsonl")));
        assert_eq!(sinks.csv_path, Some(PathBuf::from("cli.csv")));
    }
}
