use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use vai_api::HttpMessagesApi;
use vai_core::{
    config::Config,
    feed::SessionFeed,
    fetch::{FetchConfig, MessageFetcher},
    range::{DateRange, RangePreset},
    sessions::{merge, Session},
    views::{self, DashboardSummary, UserMessageFilter},
};

mod render;

/// Browse assistant conversations from the internal API.
#[derive(Debug, Parser)]
#[command(name = "vai", version)]
struct Cli {
    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List senders with their last interaction.
    Senders,
    /// Sessions of every sender, newest first.
    Timeline {
        /// Extra "load more" pages after the first one.
        #[arg(long, default_value_t = 0)]
        pages: usize,
        /// Print full transcripts instead of one line per session.
        #[arg(long)]
        full: bool,
    },
    /// Sessions of one sender.
    Sessions {
        sender: String,
        #[arg(long, default_value_t = 0)]
        pages: usize,
    },
    /// User-typed messages with intent and confidence.
    UserMessages {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        external_only: bool,
        #[arg(long, default_value_t = 0)]
        pages: usize,
    },
    /// User-typed messages, commands excluded.
    Unique {
        #[arg(long, default_value_t = 0)]
        pages: usize,
    },
    /// Summary over a date range (week, month or quarter).
    Dashboard {
        #[arg(long, default_value = "week")]
        preset: String,
        /// Picked day; moves the nearest edge of the preset window. Repeatable.
        #[arg(long = "select", value_name = "YYYY-MM-DD")]
        select: Vec<NaiveDate>,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vai_core::logging::init("vai")?;
    let cli = Cli::parse();

    let cfg = Config::load()?;
    tracing::debug!(api = %cfg.api_url, page_limit = cfg.page_limit, "config loaded");
    let api = Arc::new(HttpMessagesApi::new(&cfg)?);
    let fetcher = MessageFetcher::new(api, FetchConfig::from(&cfg));
    let now = Utc::now();

    match cli.command {
        Command::Senders => {
            let senders = fetcher.senders().await.context("listing senders")?;
            emit(cli.json, &senders, || render::senders(&senders, now))
        }
        Command::Timeline { pages, full } => {
            let sessions = load_sessions(&fetcher, None, pages).await?;
            if full {
                return emit(cli.json, &sessions, || render::sessions(&sessions, true, now));
            }
            let entries = views::timeline(&sessions);
            emit(cli.json, &entries, || render::timeline(&entries, now))
        }
        Command::Sessions { sender, pages } => {
            let sessions = load_sessions(&fetcher, Some(sender), pages).await?;
            emit(cli.json, &sessions, || render::sessions(&sessions, false, now))
        }
        Command::UserMessages {
            search,
            external_only,
            pages,
        } => {
            let sessions = load_sessions(&fetcher, None, pages).await?;
            let rows = views::user_messages(
                &sessions,
                &UserMessageFilter {
                    search,
                    external_only,
                },
            );
            emit(cli.json, &rows, || render::user_messages(&rows))
        }
        Command::Unique { pages } => {
            let sessions = load_sessions(&fetcher, None, pages).await?;
            let rows = views::unique_messages(&sessions);
            emit(cli.json, &rows, || render::user_messages(&rows))
        }
        Command::Dashboard {
            preset,
            select,
            top,
        } => {
            let preset: RangePreset = preset.parse()?;
            let picks = select.into_iter().map(|d| d.and_time(NaiveTime::MIN).and_utc());
            let range = DateRange::preset(preset, now).select_all(picks, now);
            let messages = fetcher
                .range(None, range.start, range.end)
                .await
                .context("fetching date range")?;
            let summary = DashboardSummary::from_sessions(&merge(&[], messages), top);
            emit(cli.json, &summary, || render::dashboard(&summary, &range))
        }
    }
}

/// First page plus up to `pages` backward pages.
async fn load_sessions(
    fetcher: &MessageFetcher,
    sender: Option<String>,
    pages: usize,
) -> anyhow::Result<Vec<Session>> {
    let feed = SessionFeed::new(fetcher.clone(), sender);
    feed.start_load().await.context("loading messages")?;
    for _ in 0..pages {
        if !feed.load_more().await.context("loading more messages")? {
            break;
        }
    }
    let state = feed.snapshot().await;
    tracing::debug!(phase = ?state.phase, sessions = state.sessions.len(), "feed settled");
    Ok(state.sessions)
}

fn emit<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}
