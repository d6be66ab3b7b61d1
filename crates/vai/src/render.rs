use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use vai_core::{
    domain::Sender,
    message::{BotExtras, BotPayload, MessageType},
    range::DateRange,
    sessions::Session,
    utils::{format_epoch, time_ago, truncate_text},
    views::{DashboardSummary, TimelineEntry, UserMessageRow},
};

const SENDER_PREFIX: usize = 5;

pub fn senders(senders: &[Sender], now: DateTime<Utc>) -> String {
    let mut out = String::from("Senders list\n");
    for s in senders {
        let last = s
            .timestamp
            .map(|ts| time_ago(ts, now))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "  {:<40} {last}", s.sender_id);
    }
    out
}

pub fn timeline(entries: &[TimelineEntry], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    for e in entries {
        let or_before = if e.has_session_started { "" } else { " (or before)" };
        let internal = if e.is_internal { "  internal" } else { "" };
        let _ = writeln!(
            out,
            "{:<24} {}  user {:>3}  bot {:>3}{internal}",
            format!("{}{or_before}", time_ago(e.started, now)),
            e.sender_id,
            e.user_messages,
            e.bot_messages,
        );
    }
    out
}

/// Full transcripts; bot, user and session start lines only.
pub fn sessions(sessions: &[Session], display_sender: bool, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    for s in sessions {
        let or_before = if s.has_session_started { "" } else { " (or before)" };
        let _ = writeln!(
            out,
            "Started {}{or_before} {}",
            time_ago(s.timestamp, now),
            format_epoch(s.timestamp)
        );
        if display_sender {
            let _ = writeln!(out, "  {}", s.sender_id);
        }

        for m in &s.messages {
            match m.type_name {
                MessageType::SessionStarted => {
                    let name = m
                        .session_started()
                        .and_then(|p| p.name)
                        .map(|n| format!(" ({n})"))
                        .unwrap_or_default();
                    let _ = writeln!(out, "  --- session started{name} ---");
                }
                MessageType::User => {
                    if let Some(user) = m.user() {
                        let intent = user
                            .intent()
                            .map(|i| format!(" [{} {:.2}]", i.name, i.confidence))
                            .unwrap_or_default();
                        let _ = writeln!(out, "  user: {}{intent}", user.text);
                    }
                }
                MessageType::Bot => {
                    if let Some(bot) = m.bot() {
                        let _ = writeln!(out, "  bot:  {}{}", bot.text, bot_annotation(&bot));
                    }
                }
                _ => {}
            }
        }
        out.push('\n');
    }
    out
}

/// ` [utter_x, command: redirect]` style suffix for bot lines.
fn bot_annotation(bot: &BotPayload) -> String {
    let mut parts = Vec::new();
    if let Some(action) = bot.metadata.as_ref().and_then(|m| m.utter_action.as_deref()) {
        parts.push(action.to_string());
    }
    if let Some(cmd) = bot.data.as_ref().and_then(BotExtras::command) {
        parts.push(format!("command: {}", cmd.command));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(", "))
    }
}

pub fn user_messages(rows: &[UserMessageRow]) -> String {
    let mut out = String::from("Message | Intent | Confidence | Sender id\n");
    for r in rows {
        let sender: String = r.sender_id.chars().take(SENDER_PREFIX).collect();
        let confidence = r
            .confidence
            .map(|c| format!("{:.2}", (c * 100.0).round() / 100.0))
            .unwrap_or_default();
        let internal = if r.is_internal { " (internal)" } else { "" };
        let _ = writeln!(
            out,
            "{} | {} | {confidence} | {sender}...{internal}",
            truncate_text(&r.text, 80),
            r.intent.as_deref().unwrap_or("-"),
        );
    }
    out
}

pub fn dashboard(summary: &DashboardSummary, range: &DateRange) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Date range: {} TO {}",
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d")
    );
    let _ = writeln!(out, "Number of sessions:      {}", summary.sessions);
    let _ = writeln!(out, "  with observed start:   {}", summary.complete_sessions);
    let _ = writeln!(
        out,
        "  internal / external:   {} / {}",
        summary.internal_sessions, summary.external_sessions
    );
    let _ = writeln!(out, "Number of unique users:  {}", summary.unique_senders);
    let _ = writeln!(out, "User messages:           {}", summary.user_messages);
    let _ = writeln!(
        out,
        "Avg messages / session:  {:.2}",
        summary.avg_user_messages_per_session
    );
    if !summary.top_intents.is_empty() {
        out.push_str("Top intents:\n");
        for i in &summary.top_intents {
            let _ = writeln!(out, "  {:>5}  {}", i.count, i.name);
        }
    }
    out
}
