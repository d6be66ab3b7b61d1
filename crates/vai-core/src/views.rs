//! Analyst views derived from reconstructed sessions.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::{
    domain::MessageId,
    message::{Message, MessageType},
    sessions::Session,
};

/// One line of the all-senders timeline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub sender_id: String,
    pub started: f64,
    pub last: f64,
    /// False when the opening `session_started` has not been paged in.
    pub has_session_started: bool,
    pub is_internal: bool,
    pub user_messages: usize,
    pub bot_messages: usize,
}

/// Sessions newest first, summarized for the overview list.
pub fn timeline(sessions: &[Session]) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = sessions
        .iter()
        .map(|s| TimelineEntry {
            sender_id: s.sender_id.clone(),
            started: s.timestamp,
            last: s.last_timestamp,
            has_session_started: s.has_session_started,
            is_internal: s.is_internal(),
            user_messages: s.count_of(MessageType::User),
            bot_messages: s.count_of(MessageType::Bot),
        })
        .collect();
    entries.sort_by(|a, b| b.started.total_cmp(&a.started));
    entries
}

/// One user utterance with the session context needed for review tables.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserMessageRow {
    pub id: MessageId,
    pub sender_id: String,
    pub text: String,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
    pub timestamp: f64,
    pub session_timestamp: f64,
    pub is_internal: bool,
}

impl UserMessageRow {
    fn from_message(m: &Message, session: &Session, is_internal: bool) -> Option<Self> {
        let user = m.user()?;
        if user.is_command() {
            return None;
        }
        let intent = user.intent().cloned();
        Some(Self {
            id: m.id,
            sender_id: m.sender_id.clone(),
            text: user.text,
            intent: intent.as_ref().map(|i| i.name.clone()),
            confidence: intent.map(|i| i.confidence),
            timestamp: m.timestamp,
            session_timestamp: session.timestamp,
            is_internal,
        })
    }

    fn matches(&self, search: &str) -> bool {
        search.is_empty()
            || self.intent.as_deref().is_some_and(|i| i.contains(search))
            || self.text.contains(search)
            || self.sender_id.contains(search)
    }
}

#[derive(Clone, Debug, Default)]
pub struct UserMessageFilter {
    /// Substring matched against intent name, text and sender id.
    pub search: String,
    /// Drop sessions flagged internal.
    pub external_only: bool,
}

/// User-typed messages (no `/` commands), filtered for review.
pub fn user_messages(sessions: &[Session], filter: &UserMessageFilter) -> Vec<UserMessageRow> {
    let mut rows = Vec::new();
    for session in sessions {
        let is_internal = session.is_internal();
        if filter.external_only && is_internal {
            continue;
        }
        rows.extend(
            session
                .messages
                .iter()
                .filter_map(|m| UserMessageRow::from_message(m, session, is_internal))
                .filter(|row| row.matches(&filter.search)),
        );
    }
    rows
}

/// Every user-typed message, commands excluded.
pub fn unique_messages(sessions: &[Session]) -> Vec<UserMessageRow> {
    user_messages(sessions, &UserMessageFilter::default())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntentCount {
    pub name: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub sessions: usize,
    pub unique_senders: usize,
    pub internal_sessions: usize,
    pub external_sessions: usize,
    /// Sessions whose `session_started` event was observed.
    pub complete_sessions: usize,
    pub user_messages: usize,
    pub avg_user_messages_per_session: f64,
    pub top_intents: Vec<IntentCount>,
}

impl DashboardSummary {
    pub fn from_sessions(sessions: &[Session], top_n: usize) -> Self {
        let unique_senders = sessions
            .iter()
            .map(|s| s.sender_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let internal_sessions = sessions.iter().filter(|s| s.is_internal()).count();
        let complete_sessions = sessions.iter().filter(|s| s.has_session_started).count();
        let user_messages: usize = sessions
            .iter()
            .map(|s| s.count_of(MessageType::User))
            .sum();

        let avg_user_messages_per_session = if sessions.is_empty() {
            0.0
        } else {
            user_messages as f64 / sessions.len() as f64
        };

        let mut by_intent: HashMap<String, usize> = HashMap::new();
        for row in unique_messages(sessions) {
            if let Some(intent) = row.intent {
                *by_intent.entry(intent).or_default() += 1;
            }
        }
        let mut top_intents: Vec<IntentCount> = by_intent
            .into_iter()
            .map(|(name, count)| IntentCount { name, count })
            .collect();
        top_intents.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        top_intents.truncate(top_n);

        Self {
            sessions: sessions.len(),
            unique_senders,
            internal_sessions,
            external_sessions: sessions.len() - internal_sessions,
            complete_sessions,
            user_messages,
            avg_user_messages_per_session,
            top_intents,
        }
    }
}
