use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{MessageId, Sender},
    message::{Message, MessageType},
    Result,
};

/// Largest page the API serves.
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Parameters of a single `GET /messages[/{sender}]` request.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageQuery {
    pub sender: Option<String>,
    /// Only messages with a lower id (backward paging).
    pub cursor: Option<MessageId>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub type_names: Vec<MessageType>,
    pub limit: u32,
    pub offset: Option<u64>,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self {
            sender: None,
            cursor: None,
            start_date: None,
            end_date: None,
            type_names: MessageType::TRACKED.to_vec(),
            limit: MAX_PAGE_LIMIT,
            offset: None,
        }
    }
}

impl MessageQuery {
    pub fn for_sender(sender: Option<&str>) -> Self {
        Self {
            sender: sender.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }

    pub fn with_type_names(mut self, type_names: Vec<MessageType>) -> Self {
        self.type_names = type_names;
        self
    }

    pub fn below(mut self, cursor: Option<MessageId>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn at_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Relative request path, without the API base.
    pub fn path(&self) -> String {
        match &self.sender {
            Some(sender) => format!("messages/{sender}"),
            None => "messages".to_string(),
        }
    }

    /// Wire query parameters. Dates are sent as epoch seconds.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(cursor) = self.cursor {
            pairs.push(("cursor", cursor.to_string()));
        }
        if let Some(start) = self.start_date {
            pairs.push(("start_date", start.timestamp().to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", end.timestamp().to_string()));
        }
        if !self.type_names.is_empty() {
            let joined = self
                .type_names
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("type_name", joined));
        }
        pairs.push(("limit", self.limit.min(MAX_PAGE_LIMIT).to_string()));
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

/// Body of a `GET /messages` response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Total rows matching a range query, when the server reports it.
    #[serde(default)]
    pub count: Option<u64>,
}

/// Port for the assistant's internal REST API.
#[async_trait]
pub trait MessagesApi: Send + Sync {
    /// Fetch one page. Messages come back in server order.
    async fn fetch_page(&self, query: &MessageQuery) -> Result<MessagePage>;

    async fn list_senders(&self) -> Result<Vec<Sender>>;
}
