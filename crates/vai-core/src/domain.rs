use serde::{Deserialize, Serialize};

use crate::Result;

/// Server-assigned message id. Unique and strictly increasing with arrival.
pub type MessageId = i64;

/// Conversation participant (end user of the assistant).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub sender_id: String,
    /// Epoch seconds of the last user interaction, when the API reports it.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSender {
    Full(Sender),
    Id(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SendersBody {
    Wrapped { senders: Vec<RawSender> },
    Bare(Vec<RawSender>),
}

/// Decode a `GET /senders` body.
///
/// Accepts `{"senders": [...]}` as well as a bare array; entries may be full
/// objects or plain sender id strings.
pub fn senders_from_json(body: serde_json::Value) -> Result<Vec<Sender>> {
    let body: SendersBody = serde_json::from_value(body)?;
    let raw = match body {
        SendersBody::Wrapped { senders } => senders,
        SendersBody::Bare(senders) => senders,
    };

    Ok(raw
        .into_iter()
        .map(|s| match s {
            RawSender::Full(sender) => sender,
            RawSender::Id(sender_id) => Sender {
                sender_id,
                timestamp: None,
            },
        })
        .collect())
}
