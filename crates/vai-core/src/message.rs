use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{domain::MessageId, errors::Error};

/// Event type reported by the API in `type_name`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    User,
    Bot,
    Slot,
    SessionStarted,
    Action,
    ActionExecutionRejected,
    ActiveLoop,
    Restart,
    UserFeaturization,
    #[serde(other)]
    Other,
}

impl MessageType {
    /// Types requested from the API and used to rebuild sessions.
    pub const TRACKED: [MessageType; 4] = [
        MessageType::Bot,
        MessageType::User,
        MessageType::Slot,
        MessageType::SessionStarted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::User => "user",
            MessageType::Bot => "bot",
            MessageType::Slot => "slot",
            MessageType::SessionStarted => "session_started",
            MessageType::Action => "action",
            MessageType::ActionExecutionRejected => "action_execution_rejected",
            MessageType::ActiveLoop => "active_loop",
            MessageType::Restart => "restart",
            MessageType::UserFeaturization => "user_featurization",
            MessageType::Other => "other",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s.trim() {
            "user" => MessageType::User,
            "bot" => MessageType::Bot,
            "slot" => MessageType::Slot,
            "session_started" => MessageType::SessionStarted,
            "action" => MessageType::Action,
            "action_execution_rejected" => MessageType::ActionExecutionRejected,
            "active_loop" => MessageType::ActiveLoop,
            "restart" => MessageType::Restart,
            "user_featurization" => MessageType::UserFeaturization,
            other => {
                return Err(Error::Config(format!("unknown message type: {other}")));
            }
        };
        Ok(t)
    }
}

/// A single event record as returned by `GET /messages`.
///
/// The payload is kept as raw JSON; typed views decode it on demand so new
/// fields on the server never break decoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: String,
    pub type_name: MessageType,
    /// Epoch seconds.
    pub timestamp: f64,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Message {
    pub fn is_session_start(&self) -> bool {
        self.type_name == MessageType::SessionStarted
    }

    /// Decoded user utterance, if this is a `user` event with a text payload.
    pub fn user(&self) -> Option<UserPayload> {
        self.decode(MessageType::User)
    }

    /// Decoded bot reply, if this is a `bot` event with a text payload.
    pub fn bot(&self) -> Option<BotPayload> {
        self.decode(MessageType::Bot)
    }

    pub fn slot(&self) -> Option<SlotPayload> {
        self.decode(MessageType::Slot)
    }

    pub fn session_started(&self) -> Option<SessionStartedPayload> {
        self.decode(MessageType::SessionStarted)
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, expected: MessageType) -> Option<T> {
        if self.type_name != expected {
            return None;
        }
        T::deserialize(&self.data).ok()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataBase {
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseData {
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub intent_ranking: Vec<Intent>,
    #[serde(default)]
    pub entities: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(flatten)]
    pub base: MetadataBase,
    #[serde(default)]
    pub current_url: Option<String>,
    #[serde(default)]
    pub is_org_admin: Option<bool>,
    #[serde(default)]
    pub is_internal: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub text: String,
    #[serde(default)]
    pub input_channel: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<UserMetadata>,
    #[serde(default)]
    pub parse_data: Option<ParseData>,
}

impl UserPayload {
    pub fn intent(&self) -> Option<&Intent> {
        self.parse_data.as_ref()?.intent.as_ref()
    }

    /// Slash-prefixed texts are commands sent by the client, not typed by a user.
    pub fn is_command(&self) -> bool {
        self.text.starts_with('/')
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub payload: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
    #[serde(default)]
    pub params: std::collections::BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BotExtras {
    #[serde(default)]
    pub buttons: Option<Vec<Button>>,
    #[serde(default)]
    pub custom: Option<serde_json::Value>,
}

impl BotExtras {
    /// The `custom` block, when it is a client command.
    pub fn command(&self) -> Option<Command> {
        let custom = self.custom.as_ref()?;
        Command::deserialize(custom)
            .ok()
            .filter(|c| c.kind == "command")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BotMetadata {
    #[serde(flatten)]
    pub base: MetadataBase,
    #[serde(default)]
    pub utter_action: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BotPayload {
    pub text: String,
    #[serde(default)]
    pub data: Option<BotExtras>,
    #[serde(default)]
    pub metadata: Option<BotMetadata>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotPayload {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionStartedPayload {
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_user_message_with_intent() {
        let m: Message = serde_json::from_value(json!({
            "id": 7,
            "sender_id": "abc",
            "type_name": "user",
            "timestamp": 1700000000.25,
            "data": {
                "text": "how do I enable 2fa",
                "input_channel": "rest",
                "message_id": "m-1",
                "metadata": { "assistant_id": "x", "is_internal": true, "current_url": "/settings" },
                "parse_data": {
                    "intent": { "name": "enable_2fa", "confidence": 0.93 },
                    "intent_ranking": [],
                    "entities": []
                }
            }
        }))
        .unwrap();

        assert_eq!(m.type_name, MessageType::User);
        let user = m.user().unwrap();
        assert_eq!(user.intent().unwrap().name, "enable_2fa");
        assert_eq!(user.metadata.unwrap().is_internal, Some(true));
        assert!(m.bot().is_none());
    }

    #[test]
    fn unknown_type_decodes_as_other() {
        let m: Message = serde_json::from_value(json!({
            "id": 1,
            "sender_id": "abc",
            "type_name": "something_new",
            "timestamp": 1.0
        }))
        .unwrap();
        assert_eq!(m.type_name, MessageType::Other);
        assert!(m.data.is_null());
    }

    #[test]
    fn user_without_text_has_no_user_view() {
        let m: Message = serde_json::from_value(json!({
            "id": 1,
            "sender_id": "abc",
            "type_name": "user",
            "timestamp": 1.0,
            "data": { "text": null }
        }))
        .unwrap();
        assert!(m.user().is_none());
    }

    #[test]
    fn bot_custom_command_is_extracted() {
        let m: Message = serde_json::from_value(json!({
            "id": 2,
            "sender_id": "abc",
            "type_name": "bot",
            "timestamp": 1.0,
            "data": {
                "text": "Opening",
                "data": {
                    "buttons": null,
                    "custom": { "type": "command", "command": "redirect", "params": { "url": "/x" } }
                },
                "metadata": { "utter_action": "utter_redirect" }
            }
        }))
        .unwrap();
        let bot = m.bot().unwrap();
        let cmd = bot.data.unwrap().command().unwrap();
        assert_eq!(cmd.command, "redirect");
        assert_eq!(cmd.params.get("url").map(String::as_str), Some("/x"));
    }

    #[test]
    fn parses_type_names_from_config() {
        assert_eq!(
            "session_started".parse::<MessageType>().unwrap(),
            MessageType::SessionStarted
        );
        assert!("bogus".parse::<MessageType>().is_err());
        assert_eq!(MessageType::ActiveLoop.to_string(), "active_loop");
    }
}
