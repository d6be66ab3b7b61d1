use std::collections::HashMap;

use serde::Serialize;

use crate::{
    domain::MessageId,
    message::{Message, MessageType},
};

/// A contiguous run of messages from one sender, bounded by `session_started`
/// events.
///
/// Sessions are a client-side view: they are rebuilt from the held messages on
/// every merge and never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Session {
    pub sender_id: String,
    /// Timestamp of the first held message.
    pub timestamp: f64,
    /// Timestamp of the last held message.
    pub last_timestamp: f64,
    /// Whether the first held message is a `session_started` event. `false`
    /// means paging has not reached the beginning of this session yet.
    pub has_session_started: bool,
    /// Ascending by id.
    pub messages: Vec<Message>,
}

impl Session {
    fn open(first: Message) -> Self {
        Self {
            sender_id: first.sender_id.clone(),
            timestamp: first.timestamp,
            last_timestamp: first.timestamp,
            has_session_started: first.is_session_start(),
            messages: vec![first],
        }
    }

    fn push(&mut self, message: Message) {
        self.last_timestamp = message.timestamp;
        self.messages.push(message);
    }

    pub fn first_id(&self) -> Option<MessageId> {
        self.messages.first().map(|m| m.id)
    }

    /// A session is internal when a `slot` event sets `is_internal` to `true`.
    pub fn is_internal(&self) -> bool {
        self.messages
            .iter()
            .filter_map(Message::slot)
            .any(|slot| slot.name == "is_internal" && slot.value == serde_json::Value::Bool(true))
    }

    pub fn count_of(&self, kind: MessageType) -> usize {
        self.messages.iter().filter(|m| m.type_name == kind).count()
    }
}

/// Merge a freshly fetched page into the sessions already held.
///
/// All held messages and the new ones are combined, deduplicated by id (the
/// copy already held wins), sorted ascending and regrouped. A message opens a
/// new session when its sender has no open session yet or when it is a
/// `session_started` event; otherwise it joins the most recently opened
/// session of its sender. The result is newest-first.
pub fn merge(existing: &[Session], incoming: Vec<Message>) -> Vec<Session> {
    let mut all: Vec<Message> = existing
        .iter()
        .flat_map(|s| s.messages.iter().cloned())
        .chain(incoming)
        .collect();

    // Stable: for equal ids the held copy stays first and survives dedup.
    all.sort_by_key(|m| m.id);
    all.dedup_by_key(|m| m.id);

    let mut opened: Vec<Session> = Vec::new();
    let mut open_by_sender: HashMap<String, usize> = HashMap::new();

    for message in all {
        match open_by_sender.get(&message.sender_id).copied() {
            Some(idx) if !message.is_session_start() => opened[idx].push(message),
            _ => {
                open_by_sender.insert(message.sender_id.clone(), opened.len());
                opened.push(Session::open(message));
            }
        }
    }

    opened.reverse();
    opened
}

/// Lowest message id held; the cursor for fetching older messages.
pub fn lowest_id(sessions: &[Session]) -> Option<MessageId> {
    sessions.iter().filter_map(Session::first_id).min()
}

/// Total number of held messages.
pub fn message_count(sessions: &[Session]) -> usize {
    sessions.iter().map(|s| s.messages.len()).sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn msg(id: MessageId, sender: &str, kind: MessageType) -> Message {
        let data = match kind {
            MessageType::User => json!({ "text": format!("hello {id}") }),
            MessageType::Bot => json!({ "text": format!("reply {id}") }),
            MessageType::SessionStarted => json!({ "name": "action_session_start" }),
            _ => json!({}),
        };
        Message {
            id,
            sender_id: sender.to_string(),
            type_name: kind,
            timestamp: 1_700_000_000.0 + id as f64,
            data,
        }
    }

    fn all_ids(sessions: &[Session]) -> Vec<MessageId> {
        let mut ids: Vec<_> = sessions
            .iter()
            .flat_map(|s| s.messages.iter().map(|m| m.id))
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn groups_by_sender_and_prepends_newest() {
        let sessions = merge(
            &[],
            vec![
                msg(1, "a", MessageType::SessionStarted),
                msg(2, "a", MessageType::User),
                msg(3, "b", MessageType::User),
            ],
        );

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].sender_id, "b");
        assert_eq!(sessions[0].messages.len(), 1);
        assert!(!sessions[0].has_session_started);

        assert_eq!(sessions[1].sender_id, "a");
        assert_eq!(sessions[1].messages.len(), 2);
        assert!(sessions[1].has_session_started);
        assert_eq!(sessions[1].timestamp, 1_700_000_001.0);
        assert_eq!(sessions[1].last_timestamp, 1_700_000_002.0);
    }

    #[test]
    fn session_started_always_opens_a_new_session() {
        let sessions = merge(
            &[],
            vec![
                msg(1, "a", MessageType::SessionStarted),
                msg(2, "a", MessageType::User),
                msg(3, "a", MessageType::SessionStarted),
                msg(4, "a", MessageType::User),
            ],
        );

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].first_id(), Some(3));
        assert_eq!(sessions[1].first_id(), Some(1));
        assert!(sessions.iter().all(|s| s.has_session_started));
    }

    #[test]
    fn consecutive_messages_from_same_sender_share_a_session() {
        let sessions = merge(
            &[],
            vec![
                msg(10, "a", MessageType::User),
                msg(11, "a", MessageType::Bot),
                msg(12, "a", MessageType::User),
            ],
        );
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].messages.len(), 3);
        assert!(!sessions[0].has_session_started);
    }

    #[test]
    fn interleaved_senders_keep_their_own_sessions() {
        let sessions = merge(
            &[],
            vec![
                msg(1, "a", MessageType::SessionStarted),
                msg(2, "b", MessageType::SessionStarted),
                msg(3, "a", MessageType::User),
                msg(4, "b", MessageType::User),
            ],
        );
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].sender_id, "b");
        assert_eq!(
            sessions[0].messages.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![2, 4]
        );
        assert_eq!(
            sessions[1].messages.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn out_of_order_pages_produce_sorted_unique_messages() {
        // Pages arrive newest first, each in descending server order.
        let newest = vec![
            msg(6, "a", MessageType::User),
            msg(5, "b", MessageType::User),
            msg(4, "a", MessageType::Bot),
        ];
        let older = vec![
            msg(4, "a", MessageType::Bot),
            msg(3, "a", MessageType::User),
            msg(2, "b", MessageType::SessionStarted),
            msg(1, "a", MessageType::SessionStarted),
        ];

        let first = merge(&[], newest);
        let both = merge(&first, older);

        assert_eq!(all_ids(&both), vec![1, 2, 3, 4, 5, 6]);
        for s in &both {
            assert!(s.messages.windows(2).all(|w| w[0].id < w[1].id));
            assert!(s.messages.iter().all(|m| m.sender_id == s.sender_id));
        }
        assert_eq!(both.len(), 2);
        assert!(both.iter().all(|s| s.has_session_started));
    }

    #[test]
    fn older_page_completes_a_partial_session() {
        let first = merge(&[], vec![msg(5, "a", MessageType::User)]);
        assert!(!first[0].has_session_started);

        let second = merge(&first, vec![msg(4, "a", MessageType::SessionStarted)]);
        assert_eq!(second.len(), 1);
        assert!(second[0].has_session_started);
        assert_eq!(second[0].first_id(), Some(4));
    }

    #[test]
    fn merging_the_same_page_twice_is_idempotent() {
        let page = vec![
            msg(3, "b", MessageType::User),
            msg(2, "a", MessageType::User),
            msg(1, "a", MessageType::SessionStarted),
        ];
        let once = merge(&[], page.clone());
        let twice = merge(&once, page);
        assert_eq!(once, twice);
    }

    #[test]
    fn held_copy_wins_on_duplicate_ids() {
        let held = merge(&[], vec![msg(1, "a", MessageType::User)]);
        let mut changed = msg(1, "a", MessageType::User);
        changed.data = json!({ "text": "changed" });

        let merged = merge(&held, vec![changed]);
        assert_eq!(merged[0].messages.len(), 1);
        assert_eq!(merged[0].messages[0].user().unwrap().text, "hello 1");
    }

    #[test]
    fn empty_inputs_give_no_sessions() {
        assert!(merge(&[], Vec::new()).is_empty());
        assert_eq!(lowest_id(&[]), None);
    }

    #[test]
    fn lowest_id_is_the_oldest_held_message() {
        let sessions = merge(
            &[],
            vec![
                msg(9, "a", MessageType::User),
                msg(7, "b", MessageType::User),
                msg(8, "a", MessageType::User),
            ],
        );
        assert_eq!(lowest_id(&sessions), Some(7));
        assert_eq!(message_count(&sessions), 3);
    }

    #[test]
    fn internal_flag_comes_from_slot() {
        let mut slot = msg(2, "a", MessageType::Slot);
        slot.data = json!({ "name": "is_internal", "value": true });
        let sessions = merge(&[], vec![msg(1, "a", MessageType::User), slot]);
        assert!(sessions[0].is_internal());

        let mut other = msg(4, "b", MessageType::Slot);
        other.data = json!({ "name": "is_internal", "value": false });
        let sessions = merge(&[], vec![msg(3, "b", MessageType::User), other]);
        assert!(!sessions[0].is_internal());
    }
}
