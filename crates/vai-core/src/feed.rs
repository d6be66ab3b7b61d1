use tokio::sync::Mutex;

use crate::{
    domain::MessageId,
    fetch::MessageFetcher,
    message::Message,
    sessions::{lowest_id, merge, message_count, Session},
    Result,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    FirstLoad,
    Loading,
    Loaded,
}

#[derive(Clone, Debug)]
pub enum LoadAction {
    /// Reset and fetch the newest page.
    StartLoad,
    /// Fetch the page below the lowest held id ("load more").
    StartLoadAfter,
    LoadFinished(Vec<Message>),
    LoadFailed(String),
}

/// Session store for one sender scope, only changed through [`LoadAction`]s.
#[derive(Clone, Debug, Default)]
pub struct FeedState {
    pub phase: LoadPhase,
    pub sessions: Vec<Session>,
    pub last_error: Option<String>,
}

impl FeedState {
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, LoadPhase::FirstLoad | LoadPhase::Loading)
    }

    pub fn cursor(&self) -> Option<MessageId> {
        lowest_id(&self.sessions)
    }

    /// Apply one transition. Returns `false` when the action was ignored.
    pub fn reduce(&mut self, action: LoadAction) -> bool {
        match action {
            LoadAction::StartLoad => {
                if self.is_busy() {
                    return false;
                }
                self.phase = LoadPhase::FirstLoad;
                self.sessions.clear();
                self.last_error = None;
                true
            }
            LoadAction::StartLoadAfter => {
                if self.phase != LoadPhase::Loaded {
                    return false;
                }
                self.phase = LoadPhase::Loading;
                true
            }
            LoadAction::LoadFinished(messages) => {
                if !self.is_busy() {
                    return false;
                }
                self.sessions = merge(&self.sessions, messages);
                self.phase = LoadPhase::Loaded;
                self.last_error = None;
                true
            }
            LoadAction::LoadFailed(error) => {
                self.phase = match self.phase {
                    LoadPhase::FirstLoad => LoadPhase::Idle,
                    LoadPhase::Loading => LoadPhase::Loaded,
                    _ => return false,
                };
                self.last_error = Some(error);
                true
            }
        }
    }
}

/// Async driver around [`FeedState`] for one sender scope (or all senders).
///
/// At most one load is in flight; overlapping requests are ignored.
pub struct SessionFeed {
    fetcher: MessageFetcher,
    sender: Option<String>,
    state: Mutex<FeedState>,
}

impl SessionFeed {
    pub fn new(fetcher: MessageFetcher, sender: Option<String>) -> Self {
        Self {
            fetcher,
            sender,
            state: Mutex::new(FeedState::default()),
        }
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub async fn snapshot(&self) -> FeedState {
        self.state.lock().await.clone()
    }

    /// Reset and load the newest page. Returns `false` when any load is
    /// already running.
    pub async fn start_load(&self) -> Result<bool> {
        if !self.state.lock().await.reduce(LoadAction::StartLoad) {
            return Ok(false);
        }
        self.run(None).await?;
        Ok(true)
    }

    /// Load the page below the lowest held id.
    ///
    /// Returns `false` without a request when a load is in flight, nothing has
    /// been loaded yet, or nothing is held to page below.
    pub async fn load_more(&self) -> Result<bool> {
        let cursor = {
            let mut st = self.state.lock().await;
            let Some(cursor) = st.cursor() else {
                return Ok(false);
            };
            if !st.reduce(LoadAction::StartLoadAfter) {
                return Ok(false);
            }
            cursor
        };
        self.run(Some(cursor)).await?;
        Ok(true)
    }

    async fn run(&self, cursor: Option<MessageId>) -> Result<()> {
        match self.fetcher.page(self.sender(), cursor).await {
            Ok(messages) => {
                let mut st = self.state.lock().await;
                st.reduce(LoadAction::LoadFinished(messages));
                tracing::debug!(
                    sender = ?self.sender,
                    sessions = st.sessions.len(),
                    messages = message_count(&st.sessions),
                    "page merged"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(sender = ?self.sender, error = %e, "message load failed");
                self.state
                    .lock()
                    .await
                    .reduce(LoadAction::LoadFailed(e.to_string()));
                Err(e)
            }
        }
    }
}
