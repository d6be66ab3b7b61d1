use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::time::sleep;

use crate::{
    config::Config,
    domain::{MessageId, Sender},
    message::{Message, MessageType},
    ports::{MessageQuery, MessagesApi, MAX_PAGE_LIMIT},
    Result,
};

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub page_limit: u32,
    pub type_names: Vec<MessageType>,
    /// Pause between consecutive requests of a range fetch.
    pub range_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_limit: MAX_PAGE_LIMIT,
            type_names: MessageType::TRACKED.to_vec(),
            range_delay: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for FetchConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            page_limit: cfg.page_limit,
            type_names: cfg.type_names.clone(),
            range_delay: cfg.range_delay,
        }
    }
}

/// Bounded, strictly sequential paging over [`MessagesApi`].
///
/// No retries: a failed request is returned to the caller as is.
#[derive(Clone)]
pub struct MessageFetcher {
    api: Arc<dyn MessagesApi>,
    cfg: FetchConfig,
}

impl MessageFetcher {
    pub fn new(api: Arc<dyn MessagesApi>, cfg: FetchConfig) -> Self {
        Self { api, cfg }
    }

    fn query(&self, sender: Option<&str>) -> MessageQuery {
        MessageQuery::for_sender(sender)
            .with_limit(self.cfg.page_limit)
            .with_type_names(self.cfg.type_names.clone())
    }

    /// One page for all senders or one sender, optionally below `cursor`.
    pub async fn page(
        &self,
        sender: Option<&str>,
        cursor: Option<MessageId>,
    ) -> Result<Vec<Message>> {
        let query = self.query(sender).below(cursor);
        let page = self.api.fetch_page(&query).await?;
        tracing::debug!(
            path = %query.path(),
            cursor = ?cursor,
            received = page.messages.len(),
            "fetched message page"
        );
        Ok(page.messages)
    }

    /// Every message in `[start, end]`, paging with offset/limit until the
    /// reported total is exhausted.
    ///
    /// When the server omits `count`, a short page ends the loop.
    pub async fn range(
        &self,
        sender: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Message>> {
        let base = self.query(sender).between(start, end);
        let limit = u64::from(base.limit);

        let mut out = Vec::new();
        let mut offset: u64 = 0;
        let mut requests = 0usize;

        loop {
            let query = base.clone().at_offset(offset);
            let page = self.api.fetch_page(&query).await?;
            requests += 1;

            let received = page.messages.len() as u64;
            out.extend(page.messages);
            offset += limit;

            let exhausted = match page.count {
                Some(count) => offset >= count,
                None => received < limit,
            };
            if exhausted {
                break;
            }

            sleep(self.cfg.range_delay).await;
        }

        tracing::info!(
            requests,
            messages = out.len(),
            start = %start,
            end = %end,
            "range fetch finished"
        );
        Ok(out)
    }

    pub async fn senders(&self) -> Result<Vec<Sender>> {
        self.api.list_senders().await
    }
}
