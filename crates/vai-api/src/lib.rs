//! HTTP adapter for the assistant's internal API.
//!
//! Implements [`MessagesApi`] with `reqwest`: `GET {base}/messages[/{sender}]`
//! and `GET {base}/senders`. Anything but `200 OK` is an error; nothing is
//! retried.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use vai_core::{
    config::Config,
    domain::{senders_from_json, Sender},
    errors::Error,
    ports::{MessagePage, MessageQuery, MessagesApi},
    utils::truncate_text,
    Result,
};

const ERROR_BODY_MAX: usize = 200;

#[derive(Clone, Debug)]
pub struct HttpMessagesApi {
    base: Url,
    http: reqwest::Client,
}

impl HttpMessagesApi {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Self::with_client(&cfg.api_url, http)
    }

    pub fn with_client(base: &str, http: reqwest::Client) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| Error::Config(format!("invalid api url {base}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("api url cannot be a base: {base}")));
        }
        Ok(Self { base, http })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json(
        &self,
        url: Url,
        query: &[(&'static str, String)],
    ) -> Result<serde_json::Value> {
        let resp = self
            .http
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| Error::External(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%url, status = status.as_u16(), "api request rejected");
            return Err(Error::Http {
                status: status.as_u16(),
                body: truncate_text(&body, ERROR_BODY_MAX),
            });
        }

        resp.json()
            .await
            .map_err(|e| Error::External(format!("invalid json from {url}: {e}")))
    }
}

#[async_trait]
impl MessagesApi for HttpMessagesApi {
    async fn fetch_page(&self, query: &MessageQuery) -> Result<MessagePage> {
        let url = match &query.sender {
            Some(sender) => self.url(&["messages", sender]),
            None => self.url(&["messages"]),
        };
        let body = self.get_json(url, &query.query_pairs()).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn list_senders(&self) -> Result<Vec<Sender>> {
        let body = self.get_json(self.url(&["senders"]), &[]).await?;
        senders_from_json(body)
    }
}
