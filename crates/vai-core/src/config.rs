use std::{env, fs, path::Path, time::Duration};

use crate::{
    errors::Error,
    message::MessageType,
    ports::MAX_PAGE_LIMIT,
    Result,
};

/// Typed configuration for the API client and the CLI.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the internal API (the dev proxy by default).
    pub api_url: String,
    pub page_limit: u32,
    pub type_names: Vec<MessageType>,
    pub range_delay: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("VAI_API_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "http://localhost:8083/api/v1".to_string());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "VAI_API_URL must be an http(s) url, got {api_url}"
            )));
        }

        let page_limit = parse_u64(&lookup, "VAI_PAGE_LIMIT")?
            .map(|v| v.clamp(1, u64::from(MAX_PAGE_LIMIT)) as u32)
            .unwrap_or(MAX_PAGE_LIMIT);

        let type_names = match lookup("VAI_TYPE_NAMES").and_then(non_empty) {
            Some(csv) => parse_csv_types(&csv)?,
            None => MessageType::TRACKED.to_vec(),
        };

        let range_delay =
            Duration::from_millis(parse_u64(&lookup, "VAI_RANGE_DELAY_MS")?.unwrap_or(500));
        let request_timeout =
            Duration::from_millis(parse_u64(&lookup, "VAI_REQUEST_TIMEOUT_MS")?.unwrap_or(30_000));

        Ok(Self {
            api_url,
            page_limit,
            type_names,
            range_delay,
            request_timeout,
        })
    }
}

/// Configuration for the development proxy.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub port: u16,
    pub upstream: String,
    /// Incoming path prefix, rewritten to `upstream_prefix`.
    pub local_prefix: String,
    pub upstream_prefix: String,
    /// Outbound (corporate) proxy; `None` connects directly.
    pub outbound_proxy: Option<String>,
    /// Value of the `session` cookie injected into every upstream request.
    pub session: String,
    /// Larger request bodies are answered with 413.
    pub max_body_bytes: usize,
}

pub const SESSION_HELP: &str = "session env was not defined.\n\
Fetch your session from: https://internal.console.stage.redhat.com/api/turnpike/session/\n\
and set as an env variable for this proxy to work.";

impl ProxyConfig {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session = lookup("session")
            .and_then(non_empty)
            .ok_or_else(|| Error::Config(SESSION_HELP.to_string()))?;

        let port = match lookup("PROXY_PORT").and_then(non_empty) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PROXY_PORT is not a port: {raw}")))?,
            None => 8083,
        };

        let upstream = lookup("PROXY_UPSTREAM")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://internal.console.stage.redhat.com".to_string())
            .trim_end_matches('/')
            .to_string();

        // Set but empty disables the outbound proxy.
        let outbound_proxy = match lookup("PROXY_OUTBOUND") {
            Some(v) => non_empty(v),
            None => Some("http://squid.corp.redhat.com:3128".to_string()),
        };

        let max_body_bytes = parse_u64(&lookup, "PROXY_MAX_BODY_BYTES")?
            .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
            .unwrap_or(10 * 1024 * 1024);

        Ok(Self {
            port,
            upstream,
            local_prefix: "/api/v1".to_string(),
            upstream_prefix: "/api/virtual-assistant/v1".to_string(),
            outbound_proxy,
            session,
            max_body_bytes,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// `KEY=value` pairs of a dotenv file. Comments, blank lines and lines without
/// `=` are skipped; an `export ` prefix is accepted.
fn dotenv_pairs(contents: &str) -> impl Iterator<Item = (&str, &str)> + '_ {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let key = key.trim();
            let key = key.strip_prefix("export ").unwrap_or(key).trim();
            (key, strip_quotes(value.trim()))
        })
        .filter(|(key, _)| !key.is_empty())
}

/// Real environment variables win over the file.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    let fresh: Vec<(&str, &str)> = dotenv_pairs(&contents)
        .filter(|(key, _)| env::var_os(key).is_none())
        .collect();
    for (key, value) in &fresh {
        env::set_var(key, value);
    }
    tracing::debug!(path = %path.display(), applied = fresh.len(), "dotenv loaded");
}

fn strip_quotes(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw}")))
}

fn parse_csv_types(csv: &str) -> Result<Vec<MessageType>> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<MessageType>)
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_point_at_local_proxy() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_url, "http://localhost:8083/api/v1");
        assert_eq!(cfg.page_limit, 1000);
        assert_eq!(cfg.type_names, MessageType::TRACKED.to_vec());
        assert_eq!(cfg.range_delay, Duration::from_millis(500));
    }

    #[test]
    fn page_limit_is_clamped() {
        let cfg = Config::from_lookup(lookup(&[("VAI_PAGE_LIMIT", "20000")])).unwrap();
        assert_eq!(cfg.page_limit, 1000);
        assert!(Config::from_lookup(lookup(&[("VAI_PAGE_LIMIT", "lots")])).is_err());
    }

    #[test]
    fn type_names_are_parsed_from_csv() {
        let cfg = Config::from_lookup(lookup(&[("VAI_TYPE_NAMES", "user, bot")])).unwrap();
        assert_eq!(cfg.type_names, vec![MessageType::User, MessageType::Bot]);
        assert!(Config::from_lookup(lookup(&[("VAI_TYPE_NAMES", "user,nope")])).is_err());
    }

    #[test]
    fn rejects_non_http_api_url() {
        assert!(Config::from_lookup(lookup(&[("VAI_API_URL", "ftp://x")])).is_err());
    }

    #[test]
    fn proxy_requires_session() {
        let err = ProxyConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("session env was not defined"));
    }

    #[test]
    fn proxy_defaults_and_outbound_override() {
        let cfg = ProxyConfig::from_lookup(lookup(&[("session", "s3cr3t")])).unwrap();
        assert_eq!(cfg.port, 8083);
        assert_eq!(cfg.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.upstream_prefix, "/api/virtual-assistant/v1");
        assert_eq!(
            cfg.outbound_proxy.as_deref(),
            Some("http://squid.corp.redhat.com:3128")
        );

        let cfg = ProxyConfig::from_lookup(lookup(&[
            ("session", "s3cr3t"),
            ("PROXY_OUTBOUND", ""),
            ("PROXY_UPSTREAM", "http://127.0.0.1:9000/"),
            ("PROXY_MAX_BODY_BYTES", "2048"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_body_bytes, 2048);
        assert!(cfg.outbound_proxy.is_none());
        assert_eq!(cfg.upstream, "http://127.0.0.1:9000");
    }

    #[test]
    fn dotenv_pairs_skip_noise() {
        let contents = "# comment\n\nexport session='abc'\nVAI_PAGE_LIMIT = 200\nbroken\n=orphan\n";
        let pairs: Vec<_> = dotenv_pairs(contents).collect();
        assert_eq!(pairs, vec![("session", "abc"), ("VAI_PAGE_LIMIT", "200")]);
    }

    #[test]
    fn strips_matching_quotes_only() {
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"abc"), "\"abc");
    }
}
