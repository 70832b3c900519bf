use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::db::{self, FetchRow, TopicRow};
use crate::settings::Settings;

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParsedPage>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    text: ParsedText,
}

#[derive(Debug, Deserialize)]
struct ParsedText {
    #[serde(rename = "*")]
    html: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

/// Outcome of asking the API for one page.
#[derive(Debug)]
pub enum PageResult {
    Found(String),
    /// The API answered with an error object (unknown page, bad title).
    NotFound { code: String, info: String },
}

pub struct WikiClient {
    http: reqwest::Client,
    api_url: String,
}

impl WikiClient {
    pub fn new(settings: &Settings) -> Result<WikiClient> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(WikiClient {
            http,
            api_url: settings.api_url(),
        })
    }

    /// Rendered markup of `topic`, following redirects.
    pub async fn fetch_page(&self, topic: &str) -> Result<PageResult> {
        let body = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "parse"),
                ("page", topic),
                ("format", "json"),
                ("prop", "text"),
                ("redirects", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_response(&body)
    }
}

fn fetched_line(topic: &str, bytes: usize, elapsed_ms: i64) -> String {
    format!("{}: {} bytes in {}ms", topic, bytes, elapsed_ms)
}

fn parse_response(body: &str) -> Result<PageResult> {
    let response: ParseResponse =
        serde_json::from_str(body).context("Unexpected parse API response")?;
    match (response.parse, response.error) {
        (_, Some(err)) => Ok(PageResult::NotFound {
            code: err.code,
            info: err.info,
        }),
        (Some(page), None) => Ok(PageResult::Found(page.text.html)),
        (None, None) => anyhow::bail!("Parse API response has neither page nor error"),
    }
}

/// Fetch topics one at a time, saving each result to DB as it arrives.
///
/// Failures are recorded against their topic and never stop the loop.
pub async fn fetch_topics(
    conn: &Connection,
    settings: &Settings,
    topics: Vec<TopicRow>,
) -> Result<FetchStats> {
    let client = WikiClient::new(settings)?;
    let delay = Duration::from_millis(settings.request_delay_ms);
    let total = topics.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut ok = 0usize;
    let mut errors = 0usize;

    for topic in topics {
        pb.set_message(topic.topic.clone());
        let start = Instant::now();
        let result = client.fetch_page(&topic.topic).await;
        let elapsed_ms = start.elapsed().as_millis() as i64;

        let (html, error) = match result {
            Ok(PageResult::Found(html)) => {
                debug!("{}", fetched_line(&topic.topic, html.len(), elapsed_ms));
                (Some(html), None)
            }
            Ok(PageResult::NotFound { code, info }) => {
                warn!("Page '{}' not available: {} ({})", topic.topic, info, code);
                (None, Some(format!("{}: {}", code, info)))
            }
            Err(e) => {
                warn!("Fetch failed for '{}': {:#}", topic.topic, e);
                (None, Some(e.to_string()))
            }
        };

        let found = html.is_some();
        db::save_fetch(
            conn,
            &FetchRow {
                topic_id: topic.id,
                topic: topic.topic,
                lang: topic.lang,
                html,
                error,
                latency_ms: Some(elapsed_ms),
            },
        )?;
        pb.inc(1);

        if found {
            ok += 1;
            tokio::time::sleep(delay).await;
        } else {
            errors += 1;
        }
    }

    pb.finish_and_clear();
    info!("Fetched {} topics ({} ok, {} errors)", total, ok, errors);

    Ok(FetchStats { total, ok, errors })
}
