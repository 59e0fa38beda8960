use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};
use reqwest::StatusCode;
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::{self, FetchRow};

const CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Operator-supplied `Cookie` header for pages behind a login.
const COOKIE_ENV: &str = "PROFILE_COOKIE";

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

fn build_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
    if let Ok(cookie) = std::env::var(COOKIE_ENV) {
        let value = HeaderValue::from_str(&cookie)
            .with_context(|| format!("{} is not a valid header value", COOKIE_ENV))?;
        headers.insert(COOKIE, value);
    }
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch pages concurrently, saving each result to DB as it arrives.
pub async fn fetch_pages_streaming(
    conn: &Connection,
    pages: Vec<(i64, String)>,
) -> Result<FetchStats> {
    let client = build_client()?;
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = pages.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send results, main loop saves to DB
    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchRow>(CONCURRENCY * 2);

    for (page_id, url) in pages {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let row = fetch_with_retry(&client, page_id, &url).await;
            if let Some(e) = &row.error {
                warn!("Fetch failed for {}: {}", url, e);
            }
            let _ = tx.send(row).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;

    while let Some(row) = rx.recv().await {
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }
        db::save_fetch(conn, &row)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} pages ({} ok, {} errors)", total, ok, errors);

    Ok(FetchStats { total, ok, errors })
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

async fn fetch_with_retry(client: &reqwest::Client, page_id: i64, url: &str) -> FetchRow {
    let mut attempt = 0;
    loop {
        let row = fetch_one(client, page_id, url).await;
        let retry = row.status.and_then(|s| StatusCode::from_u16(s).ok()).is_some_and(is_retryable);

        if !retry || attempt == MAX_RETRIES {
            return row;
        }

        let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
        warn!(
            "Rate limited on {} (attempt {}/{}), backing off {:.1}s",
            url,
            attempt + 1,
            MAX_RETRIES,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}

async fn fetch_one(client: &reqwest::Client, page_id: i64, url: &str) -> FetchRow {
    let start = Instant::now();
    let response = client.get(url).send().await;

    let (html, status, error) = match response {
        Ok(resp) => {
            let status = resp.status();
            match resp.text().await {
                Ok(body) if status.is_success() => (Some(body), Some(status.as_u16()), None),
                Ok(_) => (None, Some(status.as_u16()), Some(format!("HTTP {}", status))),
                Err(e) => (None, Some(status.as_u16()), Some(e.to_string())),
            }
        }
        Err(e) => (None, e.status().map(|s| s.as_u16()), Some(e.to_string())),
    };

    FetchRow {
        page_id,
        url: url.to_string(),
        html,
        status,
        error,
        latency_ms: Some(start.elapsed().as_millis() as i64),
    }
}

/// Fetch a single URL and return its HTML.
pub async fn fetch_single_page(url: &str) -> Result<String> {
    let client = build_client()?;
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?
        .error_for_status()?;
    Ok(resp.text().await?)
}
