use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Minimum gap between successive outbound requests. basketball-reference
/// rate-limits aggressive scrapers, so every fetch waits this long after the
/// previous one.
const POLITE_DELAY: Duration = Duration::from_secs(3);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

static CLIENT: OnceCell<Client> = OnceCell::new();
static LAST_REQUEST: Mutex<Option<Instant>> = Mutex::new(None);

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// GET a page body, honoring the polite delay and failing on non-2xx.
pub fn polite_get(client: &Client, url: &str) -> Result<String> {
    throttle();
    let resp = client
        .get(url)
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} fetching {url}"));
    }
    Ok(body)
}

fn throttle() {
    let wait = {
        let mut guard = LAST_REQUEST.lock().expect("request clock lock poisoned");
        let now = Instant::now();
        let wait = match *guard {
            Some(last) => POLITE_DELAY.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        };
        *guard = Some(now + wait);
        wait
    };
    if !wait.is_zero() {
        std::thread::sleep(wait);
    }
}
