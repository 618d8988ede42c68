//! Live website notice fetching.
//!
//! College sites publish notices/events as an HTML table with date and
//! notice columns; some themes render them as plain lists of PDF links
//! instead. [`NoticeFetcher`] scrapes both shapes and caches the result for
//! a configurable TTL so prompt assembly never hammers the college website.
//!
//! This module never fails outward: on any error it serves the stale cache
//! when one exists, and an empty list otherwise.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use scraper::{Html, Selector};
use url::Url;

use crate::models::Notice;

const FETCH_TIMEOUT_SECS: u64 = 10;
const MAX_NOTICES: usize = 20;
const USER_AGENT: &str = "AdmissionsHarness/1.0 (admissions bot)";

struct CacheEntry {
    fetched_at: Instant,
    notices: Vec<Notice>,
}

pub struct NoticeFetcher {
    client: reqwest::Client,
    ttl: Duration,
    cache: Mutex<Option<CacheEntry>>,
}

impl NoticeFetcher {
    pub fn new(cache_ttl: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            ttl: cache_ttl,
            cache: Mutex::new(None),
        }
    }

    /// Fetch notices from the configured URL, serving cached results while
    /// they are fresh. Errors degrade to the stale cache or an empty list.
    pub async fn fetch(&self, url: &str) -> Vec<Notice> {
        if url.is_empty() {
            return Vec::new();
        }

        if let Some(fresh) = self.cached_fresh() {
            return fresh;
        }

        let body = match self.get_text(url).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, url, "live notices fetch failed");
                return self.cached_any();
            }
        };

        let notices = parse_notices(&body, url);
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        *cache = Some(CacheEntry {
            fetched_at: Instant::now(),
            notices: notices.clone(),
        });
        notices
    }

    /// Drop the cache (e.g. after the admin changes the notices URL).
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        *cache = None;
    }

    async fn get_text(&self, url: &str) -> anyhow::Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }

    fn cached_fresh(&self) -> Option<Vec<Notice>> {
        let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache
            .as_ref()
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.notices.clone())
    }

    fn cached_any(&self) -> Vec<Notice> {
        let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache.as_ref().map(|e| e.notices.clone()).unwrap_or_default()
    }
}

/// Parse a notices page. Tries `table tr` rows with date | notice columns
/// first, then falls back to scanning PDF / Drive anchors.
pub fn parse_notices(html: &str, base_url: &str) -> Vec<Notice> {
    let document = Html::parse_document(html);
    let mut notices = Vec::new();

    let row_sel = Selector::parse("table tr").unwrap();
    let cell_sel = Selector::parse("td").unwrap();
    let anchor_sel = Selector::parse("a").unwrap();

    for row in document.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 2 {
            continue;
        }
        let date = cells[0].text().collect::<String>().trim().to_string();
        let notice_cell = &cells[1];
        let link = notice_cell.select(&anchor_sel).next();
        let title = match &link {
            Some(a) => a.text().collect::<String>().trim().to_string(),
            None => notice_cell.text().collect::<String>().trim().to_string(),
        };
        if title.is_empty() {
            continue;
        }
        let href = link.and_then(|a| a.value().attr("href")).unwrap_or("");
        notices.push(Notice {
            date,
            title,
            url: resolve_href(href, base_url),
        });
    }

    if notices.is_empty() {
        let fallback_sel =
            Selector::parse(r#"a[href*="drive.google.com"], a[href$=".pdf"]"#).unwrap();
        for a in document.select(&fallback_sel) {
            let title = a.text().collect::<String>().trim().to_string();
            if title.len() <= 5 || title.len() >= 200 {
                continue;
            }
            let href = a.value().attr("href").unwrap_or("");
            notices.push(Notice {
                date: String::new(),
                title,
                url: resolve_href(href, base_url),
            });
        }
    }

    notices.truncate(MAX_NOTICES);
    notices
}

fn resolve_href(href: &str, base_url: &str) -> String {
    if href.is_empty() {
        return String::new();
    }
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => String::new(),
    }
}
