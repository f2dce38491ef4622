//! Channel metadata scrape for the review surface.
//!
//! Pulls the channel page over HTTP and extracts the pieces a reviewer needs
//! to judge a match at a glance (banner, avatar, display name, handle,
//! subscriber text), plus the channel's top uploads via the search
//! capability. Results are cached per channel URL for the process lifetime;
//! two workers racing on a cold channel may both scrape once, which is fine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::warn;

use crate::media_search::{ChannelUpload, MediaSearch};

const TOP_UPLOADS: usize = 5;

lazy_static! {
    static ref BANNER_RE: Regex =
        Regex::new(r#"https://yt3\.googleusercontent\.com/[A-Za-z0-9_\-]+[^"]+"#).unwrap();
    static ref AVATAR_RE: Regex = Regex::new(
        r#""avatar":\{"thumbnails":\[\{"url":"(https://yt3\.googleusercontent\.com/[^"]+)""#
    )
    .unwrap();
    static ref DISPLAY_NAME_RE: Regex =
        Regex::new(r#""channelMetadataRenderer":\{"title":"([^"]+)""#).unwrap();
    static ref TITLE_FALLBACK_RE: Regex = Regex::new(r#""title":"([^"]+ - YouTube)""#).unwrap();
    static ref HANDLE_RE: Regex = Regex::new(r#""handle":"([^"]+)""#).unwrap();
    static ref SUBSCRIBERS_RE: Regex =
        Regex::new(r#""subscriberCountText":\{"simpleText":"([^"]+)""#).unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMetadata {
    pub banner: Option<String>,
    pub avatar: Option<String>,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub subscriber_text: Option<String>,
    pub top_uploads: Vec<ChannelUpload>,
}

pub struct ChannelMetadataFetcher {
    http: reqwest::Client,
    search: Arc<dyn MediaSearch>,
    cache: Mutex<HashMap<String, ChannelMetadata>>,
}

impl ChannelMetadataFetcher {
    pub fn new(search: Arc<dyn MediaSearch>, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            search,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch (or return cached) metadata for a channel. Every field is
    /// best-effort: a failed page fetch or listing leaves that part empty.
    pub async fn fetch(&self, channel_url: &str) -> ChannelMetadata {
        {
            let cache = self.cache.lock().await;
            if let Some(meta) = cache.get(channel_url) {
                return meta.clone();
            }
        }

        let mut meta = ChannelMetadata::default();

        match self.fetch_page(channel_url).await {
            Ok(html) => extract_from_html(&html, &mut meta),
            Err(err) => warn!("Metadata fetch failed for {}: {}", channel_url, err),
        }

        match self.search.list_channel_uploads(channel_url).await {
            Ok(mut uploads) => {
                uploads.truncate(TOP_UPLOADS);
                meta.top_uploads = uploads;
            }
            Err(err) => warn!("Upload listing failed for {}: {}", channel_url, err),
        }

        let mut cache = self.cache.lock().await;
        cache
            .entry(channel_url.to_string())
            .or_insert(meta)
            .clone()
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

fn extract_from_html(html: &str, meta: &mut ChannelMetadata) {
    meta.banner = BANNER_RE.find(html).map(|m| m.as_str().to_string());
    meta.avatar = AVATAR_RE
        .captures(html)
        .map(|c| c[1].to_string());
    meta.display_name = DISPLAY_NAME_RE
        .captures(html)
        .map(|c| c[1].to_string())
        .or_else(|| {
            TITLE_FALLBACK_RE.captures(html).map(|c| {
                c[1].trim_end_matches(" - YouTube").trim().to_string()
            })
        });
    meta.handle = HANDLE_RE.captures(html).map(|c| c[1].to_string());
    meta.subscriber_text = SUBSCRIBERS_RE.captures(html).map(|c| c[1].to_string());
}
