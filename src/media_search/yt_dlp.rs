//! yt-dlp subprocess client.
//!
//! Each query runs the tool as a short-lived child process with a hard
//! timeout. The tool is asked to print one pipe-delimited record per result
//! so output parsing stays uniform across query shapes.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{
    parse_channel_hits, parse_channel_uploads, parse_upload_hits, ChannelHit, ChannelUpload,
    MediaSearch, SearchError, UploadHit,
};

/// Print template for channel results (two-field shape).
const CHANNEL_FIELDS: &str = "%(channel)s | %(channel_url)s";
/// Print template for upload results (three-field shape).
const UPLOAD_FIELDS: &str = "%(title)s | %(uploader)s | %(webpage_url)s";
/// Print template for plain channel listings (two-field shape).
const LISTING_FIELDS: &str = "%(title)s | %(webpage_url)s";

pub struct YtDlpSearch {
    program: String,
    timeout: Duration,
}

impl YtDlpSearch {
    /// # Arguments
    /// * `program` - Name or path of the search tool binary (e.g. "yt-dlp")
    /// * `timeout_secs` - Hard deadline for a single tool invocation
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn run(&self, fields: &str, target: &str) -> Result<String, SearchError> {
        let mut command = Command::new(&self.program);
        command
            .args(["--flat-playlist", "--quiet", "--no-warnings", "--ignore-errors"])
            .args(["--print", fields])
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        debug!("running {} on {:?}", self.program, target);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| SearchError::Timeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            return Err(SearchError::ToolFailed(output.status.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// In-channel search URL: `<channel>/search?query=<encoded>`.
    fn channel_query_url(channel_url: &str, query: &str) -> String {
        format!(
            "{}/search?query={}",
            channel_url.trim_end_matches('/'),
            urlencoding::encode(query)
        )
    }

    /// Global search target: `ytsearch<limit>:<query>`.
    fn search_target(query: &str, limit: usize) -> String {
        format!("ytsearch{}:{}", limit, query)
    }
}

#[async_trait]
impl MediaSearch for YtDlpSearch {
    async fn search_channels(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ChannelHit>, SearchError> {
        let target = Self::search_target(query, limit);
        let output = self.run(CHANNEL_FIELDS, &target).await?;
        Ok(parse_channel_hits(&output))
    }

    async fn search_channel_uploads(
        &self,
        channel_url: &str,
        query: &str,
    ) -> Result<Vec<UploadHit>, SearchError> {
        let target = Self::channel_query_url(channel_url, query);
        let output = self.run(UPLOAD_FIELDS, &target).await?;
        Ok(parse_upload_hits(&output))
    }

    async fn search_uploads(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<UploadHit>, SearchError> {
        let target = Self::search_target(query, limit);
        let output = self.run(UPLOAD_FIELDS, &target).await?;
        Ok(parse_upload_hits(&output))
    }

    async fn list_channel_uploads(
        &self,
        channel_url: &str,
    ) -> Result<Vec<ChannelUpload>, SearchError> {
        let target = format!("{}/videos", channel_url.trim_end_matches('/'));
        let output = self.run(LISTING_FIELDS, &target).await?;
        Ok(parse_channel_uploads(&output))
    }
}
