use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// One chat item as constructed from a feed page. Immutable; dropped after
/// filtering.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    pub text: String,
    /// Owner, sponsor or moderator of the chat.
    pub is_member: bool,
    pub is_system: bool,
}

#[derive(Debug, Default)]
pub struct ChatPage {
    pub items: Vec<ChatMessage>,
    pub next_page_token: Option<String>,
}

#[derive(Debug)]
pub enum FeedError {
    /// The stream exists but has no active chat, or the stream id is unknown.
    /// Terminal: the fetcher disconnects on this.
    NotFound(String),
    /// Anything retryable: HTTP failures, malformed payloads, quota errors.
    Transient(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::NotFound(msg) => write!(f, "not found: {}", msg),
            FeedError::Transient(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        FeedError::Transient(e.to_string())
    }
}

/// Pull-based chat feed. Resolved once to a chat id, then polled page by
/// page on an opaque cursor.
#[async_trait]
pub trait ChatFeed: Send + Sync {
    async fn resolve_chat_id(&self, stream_id: &str) -> Result<String, FeedError>;
    async fn fetch_page(
        &self,
        chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<ChatPage, FeedError>;
}

/// YouTube Data API v3 live chat client.
pub struct YouTubeFeed {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YouTubeFeed {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://www.googleapis.com/youtube/v3".to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    fn parse_items(response: &Value) -> Vec<ChatMessage> {
        let mut items = Vec::new();
        for item in response["items"].as_array().into_iter().flatten() {
            let id = match item["id"].as_str() {
                Some(id) => id.to_string(),
                None => continue,
            };
            let snippet = &item["snippet"];
            let author_details = &item["authorDetails"];

            let mut author = author_details["displayName"]
                .as_str()
                .unwrap_or("")
                .trim()
                .to_string();
            if author.is_empty() {
                author = "Anonymous".to_string();
            }

            let is_member = author_details["isChatOwner"].as_bool().unwrap_or(false)
                || author_details["isChatSponsor"].as_bool().unwrap_or(false)
                || author_details["isChatModerator"].as_bool().unwrap_or(false);

            let kind = snippet["type"].as_str().unwrap_or("textMessageEvent");

            items.push(ChatMessage {
                id,
                author,
                text: snippet["displayMessage"].as_str().unwrap_or("").to_string(),
                is_member,
                is_system: kind != "textMessageEvent",
            });
        }
        items
    }
}

#[async_trait]
impl ChatFeed for YouTubeFeed {
    async fn resolve_chat_id(&self, stream_id: &str) -> Result<String, FeedError> {
        let url = format!(
            "{}/videos?part=liveStreamingDetails&id={}&key={}",
            self.base_url, stream_id, self.api_key
        );
        let response: Value = self.client.get(&url).send().await?.json().await?;

        let chat_id = response["items"]
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item["liveStreamingDetails"]["activeLiveChatId"].as_str());

        match chat_id {
            Some(id) => Ok(id.to_string()),
            None => Err(FeedError::NotFound(format!(
                "video {} is not an active live stream",
                stream_id
            ))),
        }
    }

    async fn fetch_page(
        &self,
        chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<ChatPage, FeedError> {
        let mut url = format!(
            "{}/liveChat/messages?liveChatId={}&part=snippet,authorDetails&key={}",
            self.base_url, chat_id, self.api_key
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", token));
        }

        let response: Value = self.client.get(&url).send().await?.json().await?;
        if let Some(error) = response.get("error") {
            return Err(FeedError::Transient(format!(
                "feed error: {}",
                error["message"].as_str().unwrap_or("unknown")
            )));
        }

        Ok(ChatPage {
            items: Self::parse_items(&response),
            next_page_token: response["nextPageToken"].as_str().map(String::from),
        })
    }
}

/// Accepts a bare video id or any of the usual YouTube URL shapes
/// (watch?v=, youtu.be/, embed/) and returns the video id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if !input.contains("youtube.com") && !input.contains("youtu.be") {
        return Some(input.to_string());
    }

    let stripped = input
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");

    if let Some(rest) = stripped.strip_prefix("youtu.be/") {
        let id: String = rest.chars().take_while(|c| *c != '?' && *c != '&').collect();
        return if id.is_empty() { None } else { Some(id) };
    }
    if let Some(pos) = stripped.find("v=") {
        let id: String = stripped[pos + 2..]
            .chars()
            .take_while(|c| *c != '&')
            .collect();
        return if id.is_empty() { None } else { Some(id) };
    }
    if let Some(pos) = stripped.find("embed/") {
        let id: String = stripped[pos + 6..]
            .chars()
            .take_while(|c| *c != '?' && *c != '/')
            .collect();
        return if id.is_empty() { None } else { Some(id) };
    }
    None
}
