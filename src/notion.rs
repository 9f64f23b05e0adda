//! [`SourceStore`] backed by a Notion database.
//!
//! Each database page is one [`Entry`]; its properties carry the front-matter
//! fields and its child blocks carry the content:
//!
//! | property      | kind         | maps to                  |
//! |---------------|--------------|--------------------------|
//! | `Name`        | title        | `title`                  |
//! | `Description` | rich text    | `description`            |
//! | `Category`    | select       | `category`               |
//! | `Slug`        | rich text    | `slug`                   |
//! | `Tags`        | multi-select | `tags`                   |
//! | `Status`      | select       | `status`                 |
//!
//! `published_at` is the calendar day of the page's `last_edited_time`.
//! List endpoints are paginated with `start_cursor` / `next_cursor`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::config::NotionConfig;
use crate::contract::{BoxError, ContentBlock, Emphasis, Entry, SourceStore, Status, TextRun};

pub const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;
const STATUS_PROPERTY: &str = "Status";

/// The select option name Notion uses for each status.
pub fn status_name(status: Status) -> &'static str {
    match status {
        Status::Draft => "Draft",
        Status::ReadyToPublish => "Ready to publish",
        Status::Published => "Published",
    }
}

fn status_from_name(name: &str) -> Status {
    match name {
        "Ready to publish" => Status::ReadyToPublish,
        "Published" => Status::Published,
        _ => Status::Draft,
    }
}

pub struct NotionClient {
    http: Client,
    config: NotionConfig,
}

impl NotionClient {
    pub fn new(config: NotionConfig) -> Self {
        info!(database_id = %config.database_id, base_url = %config.base_url, "Initialized Notion client");
        Self {
            http: Client::new(),
            config,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value, BoxError> {
        let response = request
            .bearer_auth(&self.config.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, request = what, "Failed to reach Notion API");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            error!(status = %status, request = what, "Notion API returned error. Response body: {body}");
            return Err(format!("Notion API returned {status} for {what}: {body}").into());
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl SourceStore for NotionClient {
    async fn query(&self, status: Status) -> Result<Vec<Entry>, BoxError> {
        let url = format!(
            "{}/v1/databases/{}/query",
            self.config.base_url, self.config.database_id
        );
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({
                "filter": {
                    "property": STATUS_PROPERTY,
                    "select": { "equals": status_name(status) },
                },
                "page_size": PAGE_SIZE,
            });
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }

            let page = self
                .send(self.http.post(&url).json(&body), "database query")
                .await?;
            for result in results(&page) {
                entries.push(entry_from_page(result)?);
            }

            match next_cursor(&page) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(count = entries.len(), status = ?status, "Queried Notion database");
        Ok(entries)
    }

    async fn fetch_blocks(&self, entry_id: &str) -> Result<Vec<ContentBlock>, BoxError> {
        let url = format!("{}/v1/blocks/{}/children", self.config.base_url, entry_id);
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(&[("page_size", PAGE_SIZE.to_string())]);
            if let Some(c) = &cursor {
                request = request.query(&[("start_cursor", c)]);
            }

            let page = self.send(request, "block children").await?;
            blocks.extend(results(&page).iter().map(block_from_json));

            match next_cursor(&page) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(entry_id, count = blocks.len(), "Fetched blocks");
        Ok(blocks)
    }

    async fn set_status(&self, entry_id: &str, status: Status) -> Result<(), BoxError> {
        let url = format!("{}/v1/pages/{}", self.config.base_url, entry_id);
        let mut properties = serde_json::Map::new();
        properties.insert(
            STATUS_PROPERTY.to_string(),
            json!({ "select": { "name": status_name(status) } }),
        );
        let body = json!({ "properties": properties });
        self.send(self.http.patch(&url).json(&body), "page update")
            .await?;
        info!(entry_id, status = ?status, "Updated page status");
        Ok(())
    }
}

fn results(page: &Value) -> &[Value] {
    page.get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn next_cursor(page: &Value) -> Option<String> {
    let has_more = page.get("has_more").and_then(Value::as_bool).unwrap_or(false);
    if !has_more {
        return None;
    }
    page.get("next_cursor")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Map one database page onto an [`Entry`].
pub fn entry_from_page(page: &Value) -> Result<Entry, BoxError> {
    let id = page
        .get("id")
        .and_then(Value::as_str)
        .ok_or("page has no id")?
        .to_string();
    let edited = page
        .get("last_edited_time")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("page {id} has no last_edited_time"))?;
    let published_at: NaiveDate = DateTime::parse_from_rfc3339(edited)
        .map_err(|e| format!("page {id} has invalid last_edited_time {edited:?}: {e}"))?
        .naive_utc()
        .date();

    let properties = page.get("properties").unwrap_or(&Value::Null);
    let property = move |name: &str| properties.get(name).unwrap_or(&Value::Null);

    let tags: Vec<String> = property("Tags")
        .get("multi_select")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Entry {
        title: plain_text(property("Name").get("title")),
        description: plain_text(property("Description").get("rich_text")),
        category: select_name(property("Category")),
        slug: plain_text(property("Slug").get("rich_text")),
        // a single tag is not exposed
        tags: if tags.len() > 1 { tags } else { Vec::new() },
        published_at,
        status: select_name(property(STATUS_PROPERTY))
            .map(|name| status_from_name(&name))
            .unwrap_or(Status::Draft),
        id,
    })
}

/// Map one block object onto a [`ContentBlock`].
pub fn block_from_json(block: &Value) -> ContentBlock {
    let kind = block
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let runs = || text_runs(block.get(kind).and_then(|b| b.get("rich_text")));

    match kind {
        "paragraph" => ContentBlock::Paragraph(runs()),
        "heading_1" => ContentBlock::Heading1(runs()),
        "heading_2" => ContentBlock::Heading2(runs()),
        "heading_3" => ContentBlock::Heading3(runs()),
        "bulleted_list_item" => ContentBlock::BulletItem(runs()),
        other => ContentBlock::Unsupported(other.to_string()),
    }
}

fn text_runs(rich_text: Option<&Value>) -> Vec<TextRun> {
    let Some(items) = rich_text.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            let annotations = item.get("annotations").unwrap_or(&Value::Null);
            let flag = move |name: &str| annotations.get(name).and_then(Value::as_bool).unwrap_or(false);
            TextRun {
                text: item
                    .get("plain_text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                emphasis: Emphasis {
                    bold: flag("bold"),
                    italic: flag("italic"),
                    strikethrough: flag("strikethrough"),
                    code: flag("code"),
                },
                link: item
                    .get("href")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        })
        .collect()
}

fn plain_text(rich_text: Option<&Value>) -> Option<String> {
    let text: String = rich_text
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|item| item.get("plain_text").and_then(Value::as_str))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

fn select_name(property: &Value) -> Option<String> {
    property
        .get("select")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
}
