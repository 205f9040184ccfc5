use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::traits::MirrorTarget;
use super::{duration_hours, duration_minutes, entry_title};
use crate::entry::TimeEntry;
use crate::sync::{RemoteLocator, SyncError, SyncTarget};

pub const NOTION_VERSION: &str = "2022-06-28";
const NOTION_API: &str = "https://api.notion.com";

/// Database properties every mirrored page writes, with their Notion types.
pub const REQUIRED_PROPERTIES: &[(&str, &str)] = &[
    ("Name", "title"),
    ("Date", "date"),
    ("Project(s)", "multi_select"),
    ("Duration (min)", "number"),
    ("Duration (hrs)", "number"),
    ("Source", "select"),
    ("Notes", "rich_text"),
    ("Reference Links", "rich_text"),
    ("Tags", "multi_select"),
    ("Start Time", "date"),
    ("End Time", "date"),
];

/// A database the integration token can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionDatabase {
    pub id: String,
    pub title: String,
}

/// Page properties for an entry.
pub fn page_properties(entry: &TimeEntry) -> Value {
    let mut props = Map::new();
    props.insert("Name".into(), json!({ "title": [text(&entry_title(entry))] }));
    props.insert("Date".into(), json!({ "date": { "start": entry.date.to_string() } }));
    props.insert(
        "Project(s)".into(),
        json!({ "multi_select": names(&entry.project_names) }),
    );
    props.insert(
        "Duration (min)".into(),
        json!({ "number": duration_minutes(entry.duration_secs) }),
    );
    props.insert(
        "Duration (hrs)".into(),
        json!({ "number": duration_hours(entry.duration_secs) }),
    );
    props.insert(
        "Source".into(),
        json!({ "select": { "name": entry.source.as_str() } }),
    );
    props.insert("Notes".into(), rich_text(entry.notes.as_deref().unwrap_or("")));
    props.insert(
        "Reference Links".into(),
        rich_text(&entry.reference_links.join(", ")),
    );
    props.insert("Tags".into(), json!({ "multi_select": names(&entry.tags) }));

    if let Some(start) = entry.start_time {
        props.insert("Start Time".into(), json!({ "date": { "start": start.to_rfc3339() } }));
    }
    if let Some(end) = entry.end_time {
        props.insert("End Time".into(), json!({ "date": { "start": end.to_rfc3339() } }));
    }

    Value::Object(props)
}

fn text(content: &str) -> Value {
    json!({ "text": { "content": content } })
}

fn rich_text(content: &str) -> Value {
    if content.is_empty() {
        json!({ "rich_text": [] })
    } else {
        json!({ "rich_text": [text(content)] })
    }
}

fn names(items: &[String]) -> Vec<Value> {
    items.iter().map(|name| json!({ "name": name })).collect()
}

/// Property changes needed so `existing` carries every required property.
///
/// A database always has exactly one title property; if it isn't called
/// `Name` it gets renamed rather than duplicated.
pub fn missing_properties(existing: &Map<String, Value>) -> Map<String, Value> {
    let mut changes = Map::new();
    for (name, kind) in REQUIRED_PROPERTIES {
        if existing.contains_key(*name) {
            continue;
        }
        if *kind == "title" {
            let current_title = existing
                .iter()
                .find(|(_, prop)| prop["type"].as_str() == Some("title"))
                .map(|(key, _)| key.clone());
            if let Some(current) = current_title {
                changes.insert(current, json!({ "name": name }));
            }
            continue;
        }
        let mut schema = Map::new();
        schema.insert((*kind).to_string(), json!({}));
        changes.insert((*name).to_string(), Value::Object(schema));
    }
    changes
}

/// Pick databases out of a `/v1/search` result page.
pub fn databases_from_search(results: &[Value]) -> Vec<NotionDatabase> {
    results
        .iter()
        .filter(|r| r["object"].as_str() == Some("database"))
        .filter_map(|db| {
            let id = db["id"].as_str()?.to_string();
            let title = match db["title"].as_array() {
                Some(parts) => parts
                    .iter()
                    .filter_map(|p| p["plain_text"].as_str())
                    .collect::<String>(),
                None => "Untitled".to_string(),
            };
            Some(NotionDatabase { id, title })
        })
        .collect()
}

/// Thin client over the Notion REST API.
#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    token: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(http: Client, token: &str) -> Self {
        Self {
            http,
            token: token.to_string(),
            base_url: NOTION_API.to_string(),
        }
    }

    /// Point the client somewhere other than api.notion.com.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, SyncError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);

        if !status.is_success() || body["object"].as_str() == Some("error") {
            let message = body["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            return Err(SyncError::Api {
                service: "Notion",
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    /// Create a page under `database_id`, returning the page id.
    pub async fn create_page(
        &self,
        database_id: &str,
        properties: &Value,
    ) -> Result<String, SyncError> {
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties,
        });
        let page = self
            .send(self.request(Method::POST, "/v1/pages").json(&body))
            .await?;
        page["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SyncError::UnexpectedResponse("page response has no id".into()))
    }

    pub async fn update_page(&self, page_id: &str, properties: &Value) -> Result<(), SyncError> {
        let path = format!("/v1/pages/{}", urlencoding::encode(page_id));
        self.send(
            self.request(Method::PATCH, &path)
                .json(&json!({ "properties": properties })),
        )
        .await?;
        Ok(())
    }

    pub async fn archive_page(&self, page_id: &str) -> Result<(), SyncError> {
        let path = format!("/v1/pages/{}", urlencoding::encode(page_id));
        self.send(
            self.request(Method::PATCH, &path)
                .json(&json!({ "archived": true })),
        )
        .await?;
        Ok(())
    }

    /// Current property schema of a database.
    pub async fn database_properties(
        &self,
        database_id: &str,
    ) -> Result<Map<String, Value>, SyncError> {
        let path = format!("/v1/databases/{}", urlencoding::encode(database_id));
        let db = self.send(self.request(Method::GET, &path)).await?;
        match db.get("properties") {
            Some(Value::Object(props)) => Ok(props.clone()),
            _ => Err(SyncError::UnexpectedResponse(
                "database response has no properties".into(),
            )),
        }
    }

    pub async fn update_database_properties(
        &self,
        database_id: &str,
        properties: Map<String, Value>,
    ) -> Result<(), SyncError> {
        let path = format!("/v1/databases/{}", urlencoding::encode(database_id));
        self.send(
            self.request(Method::PATCH, &path)
                .json(&json!({ "properties": properties })),
        )
        .await?;
        Ok(())
    }

    /// Databases shared with the integration (first 100 search results).
    pub async fn list_databases(&self) -> Result<Vec<NotionDatabase>, SyncError> {
        let resp = self
            .send(
                self.request(Method::POST, "/v1/search")
                    .json(&json!({ "page_size": 100 })),
            )
            .await?;
        let results = resp["results"].as_array().cloned().unwrap_or_default();
        Ok(databases_from_search(&results))
    }
}

/// Mirrors entries as pages of one Notion database.
pub struct NotionMirror {
    client: NotionClient,
    database_id: String,
}

impl NotionMirror {
    pub fn new(client: NotionClient, database_id: String) -> Self {
        Self {
            client,
            database_id,
        }
    }
}

#[async_trait]
impl MirrorTarget for NotionMirror {
    fn target(&self) -> SyncTarget {
        SyncTarget::Notion
    }

    async fn upsert(&self, entry: &TimeEntry) -> Result<RemoteLocator, SyncError> {
        let properties = page_properties(entry);
        match &entry.notion_page_id {
            Some(page_id) => {
                self.client.update_page(page_id, &properties).await?;
                Ok(RemoteLocator::NotionPage(page_id.clone()))
            }
            None => {
                let page_id = self
                    .client
                    .create_page(&self.database_id, &properties)
                    .await?;
                Ok(RemoteLocator::NotionPage(page_id))
            }
        }
    }

    async fn remove(&self, locator: &RemoteLocator) -> Result<(), SyncError> {
        match locator {
            RemoteLocator::NotionPage(page_id) => self.client.archive_page(page_id).await,
            other => Err(SyncError::WrongLocator(other.clone())),
        }
    }

    async fn provision(&self) -> Result<(), SyncError> {
        let existing = self.client.database_properties(&self.database_id).await?;
        let changes = missing_properties(&existing);
        if changes.is_empty() {
            tracing::info!(database_id = %self.database_id, "Notion database already provisioned");
            return Ok(());
        }
        tracing::info!(
            database_id = %self.database_id,
            count = changes.len(),
            "adding missing Notion properties"
        );
        self.client
            .update_database_properties(&self.database_id, changes)
            .await
    }
}
