use anyhow::{bail, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use super::http::ApiTransport;

const PAGE_LIMIT: usize = 1000;

/// Tag namespace in Global Tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagType {
    #[default]
    User,
    Access,
    Service,
}

impl TagType {
    pub fn as_str(self) -> &'static str {
        match self {
            TagType::User => "user",
            TagType::Access => "access",
            TagType::Service => "service",
        }
    }
}

impl std::str::FromStr for TagType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(TagType::User),
            "access" => Ok(TagType::Access),
            "service" => Ok(TagType::Service),
            other => bail!("Unknown tag type '{}'. Expected user, access or service", other),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    total_count: Option<usize>,
    #[serde(default)]
    items: Vec<TagItem>,
}

#[derive(Debug, Deserialize)]
struct TagItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TagResults {
    #[serde(default)]
    results: Vec<TagResultItem>,
}

#[derive(Debug, Deserialize)]
struct TagResultItem {
    #[serde(default)]
    resource_id: Option<String>,
    #[serde(default)]
    is_error: bool,
}

/// Client for the Global Tagging v3 API.
#[derive(Debug, Clone)]
pub struct GlobalTaggingClient {
    transport: ApiTransport,
    base_url: String,
}

impl GlobalTaggingClient {
    pub fn new(transport: ApiTransport, endpoint: &str) -> Self {
        Self {
            transport,
            base_url: format!("{}/v3", endpoint.trim_end_matches('/')),
        }
    }

    /// Names of all tags of `tag_type` attached to a resource, across pages.
    pub async fn list_attached(&self, resource_id: &str, tag_type: TagType) -> Result<Vec<String>> {
        let url = ApiTransport::url(&self.base_url, &["tags"])?;
        let mut names = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut query = vec![
                ("attached_to", resource_id.to_string()),
                ("tag_type", tag_type.as_str().to_string()),
                ("offset", offset.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if tag_type == TagType::User {
                query.push(("providers", "ghost".to_string()));
            }

            let page: TagList = self
                .transport
                .send(Method::GET, url.clone(), &query, None, "list tags")
                .await?;
            let fetched = page.items.len();
            names.extend(page.items.into_iter().map(|t| t.name));
            offset += fetched;

            let total = page.total_count.unwrap_or(offset);
            if fetched < PAGE_LIMIT || offset >= total {
                break;
            }
        }

        Ok(names)
    }

    pub async fn attach(&self, resource_id: &str, tags: &[String], tag_type: TagType) -> Result<()> {
        self.update_tags("attach", resource_id, tags, tag_type).await
    }

    pub async fn detach(&self, resource_id: &str, tags: &[String], tag_type: TagType) -> Result<()> {
        self.update_tags("detach", resource_id, tags, tag_type).await
    }

    async fn update_tags(
        &self,
        action: &str,
        resource_id: &str,
        tags: &[String],
        tag_type: TagType,
    ) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }
        let url = ApiTransport::url(&self.base_url, &["tags", action])?;
        let query = [("tag_type", tag_type.as_str().to_string())];
        let body = json!({
            "resources": [{ "resource_id": resource_id }],
            "tag_names": tags,
        });
        let operation = format!("{} tags", action);
        let results: TagResults = self
            .transport
            .send(Method::POST, url, &query, Some(&body), &operation)
            .await?;

        let failed: Vec<String> = results
            .results
            .into_iter()
            .filter(|r| r.is_error)
            .map(|r| r.resource_id.unwrap_or_else(|| resource_id.to_string()))
            .collect();
        if !failed.is_empty() {
            bail!(
                "Failed to {} tags [{}] on {}",
                action,
                tags.join(", "),
                failed.join(", ")
            );
        }
        Ok(())
    }
}
