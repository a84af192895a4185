//! Remote code-hosting search client.
//!
//! The discovery engine consumes the narrow [`SearchClient`] interface;
//! the GitHub implementation lives here so tests can substitute a stub.

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Typed item shape the core consumes from the remote search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRepoItem {
    pub id: String,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub pushed_at: String,
    pub license: Option<String>,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub archived: bool,
    pub fork: bool,
}

/// Narrow search interface. Item order within a page mirrors the remote
/// response; callers must not rely on ordering across pages or lanes.
pub trait SearchClient {
    fn search(&self, query: &str, page: u32) -> Result<Vec<RemoteRepoItem>>;
}

const GITHUB_API: &str = "https://api.github.com";
const PER_PAGE: u32 = 30;

pub struct GithubClient {
    agent: ureq::Agent,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(Duration::from_secs(30)).build();
        Self { agent, token }
    }
}

impl SearchClient for GithubClient {
    fn search(&self, query: &str, page: u32) -> Result<Vec<RemoteRepoItem>> {
        let url = format!("{GITHUB_API}/search/repositories");
        let mut request = self
            .agent
            .get(&url)
            .query("q", query)
            .query("sort", "stars")
            .query("order", "desc")
            .query("per_page", &PER_PAGE.to_string())
            .query("page", &page.to_string())
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", "repo-scout");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        match request.call() {
            Ok(response) => {
                let body: serde_json::Value =
                    response.into_json().map_err(|err| ScoutError::RemoteError {
                        message: format!("malformed search response: {err}"),
                    })?;
                Ok(parse_search_items(&body))
            }
            // 403/429 carry rate-limit semantics; callers back off and retry.
            Err(ureq::Error::Status(code, _)) if code == 403 || code == 429 => {
                Err(ScoutError::RemoteRateLimited { attempts: 1 })
            }
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                Err(ScoutError::RemoteError { message: format!("HTTP {code}: {detail}") })
            }
            Err(ureq::Error::Transport(err)) => {
                Err(ScoutError::RemoteError { message: err.to_string() })
            }
        }
    }
}

fn parse_search_items(body: &serde_json::Value) -> Vec<RemoteRepoItem> {
    let Some(items) = body.get("items").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            Some(RemoteRepoItem {
                id: item.get("full_name")?.as_str()?.to_string(),
                url: item.get("html_url")?.as_str()?.to_string(),
                stars: item.get("stargazers_count").and_then(|v| v.as_u64()).unwrap_or(0),
                forks: item.get("forks_count").and_then(|v| v.as_u64()).unwrap_or(0),
                pushed_at: item.get("pushed_at").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                license: item
                    .get("license")
                    .and_then(|l| l.get("spdx_id"))
                    .and_then(|v| v.as_str())
                    .filter(|s| *s != "NOASSERTION")
                    .map(str::to_string),
                description: item
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                topics: item
                    .get("topics")
                    .and_then(|v| v.as_array())
                    .map(|arr| {
                        arr.iter().filter_map(|t| t.as_str().map(str::to_string)).collect()
                    })
                    .unwrap_or_default(),
                archived: item.get("archived").and_then(|v| v.as_bool()).unwrap_or(false),
                fork: item.get("fork").and_then(|v| v.as_bool()).unwrap_or(false),
            })
        })
        .collect()
}
