use crate::remote::RemoteIdentity;
use gitchat_core::config::Config;
use gitchat_core::error::{self, SyncError};
use reqwest::{StatusCode, Url};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PAGE_SIZE: usize = 100;

/// One commit as reported by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: String,
    pub url: String,
    pub changed_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    #[serde(default)]
    html_url: String,
    commit: ApiCommitDetail,
    #[serde(default)]
    files: Vec<ApiFile>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    message: String,
    author: Option<ApiAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
struct ApiFile {
    filename: String,
}

impl From<ApiCommit> for CommitInfo {
    fn from(c: ApiCommit) -> Self {
        let author = c.commit.author.unwrap_or(ApiAuthor {
            name: String::new(),
            email: String::new(),
            date: String::new(),
        });
        Self {
            sha: c.sha,
            message: c.commit.message,
            author_name: author.name,
            author_email: author.email,
            timestamp: author.date,
            url: c.html_url,
            changed_files: c.files.into_iter().map(|f| f.filename).collect(),
        }
    }
}

/// Reads commit history of the remote from the hosting service's REST API.
pub struct CommitFetcher {
    client: Client,
    api_base: String,
    api_host: String,
}

impl CommitFetcher {
    pub fn new(api_base: &str, token: Option<&str>) -> Result<Self, SyncError> {
        let api_host = Url::parse(api_base)
            .map_err(SyncError::http)?
            .host_str()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| SyncError::Http(format!("api base {api_base} has no host")))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("gitchat"));
        if let Some(tok) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {tok}")).map_err(SyncError::http)?,
            );
        }
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(SyncError::http)?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_host,
        })
    }

    pub fn from_config(config: &Config) -> error::Result<Self> {
        let token = config.token()?;
        Ok(Self::new(&config.remote.api_base, token.as_deref())?)
    }

    /// Newest first, at most `max_count`, each with its changed files.
    pub fn list_commits(
        &self,
        identity: &RemoteIdentity,
        branch: &str,
        path: Option<&str>,
        max_count: usize,
    ) -> Result<Vec<CommitInfo>, SyncError> {
        let url = format!("{}/commits", self.repo_url(identity)?);
        let per_page = max_count.clamp(1, PAGE_SIZE).to_string();
        let mut commits = Vec::new();
        let mut page = 1usize;

        while commits.len() < max_count {
            let page_str = page.to_string();
            let mut query = vec![
                ("sha", branch),
                ("per_page", per_page.as_str()),
                ("page", page_str.as_str()),
            ];
            if let Some(p) = path {
                query.push(("path", p));
            }
            debug!(%url, page, "listing commits");
            let listed: Vec<ApiCommit> = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.json())
                .map_err(SyncError::http)?;
            let exhausted = listed.len() < max_count.clamp(1, PAGE_SIZE);

            for summary in listed {
                if commits.len() >= max_count {
                    break;
                }
                // The list endpoint omits changed files.
                let detailed = self.get_commit(identity, &summary.sha)?;
                commits.push(detailed.unwrap_or_else(|| summary.into()));
            }
            if exhausted {
                break;
            }
            page += 1;
        }
        Ok(commits)
    }

    /// `None` when the commit does not exist or the sha is malformed.
    pub fn get_commit(
        &self,
        identity: &RemoteIdentity,
        sha: &str,
    ) -> Result<Option<CommitInfo>, SyncError> {
        let url = format!("{}/commits/{sha}", self.repo_url(identity)?);
        let resp = self.client.get(&url).send().map_err(SyncError::http)?;
        if matches!(
            resp.status(),
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            return Ok(None);
        }
        let commit: ApiCommit = resp
            .error_for_status()
            .and_then(|r| r.json())
            .map_err(SyncError::http)?;
        Ok(Some(commit.into()))
    }

    fn repo_url(&self, identity: &RemoteIdentity) -> Result<String, SyncError> {
        if identity.is_local() {
            return Err(SyncError::Http(format!(
                "{identity} is a local remote with no hosting api"
            )));
        }
        if !self.serves(identity) {
            return Err(SyncError::Http(format!(
                "{} does not serve {}; set [remote] api_base for this host",
                self.api_base, identity.host
            )));
        }
        Ok(format!("{}/repos/{}", self.api_base, identity.slug()))
    }

    /// The API answers for `host` itself or for `api.<host>`.
    fn serves(&self, identity: &RemoteIdentity) -> bool {
        let host = identity.host.to_ascii_lowercase();
        self.api_host == host || self.api_host.strip_prefix("api.") == Some(host.as_str())
    }
}
