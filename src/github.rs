//! Commits the report to a GitHub repository through the git data API.
//!
//! One file, one commit, parent = current branch head. The ref update is not
//! forced: if another writer moved the head in between, GitHub answers 422
//! and the write fails. Nothing is retried or merged.

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::{FetchConfig, SinkConfig};
use crate::error::PersistCause;
use crate::http::build_client;
use crate::sink::{PersistReceipt, ReportSink};

pub struct GitHubSink {
    http: Client,
    api_url: String,
    owner: String,
    repo: String,
    branch: String,
    path: String,
    message: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitCommit {
    tree: GitObject,
}

impl GitHubSink {
    pub fn from_config(config: &SinkConfig, fetch: &FetchConfig) -> Result<Self, PersistCause> {
        let SinkConfig::Github {
            api_url,
            owner,
            repo,
            branch,
            path,
            message,
            token,
        } = config
        else {
            return Err(PersistCause::Response("not a github sink".into()));
        };

        let token = token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(PersistCause::MissingCredentials("GITHUB_TOKEN"))?;
        let http =
            build_client(fetch.timeout()).map_err(|e| PersistCause::Connection(e.to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            owner: owner.clone(),
            repo: repo.clone(),
            branch: branch.clone(),
            path: path.clone(),
            message: message.clone(),
            token,
        })
    }

    fn repo_url(&self, rest: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_url, self.owner, self.repo, rest)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }

    fn send<T: for<'de> Deserialize<'de>>(&self, req: RequestBuilder) -> Result<T, PersistCause> {
        let response = self
            .authorized(req)
            .send()
            .map_err(|e| PersistCause::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PersistCause::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .map_err(|e| PersistCause::Response(e.to_string()))
    }

    fn head(&self) -> Result<String, PersistCause> {
        let url = self.repo_url(&format!("git/ref/heads/{}", self.branch));
        let git_ref: GitRef = self.send(self.http.get(&url))?;
        Ok(git_ref.object.sha)
    }

    fn commit_tree(&self, sha: &str) -> Result<String, PersistCause> {
        let url = self.repo_url(&format!("git/commits/{}", sha));
        let commit: GitCommit = self.send(self.http.get(&url))?;
        Ok(commit.tree.sha)
    }

    fn create_tree(&self, base_tree: &str, path: &str, content: &str) -> Result<String, PersistCause> {
        let body = json!({
            "base_tree": base_tree,
            "tree": [{
                "path": path,
                "mode": "100644",
                "type": "blob",
                "content": content,
            }],
        });
        let tree: GitObject = self.send(self.http.post(self.repo_url("git/trees")).json(&body))?;
        Ok(tree.sha)
    }

    fn create_commit(&self, tree: &str, parent: &str) -> Result<String, PersistCause> {
        let body = json!({
            "message": self.message,
            "tree": tree,
            "parents": [parent],
        });
        let commit: GitObject =
            self.send(self.http.post(self.repo_url("git/commits")).json(&body))?;
        Ok(commit.sha)
    }

    fn update_ref(&self, sha: &str) -> Result<(), PersistCause> {
        let url = self.repo_url(&format!("git/refs/heads/{}", self.branch));
        let body = json!({ "sha": sha, "force": false });
        let _: GitRef = self.send(self.http.patch(&url).json(&body))?;
        Ok(())
    }
}

impl ReportSink for GitHubSink {
    fn name(&self) -> &str {
        "github"
    }

    fn target(&self) -> &str {
        &self.path
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<PersistReceipt, PersistCause> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| PersistCause::Response(format!("report is not UTF-8: {}", e)))?;

        let head = self.head()?;
        let base_tree = self.commit_tree(&head)?;
        let tree = self.create_tree(&base_tree, path, content)?;
        let commit = self.create_commit(&tree, &head)?;
        self.update_ref(&commit)?;

        info!(action = "commit", component = "github_sink", owner = self.owner.as_str(), repo = self.repo.as_str(), branch = self.branch.as_str(), parent = head.as_str(), commit = commit.as_str(), "Committed report");

        Ok(PersistReceipt {
            sink: self.name().to_string(),
            location: format!("{}/{}@{}:{}", self.owner, self.repo, self.branch, path),
            revision: Some(commit),
        })
    }
}
