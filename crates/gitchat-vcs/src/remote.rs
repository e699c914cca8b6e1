use gitchat_core::error::ConfigError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Https,
    Ssh,
    /// `file://` URL or bare filesystem path.
    Local,
}

/// Owner/repository coordinates of the remote, parsed once at engine construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIdentity {
    pub transport: Transport,
    pub host: String,
    pub owner: String,
    pub repo: String,
}

impl RemoteIdentity {
    /// Accepted forms:
    /// - `https://host/owner/repo[.git]` (userinfo is stripped)
    /// - `git@host:owner/repo[.git]` and `ssh://git@host/owner/repo[.git]`
    /// - `file:///path` or an absolute path, only when `allow_local` is set
    pub fn parse(url: &str, allow_local: bool) -> Result<Self, ConfigError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ConfigError::unparsable_remote(url, "empty url"));
        }

        if let Some(rest) = url.strip_prefix("https://") {
            return parse_hierarchical(url, rest, Transport::Https);
        }
        if let Some(rest) = url.strip_prefix("ssh://") {
            return parse_hierarchical(url, rest, Transport::Ssh);
        }
        if let Some(rest) = url.strip_prefix("file://") {
            return parse_local(url, rest, allow_local);
        }
        if url.starts_with('/') {
            return parse_local(url, url, allow_local);
        }
        if url.contains("://") {
            return Err(ConfigError::unparsable_remote(url, "unsupported scheme"));
        }
        parse_scp_like(url)
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn is_local(&self) -> bool {
        self.transport == Transport::Local
    }

    /// Canonical https clone URL for hosted remotes.
    pub fn clone_url(&self) -> Option<String> {
        match self.transport {
            Transport::Local => None,
            _ => Some(format!("https://{}/{}/{}.git", self.host, self.owner, self.repo)),
        }
    }
}

impl fmt::Display for RemoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "{}/{}", self.owner, self.repo)
        } else {
            write!(f, "{}/{}/{}", self.host, self.owner, self.repo)
        }
    }
}

fn parse_hierarchical(
    url: &str,
    rest: &str,
    transport: Transport,
) -> Result<RemoteIdentity, ConfigError> {
    let (authority, path) = rest
        .split_once('/')
        .ok_or_else(|| ConfigError::unparsable_remote(url, "missing repository path"))?;
    let host = authority.rsplit('@').next().unwrap_or(authority);
    // Drop a port, if any.
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        return Err(ConfigError::unparsable_remote(url, "missing host"));
    }
    let (owner, repo) = owner_and_repo(url, path)?;
    Ok(RemoteIdentity {
        transport,
        host: host.to_ascii_lowercase(),
        owner,
        repo,
    })
}

fn parse_scp_like(url: &str) -> Result<RemoteIdentity, ConfigError> {
    let (authority, path) = url
        .split_once(':')
        .ok_or_else(|| ConfigError::unparsable_remote(url, "unrecognized remote form"))?;
    let Some((_user, host)) = authority.rsplit_once('@') else {
        return Err(ConfigError::unparsable_remote(url, "expected user@host:owner/repo"));
    };
    if host.is_empty() || host.contains('/') {
        return Err(ConfigError::unparsable_remote(url, "missing host"));
    }
    let (owner, repo) = owner_and_repo(url, path)?;
    Ok(RemoteIdentity {
        transport: Transport::Ssh,
        host: host.to_ascii_lowercase(),
        owner,
        repo,
    })
}

fn parse_local(url: &str, path: &str, allow_local: bool) -> Result<RemoteIdentity, ConfigError> {
    if !allow_local {
        return Err(ConfigError::unparsable_remote(
            url,
            "local remotes are disabled (set repo.allow_local_remote)",
        ));
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(ConfigError::unparsable_remote(url, "missing repository path"));
    };
    let repo = last.strip_suffix(".git").unwrap_or(last);
    if repo.is_empty() {
        return Err(ConfigError::unparsable_remote(url, "missing repository name"));
    }
    Ok(RemoteIdentity {
        transport: Transport::Local,
        host: String::new(),
        owner: parents.last().copied().unwrap_or_default().to_string(),
        repo: repo.to_string(),
    })
}

fn owner_and_repo(url: &str, path: &str) -> Result<(String, String), ConfigError> {
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(ConfigError::unparsable_remote(
            url,
            "expected exactly owner/repo",
        )),
    }
}
