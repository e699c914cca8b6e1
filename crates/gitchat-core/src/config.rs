use crate::constants;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub repo: RepoConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_db_file")]
    pub db_file: String,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
    #[serde(default = "default_cache_size")]
    pub cache_size: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default = "default_messages_dir")]
    pub messages_dir: String,
    #[serde(default = "default_git_bin")]
    pub git_bin: String,
    /// Accept `file://` and absolute-path remotes (local mirrors).
    #[serde(default)]
    pub allow_local_remote: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default)]
    pub require_token: bool,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_data_dir() -> String {
    "~/.gitchat".into()
}
fn default_db_file() -> String {
    constants::STATE_DB_FILE.into()
}
fn default_busy_timeout() -> u32 {
    5000
}
fn default_cache_size() -> i32 {
    -64000
}
fn default_branch() -> String {
    constants::DEFAULT_BRANCH.into()
}
fn default_remote() -> String {
    constants::DEFAULT_REMOTE.into()
}
fn default_messages_dir() -> String {
    constants::MESSAGES_DIR.into()
}
fn default_git_bin() -> String {
    "git".into()
}
fn default_token_env() -> String {
    constants::DEFAULT_TOKEN_ENV.into()
}
fn default_api_base() -> String {
    constants::DEFAULT_API_BASE.into()
}
fn default_limit() -> u32 {
    constants::DEFAULT_LIMIT
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_file: default_db_file(),
            busy_timeout_ms: default_busy_timeout(),
            cache_size: default_cache_size(),
        }
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            remote: default_remote(),
            messages_dir: default_messages_dir(),
            git_bin: default_git_bin(),
            allow_local_remote: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            require_token: false,
            api_base: default_api_base(),
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with layered precedence:
    /// 1. Environment variables `GITCHAT_<SECTION>_<KEY>` (highest priority)
    /// 2. Explicit config file (from `--config` flag)
    /// 3. Project config: `<worktree>/.gitchat/config.toml`
    /// 4. Global config: `~/.gitchat/config.toml`
    /// 5. Built-in defaults (lowest priority)
    ///
    /// Only fields explicitly set in a higher-priority layer override lower layers.
    pub fn load(worktree: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_file(worktree, None)
    }

    pub fn load_with_file(
        worktree: Option<&Path>,
        config_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        if let Some(home) = dirs::home_dir() {
            let global_path = home.join(constants::DEFAULT_DATA_DIR).join("config.toml");
            if global_path.exists() {
                let raw = load_toml_value(&global_path)?;
                merge_toml_values(&mut merged, &raw);
            }
        }

        if let Some(root) = worktree {
            let project_path = root.join(constants::PROJECT_CONFIG_FILE);
            if project_path.exists() {
                let raw = load_toml_value(&project_path)?;
                merge_toml_values(&mut merged, &raw);
            }
        }

        if let Some(cf) = config_file {
            if !cf.exists() {
                return Err(ConfigError::NotFound {
                    path: cf.display().to_string(),
                });
            }
            let raw = load_toml_value(cf)?;
            merge_toml_values(&mut merged, &raw);
        }

        let config_str =
            toml::to_string(&merged).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        apply_env_overrides(&mut config);
        config.validate()?;

        config.storage.data_dir = expand_tilde(&config.storage.data_dir);

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.repo.branch.trim().is_empty() {
            return Err(invalid("repo.branch", "must not be empty"));
        }
        if self.repo.remote.trim().is_empty() {
            return Err(invalid("repo.remote", "must not be empty"));
        }
        let messages_dir = Path::new(&self.repo.messages_dir);
        if self.repo.messages_dir.trim().is_empty()
            || messages_dir.is_absolute()
            || messages_dir
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(invalid(
                "repo.messages_dir",
                "must be a relative path inside the working tree",
            ));
        }
        Ok(())
    }

    /// Path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir).join(&self.storage.db_file)
    }

    /// Read the hosting-service token, failing when one is required but absent.
    pub fn token(&self) -> Result<Option<String>, ConfigError> {
        match std::env::var(&self.remote.token_env) {
            Ok(v) if !v.trim().is_empty() => Ok(Some(v)),
            _ if self.remote.require_token => Err(ConfigError::MissingCredential {
                env_var: self.remote.token_env.clone(),
            }),
            _ => Ok(None),
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Load a TOML file as a raw `toml::Value` (preserving only explicitly-set fields).
fn load_toml_value(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<toml::Value>()
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))
}

/// Deep-merge `overlay` into `base`. Only keys present in `overlay` are written.
fn merge_toml_values(base: &mut toml::Value, overlay: &toml::Value) {
    if let (toml::Value::Table(base_map), toml::Value::Table(overlay_map)) = (base, overlay) {
        for (key, overlay_val) in overlay_map {
            if let Some(base_val) = base_map.get_mut(key) {
                if base_val.is_table() && overlay_val.is_table() {
                    merge_toml_values(base_val, overlay_val);
                } else {
                    *base_val = overlay_val.clone();
                }
            } else {
                base_map.insert(key.clone(), overlay_val.clone());
            }
        }
    }
}

/// Convention: `GITCHAT_<SECTION>_<KEY>` in UPPER_SNAKE_CASE.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("GITCHAT_STORAGE_DATA_DIR") {
        config.storage.data_dir = v;
    }
    if let Ok(v) = std::env::var("GITCHAT_STORAGE_DB_FILE") {
        config.storage.db_file = v;
    }
    if let Ok(v) = std::env::var("GITCHAT_STORAGE_BUSY_TIMEOUT_MS")
        && let Ok(n) = v.parse()
    {
        config.storage.busy_timeout_ms = n;
    }
    if let Ok(v) = std::env::var("GITCHAT_REPO_BRANCH") {
        config.repo.branch = v;
    }
    if let Ok(v) = std::env::var("GITCHAT_REPO_REMOTE") {
        config.repo.remote = v;
    }
    if let Ok(v) = std::env::var("GITCHAT_REPO_MESSAGES_DIR") {
        config.repo.messages_dir = v;
    }
    if let Ok(v) = std::env::var("GITCHAT_REPO_GIT_BIN") {
        config.repo.git_bin = v;
    }
    if let Ok(v) = std::env::var("GITCHAT_REPO_ALLOW_LOCAL_REMOTE") {
        config.repo.allow_local_remote = v == "true" || v == "1";
    }
    if let Ok(v) = std::env::var("GITCHAT_REMOTE_REQUIRE_TOKEN") {
        config.remote.require_token = v == "true" || v == "1";
    }
    if let Ok(v) = std::env::var("GITCHAT_REMOTE_TOKEN_ENV") {
        config.remote.token_env = v;
    }
    if let Ok(v) = std::env::var("GITCHAT_REMOTE_API_BASE") {
        config.remote.api_base = v;
    }
    if let Ok(v) = std::env::var("GITCHAT_LIST_DEFAULT_LIMIT")
        && let Ok(n) = v.parse()
    {
        config.list.default_limit = n;
    }
    if let Ok(v) = std::env::var("GITCHAT_LOGGING_LEVEL") {
        config.logging.level = v;
    }
}

fn expand_tilde(path: &str) -> String {
    if path.starts_with('~')
        && let Some(home) = dirs::home_dir()
    {
        return path.replacen('~', &home.to_string_lossy(), 1);
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_main_and_messages_dir() {
        let config = Config::default();
        assert_eq!(config.repo.branch, "main");
        assert_eq!(config.repo.remote, "origin");
        assert_eq!(config.repo.messages_dir, "messages");
        assert_eq!(config.list.default_limit, 50);
        assert!(!config.remote.require_token);
    }

    #[test]
    fn merge_only_overrides_explicit_keys() {
        let mut base: toml::Value = toml::from_str(
            r#"
            [repo]
            branch = "main"
            remote = "origin"
            "#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
            [repo]
            branch = "trunk"
            "#,
        )
        .unwrap();
        merge_toml_values(&mut base, &overlay);
        let repo = base.get("repo").and_then(|v| v.as_table()).unwrap();
        assert_eq!(repo.get("branch").and_then(|v| v.as_str()), Some("trunk"));
        assert_eq!(repo.get("remote").and_then(|v| v.as_str()), Some("origin"));
    }

    #[test]
    fn project_and_explicit_files_layer_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let project_cfg = dir.path().join(constants::PROJECT_CONFIG_FILE);
        std::fs::create_dir_all(project_cfg.parent().unwrap()).unwrap();
        std::fs::write(
            &project_cfg,
            "[storage]\ndata_dir = \"/tmp/project\"\n[list]\ndefault_limit = 10\n",
        )
        .unwrap();
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&explicit, "[list]\ndefault_limit = 20\n").unwrap();

        let config = Config::load_with_file(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(config.list.default_limit, 20);
        assert_eq!(config.storage.data_dir, "/tmp/project");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/project/chat.db"));
    }

    #[test]
    fn missing_explicit_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_with_file(None, Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn messages_dir_must_stay_inside_worktree() {
        let mut config = Config::default();
        config.repo.messages_dir = "../outside".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "repo.messages_dir"
        ));
    }

    #[test]
    fn required_token_missing_is_a_config_error() {
        let mut config = Config::default();
        config.remote.token_env = "GITCHAT_TEST_TOKEN_THAT_IS_NEVER_SET".into();
        assert_eq!(config.token().unwrap(), None);
        config.remote.require_token = true;
        assert!(matches!(
            config.token(),
            Err(ConfigError::MissingCredential { .. })
        ));
    }
}
