use directories::ProjectDirs;
use eyre::{Context as _, ContextCompat as _};
use std::path::PathBuf;

pub const CONFIG_DIR_ENV: &str = "PENDLE_MCP_CONFIG_DIR";
pub const DATA_DIR_ENV: &str = "PENDLE_MCP_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendlePaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl PendlePaths {
    fn from_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        let log_file = data_dir.join("pendle-mcp.log.jsonl");
        Self {
            config_dir,
            data_dir,
            log_file,
        }
    }

    pub fn discover() -> eyre::Result<Self> {
        Self::discover_with(|k| std::env::var(k).ok())
    }

    /// Each directory can be overridden on its own; the other falls back to the platform default.
    pub fn discover_with(env: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let from_env = |k: &str| env(k).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        let (config_override, data_override) = (from_env(CONFIG_DIR_ENV), from_env(DATA_DIR_ENV));
        if let (Some(config_dir), Some(data_dir)) = (&config_override, &data_override) {
            return Ok(Self::from_dirs(config_dir.clone(), data_dir.clone()));
        }

        // macOS: ~/Library/Application Support/pendle-mcp
        // Linux: ~/.config/pendle-mcp, ~/.local/share/pendle-mcp
        let proj =
            ProjectDirs::from("", "", "pendle-mcp").context("failed to resolve project dirs")?;
        Ok(Self::from_dirs(
            config_override.unwrap_or_else(|| proj.config_dir().to_path_buf()),
            data_override.unwrap_or_else(|| proj.data_dir().to_path_buf()),
        ))
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn ensure_data_dir(&self) -> eyre::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("create {}", self.data_dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_win() -> eyre::Result<()> {
        let env = HashMap::from([
            (CONFIG_DIR_ENV, "/tmp/pm/config"),
            (DATA_DIR_ENV, "/tmp/pm/data"),
        ]);
        let p = PendlePaths::discover_with(|k| env.get(k).map(|v| (*v).to_owned()))?;
        assert_eq!(p.config_file(), PathBuf::from("/tmp/pm/config/config.toml"));
        assert_eq!(p.log_file, PathBuf::from("/tmp/pm/data/pendle-mcp.log.jsonl"));
        Ok(())
    }
}
