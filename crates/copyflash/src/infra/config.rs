//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::model::BlinkConfig;
use crate::infra::highlight::HighlightStyle;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".copyflash/config.toml";

pub const BLINK_COUNT_RANGE: (u32, u32) = (1, 10);
pub const BLINK_INTERVAL_RANGE_MS: (u64, u64) = (50, 1000);

/// Layered configuration loaded from defaults, user, workspace, an explicit file, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub highlight: Highlight,
    #[serde(default)]
    pub blink: Blink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Highlight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
}

impl Highlight {
    fn default_background() -> &'static str {
        "#E66159"
    }

    pub fn background(&self) -> &str {
        self.background
            .as_deref()
            .unwrap_or(Self::default_background())
    }

    /// Empty means the text color is left alone.
    pub fn foreground(&self) -> &str {
        self.foreground.as_deref().unwrap_or_default()
    }

    pub fn bold(&self) -> bool {
        self.bold.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Blink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    /// Total highlight duration from older settings files. Folded into `count` on load.
    #[serde(default, skip_serializing)]
    pub timeout_ms: Option<u64>,
}

impl Blink {
    fn default_count() -> u32 {
        1
    }

    fn default_interval_ms() -> u64 {
        150
    }

    pub fn count(&self) -> u32 {
        self.count.unwrap_or_else(Self::default_count)
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.unwrap_or_else(Self::default_interval_ms)
    }

    fn migrate_legacy_timeout(&mut self) {
        let Some(timeout) = self.timeout_ms.take() else {
            return;
        };
        if self.count.is_some() {
            return;
        }
        let interval = self
            .interval_ms
            .unwrap_or_else(Self::default_interval_ms)
            .clamp(BLINK_INTERVAL_RANGE_MS.0, BLINK_INTERVAL_RANGE_MS.1);
        let blinks = (timeout + interval) / (2 * interval);
        let count = blinks.clamp(u64::from(BLINK_COUNT_RANGE.0), u64::from(BLINK_COUNT_RANGE.1));
        tracing::info!(timeout_ms = timeout, count, "migrated legacy blink timeout");
        self.count = u32::try_from(count).ok();
    }

    fn clamp(&mut self) {
        if let Some(count) = self.count {
            let clamped = count.clamp(BLINK_COUNT_RANGE.0, BLINK_COUNT_RANGE.1);
            if clamped != count {
                tracing::warn!(count, clamped, "blink count out of range");
                self.count = Some(clamped);
            }
        }
        if let Some(interval) = self.interval_ms {
            let clamped = interval.clamp(BLINK_INTERVAL_RANGE_MS.0, BLINK_INTERVAL_RANGE_MS.1);
            if clamped != interval {
                tracing::warn!(interval_ms = interval, clamped, "blink interval out of range");
                self.interval_ms = Some(clamped);
            }
        }
    }
}

/// Fully resolved settings, as printed by `copyflash config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Effective {
    pub highlight: EffectiveHighlight,
    pub blink: EffectiveBlink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveHighlight {
    pub background: String,
    pub foreground: String,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveBlink {
    pub count: u32,
    pub interval_ms: u64,
}

/// Environment overrides for the visible settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    background: Option<String>,
    foreground: Option<String>,
    count: Option<u32>,
    interval_ms: Option<u64>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            background: env::var("COPYFLASH_BACKGROUND").ok(),
            foreground: env::var("COPYFLASH_FOREGROUND").ok(),
            count: parse_env_number("COPYFLASH_BLINK_COUNT"),
            interval_ms: parse_env_number("COPYFLASH_BLINK_INTERVAL_MS"),
        }
    }

    #[cfg(test)]
    fn for_tests(background: &str, count: u32) -> Self {
        Self {
            background: Some(background.to_owned()),
            count: Some(count),
            ..Self::default()
        }
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring non-numeric environment override");
            None
        }
    }
}

impl Config {
    /// Load configuration from defaults, global config, workspace config, `explicit`, and env overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, explicit, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        explicit: Option<&Path>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading global config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(Self::from_file(&workspace_path)?);
        }

        if let Some(explicit_path) = explicit {
            layers.push(Self::from_file(explicit_path)?);
        }

        let merged = layers
            .into_iter()
            .map(|mut layer| {
                layer.blink.migrate_legacy_timeout();
                layer
            })
            .reduce(Config::merge)
            .unwrap_or_default();
        let mut config = apply_env_overrides(merged, env_overrides);
        config.blink.clamp();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data).with_context(|| format!("in config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            highlight: Highlight {
                background: other.highlight.background.or(self.highlight.background),
                foreground: other.highlight.foreground.or(self.highlight.foreground),
                bold: other.highlight.bold.or(self.highlight.bold),
            },
            blink: Blink {
                count: other.blink.count.or(self.blink.count),
                interval_ms: other.blink.interval_ms.or(self.blink.interval_ms),
                timeout_ms: None,
            },
        }
    }

    pub fn blink_config(&self) -> Result<BlinkConfig> {
        BlinkConfig::new(self.blink.count(), self.blink.interval_ms())
            .context("invalid blink settings")
    }

    pub fn highlight_style(&self) -> HighlightStyle {
        HighlightStyle::from_hex(
            self.highlight.background(),
            self.highlight.foreground(),
            self.highlight.bold(),
        )
    }

    pub fn effective(&self) -> Effective {
        Effective {
            highlight: EffectiveHighlight {
                background: self.highlight.background().to_owned(),
                foreground: self.highlight.foreground().to_owned(),
                bold: self.highlight.bold(),
            },
            blink: EffectiveBlink {
                count: self.blink.count(),
                interval_ms: self.blink.interval_ms(),
            },
        }
    }
}

pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("copyflash/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(background) = env.background {
        config.highlight.background = Some(background);
    }
    if let Some(foreground) = env.foreground {
        config.highlight.foreground = Some(foreground);
    }
    if let Some(count) = env.count {
        config.blink.count = Some(count);
    }
    if let Some(interval_ms) = env.interval_ms {
        config.blink.interval_ms = Some(interval_ms);
    }
    config
}
