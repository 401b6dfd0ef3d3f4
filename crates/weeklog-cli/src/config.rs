// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use weeklog_app::{SyncTimings, WeekStart};
use weeklog_tui::{UiOptions, ViewabilityConfig};

pub const APP_NAME: &str = "weeklog";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub sync: Timing,
    #[serde(default)]
    pub list: List,
    #[serde(default)]
    pub calendar: Calendar,
    #[serde(default)]
    pub demo: Demo,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            sync: Timing::default(),
            list: List::default(),
            calendar: Calendar::default(),
            demo: Demo::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub journal_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Timing {
    pub debounce: Option<String>,
    pub press_scroll_delay: Option<String>,
    pub fetch_scroll_delay: Option<String>,
    pub retry_delay: Option<String>,
    pub momentum_settle: Option<String>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce: Some("1300ms".to_owned()),
            press_scroll_delay: Some("400ms".to_owned()),
            fetch_scroll_delay: Some("600ms".to_owned()),
            retry_delay: Some("100ms".to_owned()),
            momentum_settle: Some("250ms".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct List {
    pub visible_threshold: Option<i64>,
    pub minimum_view_time: Option<String>,
    pub wait_for_interaction: Option<bool>,
}

impl Default for List {
    fn default() -> Self {
        Self {
            visible_threshold: Some(70),
            minimum_view_time: Some("100ms".to_owned()),
            wait_for_interaction: Some(true),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Calendar {
    pub week_start: Option<String>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            week_start: Some(WeekStart::Monday.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Demo {
    pub latency: Option<String>,
}

impl Default for Demo {
    fn default() -> Self {
        Self {
            latency: Some("0ms".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub path: Option<String>,
    pub level: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            path: None,
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("WEEKLOG_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set WEEKLOG_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is missing `version = 1`; run `weeklog --print-example-config` for a template",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let durations = [
            ("sync.debounce", &self.sync.debounce),
            ("sync.press_scroll_delay", &self.sync.press_scroll_delay),
            ("sync.fetch_scroll_delay", &self.sync.fetch_scroll_delay),
            ("sync.retry_delay", &self.sync.retry_delay),
            ("sync.momentum_settle", &self.sync.momentum_settle),
            ("list.minimum_view_time", &self.list.minimum_view_time),
            ("demo.latency", &self.demo.latency),
        ];
        for (key, value) in durations {
            if let Some(raw) = value {
                parse_duration(raw).with_context(|| format!("{key} in {}", path.display()))?;
            }
        }

        if let Some(debounce) = &self.sync.debounce
            && parse_duration(debounce)? <= Duration::ZERO
        {
            bail!(
                "sync.debounce in {} must be positive, got {}",
                path.display(),
                debounce
            );
        }

        if let Some(threshold) = self.list.visible_threshold
            && !(1..=100).contains(&threshold)
        {
            bail!(
                "list.visible_threshold in {} must be between 1 and 100, got {}",
                path.display(),
                threshold
            );
        }

        if let Some(week_start) = &self.calendar.week_start
            && WeekStart::parse(week_start).is_none()
        {
            bail!(
                "calendar.week_start in {} must be \"monday\" or \"sunday\", got {:?}",
                path.display(),
                week_start
            );
        }

        Ok(())
    }

    pub fn journal_path(&self) -> Option<PathBuf> {
        self.storage.journal_path.as_ref().map(PathBuf::from)
    }

    pub fn week_start(&self) -> WeekStart {
        self.calendar
            .week_start
            .as_deref()
            .and_then(WeekStart::parse)
            .unwrap_or_default()
    }

    pub fn timings(&self) -> Result<SyncTimings> {
        let defaults = SyncTimings::default();
        Ok(SyncTimings {
            debounce: duration_or(&self.sync.debounce, defaults.debounce)?,
            press_scroll_delay: duration_or(
                &self.sync.press_scroll_delay,
                defaults.press_scroll_delay,
            )?,
            fetch_scroll_delay: duration_or(
                &self.sync.fetch_scroll_delay,
                defaults.fetch_scroll_delay,
            )?,
            retry_delay: duration_or(&self.sync.retry_delay, defaults.retry_delay)?,
        })
    }

    pub fn viewability(&self) -> Result<ViewabilityConfig> {
        let defaults = ViewabilityConfig::default();
        let visible_threshold = match self.list.visible_threshold {
            Some(value) => u8::try_from(value)
                .with_context(|| format!("list.visible_threshold {value} out of range"))?,
            None => defaults.visible_threshold,
        };
        Ok(ViewabilityConfig {
            visible_threshold,
            minimum_view_time: duration_or(
                &self.list.minimum_view_time,
                defaults.minimum_view_time,
            )?,
            wait_for_interaction: self
                .list
                .wait_for_interaction
                .unwrap_or(defaults.wait_for_interaction),
        })
    }

    pub fn ui_options(&self) -> Result<UiOptions> {
        let defaults = UiOptions::default();
        Ok(UiOptions {
            week_start: self.week_start(),
            timings: self.timings()?,
            viewability: self.viewability()?,
            momentum_settle: duration_or(&self.sync.momentum_settle, defaults.momentum_settle)?,
            status_ttl: defaults.status_ttl,
            utc_offset: defaults.utc_offset,
        })
    }

    pub fn demo_latency(&self) -> Result<Duration> {
        duration_or(&self.demo.latency, Duration::ZERO)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log.path.as_ref().map(PathBuf::from)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# weeklog config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Without a journal the built-in demo week is shown.\n# journal_path = \"/absolute/path/to/journal.json\"\n\n[sync]\ndebounce = \"1300ms\"\npress_scroll_delay = \"400ms\"\nfetch_scroll_delay = \"600ms\"\nretry_delay = \"100ms\"\nmomentum_settle = \"250ms\"\n\n[list]\nvisible_threshold = 70\nminimum_view_time = \"100ms\"\nwait_for_interaction = true\n\n[calendar]\nweek_start = \"monday\"\n\n[demo]\nlatency = \"0ms\"\n\n[log]\n# path = \"/tmp/weeklog.log\"\nlevel = \"{}\"\n",
            path.display(),
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn duration_or(raw: &Option<String>, default: Duration) -> Result<Duration> {
    match raw {
        Some(raw) => parse_duration(raw),
        None => Ok(default),
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 400ms or 2s)")
}
