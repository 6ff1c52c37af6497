use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::trading::daily_state::{DailyRiskState, TradeHistory};
use crate::trading::settings::RiskSettings;
use crate::trading::suspensions::{Blacklist, CooldownRegistry};

pub const SETTINGS_FILE: &str = "risk_settings.json";
pub const STATE_FILE: &str = "daily_state.json";

/// Everything the risk manager needs to resume after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSnapshot {
    pub daily: DailyRiskState,
    #[serde(default)]
    pub history: TradeHistory,
    #[serde(default)]
    pub cooldowns: CooldownRegistry,
    #[serde(default)]
    pub blacklist: Blacklist,
}

/// Durable home for risk settings and daily state.
pub trait StateStore: Send + Sync {
    fn load_settings(&self) -> Result<Option<RiskSettings>>;
    fn save_settings(&self, settings: &RiskSettings) -> Result<()>;
    fn load_snapshot(&self) -> Result<Option<RiskSnapshot>>;
    fn save_snapshot(&self, snapshot: &RiskSnapshot) -> Result<()>;
}

/// One pretty-printed JSON file per record under a state directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(value))
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn load_settings(&self) -> Result<Option<RiskSettings>> {
        self.read(SETTINGS_FILE)
    }

    fn save_settings(&self, settings: &RiskSettings) -> Result<()> {
        self.write(SETTINGS_FILE, settings)
    }

    fn load_snapshot(&self) -> Result<Option<RiskSnapshot>> {
        self.read(STATE_FILE)
    }

    fn save_snapshot(&self, snapshot: &RiskSnapshot) -> Result<()> {
        self.write(STATE_FILE, snapshot)
    }
}

/// In-process store; `failing()` builds one whose loads always error.
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Option<RiskSettings>>,
    snapshot: Mutex<Option<RiskSnapshot>>,
    fail_loads: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_loads: true,
            ..Self::default()
        }
    }

    pub fn with_settings(settings: RiskSettings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Option<RiskSnapshot> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn settings(&self) -> Option<RiskSettings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl StateStore for MemoryStore {
    fn load_settings(&self) -> Result<Option<RiskSettings>> {
        if self.fail_loads {
            return Err(anyhow!("settings unavailable"));
        }
        Ok(self.settings())
    }

    fn save_settings(&self, settings: &RiskSettings) -> Result<()> {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = Some(settings.clone());
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<RiskSnapshot>> {
        if self.fail_loads {
            return Err(anyhow!("state unavailable"));
        }
        Ok(self.snapshot())
    }

    fn save_snapshot(&self, snapshot: &RiskSnapshot) -> Result<()> {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        Ok(())
    }
}
