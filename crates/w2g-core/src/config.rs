//! Pipeline configuration loaded from `w2g.toml`.
//!
//! Every section has defaults matching the reference deployment, so a missing
//! file or a partial file is fine. Values are validated on load.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::DEFAULT_MAX_GRAPH_STEPS;
use crate::error::W2gError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct W2gConfig {
    pub server: ServerConfig,
    pub graph: GraphConfig,
    pub router: RouterConfig,
    pub validator: ValidatorConfig,
    pub vault: VaultConfig,
    pub reward: RewardConfig,
    pub results: ResultsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8787".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Hard cap on node visits inside one stage graph.
    pub max_steps: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_GRAPH_STEPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Minimum tokens before a transfer is attempted.
    pub threshold: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Minimum score for a photo to count as valid.
    pub threshold: f64,
    /// Tool rounds allowed before the infer/act loop is forced to stop.
    pub max_tool_rounds: u32,
    /// OpenAI-compatible chat completions base URL.
    pub api_base: String,
    pub chat_model: String,
    pub vision_model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            max_tool_rounds: 3,
            api_base: "https://api.groq.com/openai/v1".to_string(),
            chat_model: "llama-3.3-70b-versatile".to_string(),
            vision_model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: 30,
            temperature: 0.4,
            max_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub stake_threshold: u64,
    pub redeem_threshold: u64,
    /// Minimum vendor APY (percent) required to stake.
    pub apy_threshold: f64,
    /// Vendor id to vault APY (percent).
    pub vendors: BTreeMap<String, f64>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            stake_threshold: 10,
            redeem_threshold: 3,
            apy_threshold: 10.0,
            vendors: BTreeMap::from([
                ("vendor_123".to_string(), 9.0),
                ("vendor_456".to_string(), 12.5),
                ("vendor_789".to_string(), 6.7),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTier {
    pub min_gives: u64,
    pub reward: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub tiers: Vec<RewardTier>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        let tier = |min_gives, reward: &str| RewardTier {
            min_gives,
            reward: reward.to_string(),
        };
        Self {
            tiers: vec![tier(10, "v-bucks"), tier(20, "robux"), tier(50, "mystery-nft")],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// JSON array file that receives every finished run.
    pub path: PathBuf,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/result.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file: "w2g.log".to_string(),
            filter: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}

impl W2gConfig {
    pub fn validate(&self) -> Result<(), W2gError> {
        if self.graph.max_steps == 0 {
            return Err(invalid("graph.max_steps must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.validator.threshold) {
            return Err(invalid("validator.threshold must be within [0, 1]"));
        }
        if self.validator.max_tool_rounds == 0 {
            return Err(invalid("validator.max_tool_rounds must be > 0"));
        }
        // infer, then one act + infer pair per tool round
        let validator_steps = self
            .validator
            .max_tool_rounds
            .saturating_mul(2)
            .saturating_add(1) as usize;
        if validator_steps > self.graph.max_steps {
            return Err(W2gError::Config(format!(
                "validator.max_tool_rounds = {} needs {} graph steps but graph.max_steps = {}",
                self.validator.max_tool_rounds, validator_steps, self.graph.max_steps
            )));
        }
        if self.validator.timeout_secs == 0 {
            return Err(invalid("validator.timeout_secs must be > 0"));
        }
        if self.validator.api_base.trim().is_empty() {
            return Err(invalid("validator.api_base must not be empty"));
        }
        if self.vault.redeem_threshold > self.vault.stake_threshold {
            return Err(invalid("vault.redeem_threshold must not exceed vault.stake_threshold"));
        }
        if self.vault.apy_threshold < 0.0 {
            return Err(invalid("vault.apy_threshold must be >= 0"));
        }
        if let Some((vendor, _)) = self.vault.vendors.iter().find(|(_, apy)| **apy < 0.0) {
            return Err(W2gError::Config(format!("vault.vendors.{} has a negative apy", vendor)));
        }
        if self.reward.tiers.iter().any(|t| t.reward.trim().is_empty()) {
            return Err(invalid("reward.tiers entries need a reward label"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> W2gError {
    W2gError::Config(msg.to_string())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `W2gConfig::default()`.
pub fn load_config(path: &Path) -> Result<W2gConfig, W2gError> {
    if !path.exists() {
        let cfg = W2gConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| W2gError::Config(format!("read {}: {}", path.display(), e)))?;
    let cfg: W2gConfig = toml::from_str(&contents)
        .map_err(|e| W2gError::Config(format!("parse {}: {}", path.display(), e)))?;
    cfg.validate()?;
    Ok(cfg)
}
