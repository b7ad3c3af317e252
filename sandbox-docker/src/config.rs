use std::path::Path;
use std::time::Duration;

use sandbox::{Result, SandboxError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE: &str = "python:3.12-slim";
/// Half a core out of the default 100ms CFS period.
pub const DEFAULT_CPU_QUOTA: i64 = 50_000;
pub const DEFAULT_MEM_LIMIT: &str = "512m";
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 1;

/// Smallest CPU quota the kernel scheduler accepts (1ms).
const MIN_CPU_QUOTA: i64 = 1_000;
/// Smallest memory limit docker accepts.
const MIN_MEMORY_BYTES: u64 = 6 * 1024 * 1024;

/// Settings fixed when a `DockerSandbox` is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerSandboxConfig {
    pub image: String,
    pub cpu_quota: i64,
    pub mem_limit: String,
    /// Network to attach to (e.g. "none" for full isolation). Runtime default when unset.
    pub network_mode: Option<String>,
    /// Grace period `stop` allows before the container is killed.
    pub stop_timeout_secs: u64,
}

impl Default for DockerSandboxConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            cpu_quota: DEFAULT_CPU_QUOTA,
            mem_limit: DEFAULT_MEM_LIMIT.to_string(),
            network_mode: None,
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
        }
    }
}

impl DockerSandboxConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Reject settings docker would refuse, before any container exists.
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(SandboxError::InvalidConfig("image must not be empty".into()));
        }
        if self.cpu_quota < MIN_CPU_QUOTA {
            return Err(SandboxError::InvalidConfig(format!(
                "cpu_quota must be at least {MIN_CPU_QUOTA}, got {}",
                self.cpu_quota
            )));
        }
        let bytes = parse_memory_limit(&self.mem_limit).map_err(SandboxError::InvalidConfig)?;
        if bytes < MIN_MEMORY_BYTES {
            return Err(SandboxError::InvalidConfig(format!(
                "mem_limit {:?} is below the 6m minimum",
                self.mem_limit
            )));
        }
        if let Some(network) = &self.network_mode
            && network.trim().is_empty()
        {
            return Err(SandboxError::InvalidConfig(
                "network_mode must not be empty when set".into(),
            ));
        }
        Ok(())
    }
}

/// Parse a docker-style memory size ("512m", "1.5g", "1GiB", "1048576") into bytes.
///
/// Accepts what `docker run --memory` accepts: a decimal number, an optional
/// space, then an optional unit out of `k m g t p` with optional `i` and `b`.
pub fn parse_memory_limit(value: &str) -> std::result::Result<u64, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let well_formed = match number.split_once('.') {
        Some((whole, fraction)) => is_digits(whole) && is_digits(fraction),
        None => is_digits(number),
    };
    if !well_formed {
        return Err(format!("mem_limit {value:?} has no valid numeric size"));
    }
    let size: f64 = number
        .parse()
        .map_err(|e| format!("mem_limit {value:?}: {e}"))?;

    let unit = unit.strip_prefix(' ').unwrap_or(unit).to_ascii_lowercase();
    let unit = unit.strip_suffix('b').unwrap_or(unit.as_str());
    let unit = unit.strip_suffix('i').unwrap_or(unit);
    let multiplier: u64 = match unit {
        "" => 1,
        "k" => 1 << 10,
        "m" => 1 << 20,
        "g" => 1 << 30,
        "t" => 1 << 40,
        "p" => 1 << 50,
        other => return Err(format!("mem_limit {value:?}: unknown unit {other:?}")),
    };

    let bytes = size * multiplier as f64;
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(format!("mem_limit {value:?} overflows"));
    }
    // Fractions of a byte are dropped, as docker does.
    Ok(bytes as u64)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Load and validate a sandbox config from a YAML file.
pub async fn load(path: &Path) -> Result<DockerSandboxConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SandboxError::InvalidConfig(format!("read {}: {e}", path.display())))?;
    let config: DockerSandboxConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| SandboxError::InvalidConfig(format!("parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}
