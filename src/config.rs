// 冒烟测试配置
//
// 配置文件查找顺序：
// 1. 环境变量 HOSTKEY_SMOKE_CONFIG 指定的路径
// 2. 系统配置目录下的 hostkey-smoke/config.json
// 文件不存在时使用默认值

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::known_hosts::{FingerprintKind, HostKeyVerifier, HostMatcher, HostnamePolicy};
use crate::ssh::SshConfig;

/// 指定配置文件路径的环境变量
pub const CONFIG_ENV: &str = "HOSTKEY_SMOKE_CONFIG";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeConfig {
    /// SSH 用户名
    pub username: String,
    /// 连接超时（秒）
    pub connect_timeout: u64,
    /// 扫描超时（秒）
    pub scan_timeout: u64,
    /// 启用的指纹类型
    pub fingerprint_kinds: Vec<FingerprintKind>,
    pub hostname_policy: HostnamePolicy,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            username: "git".to_string(),
            connect_timeout: 30,
            scan_timeout: 5,
            fingerprint_kinds: vec![FingerprintKind::Sha256],
            hostname_policy: HostnamePolicy::Exact,
        }
    }
}

impl SmokeConfig {
    pub fn matcher(&self) -> HostMatcher {
        HostMatcher::new(self.fingerprint_kinds.iter().copied())
    }

    /// 按配置构建校验器
    pub fn build_verifier(
        &self,
        expected_host: impl Into<String>,
        known_hosts: impl Into<String>,
    ) -> HostKeyVerifier {
        HostKeyVerifier::new(expected_host, known_hosts)
            .with_matcher(self.matcher())
            .with_hostname_policy(self.hostname_policy)
    }

    /// 以连接配置的主机标识作为期望主机，与握手回调收到的主机名一致
    pub fn verifier_for(&self, ssh: &SshConfig, known_hosts: impl Into<String>) -> HostKeyVerifier {
        self.build_verifier(ssh.identity().canonical(), known_hosts)
    }
}

/// 获取配置目录路径
/// Linux: ~/.config/hostkey-smoke
/// macOS: ~/Library/Application Support/hostkey-smoke
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Cannot determine system config directory")?
        .join("hostkey-smoke"))
}

/// 获取配置文件路径
pub fn get_config_file() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(get_config_dir()?.join("config.json"))
}

/// 加载配置
pub fn load_config() -> Result<SmokeConfig> {
    load_config_from(&get_config_file()?)
}

/// 从指定路径加载配置
pub fn load_config_from(path: &Path) -> Result<SmokeConfig> {
    if !path.exists() {
        return Ok(SmokeConfig::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SmokeConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}
