// SSH 连接配置

use std::path::PathBuf;
use std::time::Duration;

use crate::known_hosts::HostIdentity;

/// SSH 连接配置
#[derive(Clone, Debug)]
pub struct SshConfig {
    /// 目标主机
    pub host: String,
    /// 端口
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 认证方式
    pub auth: AuthMethod,
    /// 连接超时（秒）
    pub connect_timeout: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: "git".to_string(),
            auth: AuthMethod::Password(String::new()),
            connect_timeout: 30,
        }
    }
}

/// 认证方式
#[derive(Clone, Debug)]
pub enum AuthMethod {
    /// 密码认证
    Password(String),
    /// 公钥认证
    PublicKey {
        /// 私钥文件路径
        key_path: PathBuf,
        /// 私钥密码（如果有）
        passphrase: Option<String>,
    },
}

impl SshConfig {
    /// 由 `host:port` 形式的地址构建
    pub fn for_address(address: &str, username: impl Into<String>, auth: AuthMethod) -> Self {
        let identity = HostIdentity::parse(address);
        Self {
            host: identity.host().to_string(),
            port: identity.port_or_default(),
            username: username.into(),
            auth,
            ..Default::default()
        }
    }

    /// 传输层视角下的主机标识（总是带端口）
    pub fn identity(&self) -> HostIdentity {
        HostIdentity::new(self.host.clone(), Some(self.port))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// 构建 russh 配置
    pub fn to_russh_config(&self) -> russh::client::Config {
        let mut config = russh::client::Config::default();
        // russh 没有单独的连接超时，用 inactivity_timeout 兜住握手阶段
        config.inactivity_timeout = Some(self.timeout());
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_address() {
        let config = SshConfig::for_address(
            "Example.com:2222",
            "git",
            AuthMethod::Password(String::new()),
        );
        assert_eq!(config.host, "example.com");
        assert_eq!(config.port, 2222);
        assert_eq!(config.identity().canonical(), "example.com:2222");
    }

    #[test]
    fn test_for_address_defaults_port() {
        let config =
            SshConfig::for_address("example.com", "git", AuthMethod::Password(String::new()));
        assert_eq!(config.port, 22);
        assert_eq!(config.identity().canonical(), "example.com:22");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
