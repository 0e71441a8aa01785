// SSH 错误类型定义

use thiserror::Error;

use crate::known_hosts::VerifyError;

/// SSH 错误类型
#[derive(Debug, Error)]
pub enum SshError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO 错误（网络连接等）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 认证失败
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// SSH 协议错误
    #[error("SSH protocol error: {0}")]
    Protocol(String),

    /// 密钥错误
    #[error("Key error: {0}")]
    Key(String),

    /// 主机密钥校验失败
    #[error("Host key rejected: {0}")]
    HostKey(#[from] VerifyError),

    /// 主机密钥扫描失败
    #[error("Host key scan failed: {0}")]
    Scan(String),

    /// 连接超时
    #[error("Connection timeout after {0}s")]
    Timeout(u64),
}

impl From<russh::Error> for SshError {
    fn from(e: russh::Error) -> Self {
        SshError::Protocol(e.to_string())
    }
}

impl From<russh::keys::Error> for SshError {
    fn from(e: russh::keys::Error) -> Self {
        SshError::Key(e.to_string())
    }
}
