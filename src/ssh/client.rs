// SSH 客户端核心实现
// 负责建立带主机密钥校验的 SSH 连接并完成认证

use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;

use russh::client::Handle;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use super::config::{AuthMethod, SshConfig};
use super::error::SshError;
use super::handler::VerifyingHandler;
use crate::known_hosts::HostKeyVerifier;

/// SSH 客户端
pub struct SshClient {
    /// 连接配置
    config: SshConfig,
    /// 主机密钥校验器（可在多个连接间共享）
    verifier: Arc<HostKeyVerifier>,
}

impl SshClient {
    /// 创建新的 SSH 客户端
    pub fn new(config: SshConfig, verifier: Arc<HostKeyVerifier>) -> Self {
        Self { config, verifier }
    }

    /// 执行连接（异步）
    /// 主机密钥被拒绝时返回 SshError::HostKey
    pub async fn connect(&self) -> Result<Handle<VerifyingHandler>, SshError> {
        let hostname = self.config.identity().canonical();
        info!(
            target_host = %hostname,
            username = %self.config.username,
            "Starting SSH connection"
        );

        // 解析地址
        let socket_addr = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| SshError::Config(format!("Failed to resolve address: {}", e)))?
            .next()
            .ok_or_else(|| SshError::Config("No valid address found".to_string()))?;

        // TCP 连接
        let connect_timeout = self.config.timeout();
        let tcp_stream = timeout(connect_timeout, TcpStream::connect(socket_addr))
            .await
            .map_err(|_| SshError::Timeout(self.config.connect_timeout))?
            .map_err(SshError::Io)?;
        debug!(socket = %socket_addr, "TCP connection established");

        // SSH 握手，主机密钥在 check_server_key 中校验
        let russh_config = Arc::new(self.config.to_russh_config());
        let handler = VerifyingHandler::new(self.verifier.clone(), hostname);

        let mut handle = timeout(
            connect_timeout,
            russh::client::connect_stream(russh_config, tcp_stream, handler),
        )
        .await
        .map_err(|_| SshError::Timeout(self.config.connect_timeout))??;
        debug!("SSH handshake completed");

        // 认证
        self.authenticate(&mut handle).await?;
        info!(username = %self.config.username, "Authentication successful");

        Ok(handle)
    }

    /// 执行认证
    async fn authenticate(&self, handle: &mut Handle<VerifyingHandler>) -> Result<(), SshError> {
        use russh::client::AuthResult;

        let auth_result = match &self.config.auth {
            AuthMethod::Password(password) => {
                debug!("Using password authentication");
                handle
                    .authenticate_password(&self.config.username, password)
                    .await
                    .map_err(SshError::from)?
            }
            AuthMethod::PublicKey {
                key_path,
                passphrase,
            } => {
                debug!(key_path = ?key_path, "Using public key authentication");

                let key = load_private_key(key_path, passphrase.as_deref()).await?;
                let key_with_alg = russh::keys::PrivateKeyWithHashAlg::new(
                    Arc::new(key),
                    None, // Use default hash algorithm
                );

                handle
                    .authenticate_publickey(&self.config.username, key_with_alg)
                    .await
                    .map_err(SshError::from)?
            }
        };

        match auth_result {
            AuthResult::Success => Ok(()),
            AuthResult::Failure {
                remaining_methods,
                partial_success,
            } => {
                if partial_success {
                    return Err(SshError::Auth(
                        "Partial authentication - additional auth required".to_string(),
                    ));
                }
                Err(SshError::Auth(format!(
                    "Server suggests: {:?}",
                    remaining_methods
                )))
            }
        }
    }
}

/// 加载私钥文件
async fn load_private_key(
    key_path: &Path,
    passphrase: Option<&str>,
) -> Result<russh::keys::PrivateKey, SshError> {
    debug!(key_path = ?key_path, "Loading private key");

    let key_data = tokio::fs::read(key_path)
        .await
        .map_err(|e| SshError::Key(format!("Failed to read key file: {}", e)))?;

    russh::keys::decode_secret_key(&String::from_utf8_lossy(&key_data), passphrase)
        .map_err(|e| SshError::Key(format!("Failed to decode key: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_missing_key_file_is_key_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = block_on(load_private_key(&dir.path().join("id_ed25519"), None)).unwrap_err();
        assert!(matches!(err, SshError::Key(_)));
    }

    #[test]
    fn test_garbage_key_file_is_key_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_ed25519");
        std::fs::write(&path, "not a private key").unwrap();

        let err = block_on(load_private_key(&path, None)).unwrap_err();
        assert!(matches!(err, SshError::Key(_)));
    }
}
