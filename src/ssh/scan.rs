// 主机密钥扫描
// 连接一次目标主机，拿到服务器公钥后立即断开，输出 known_hosts 格式的行

use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::keys::{HashAlg, PublicKey};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info};

use super::error::SshError;
use super::handler::ScanHandler;
use crate::known_hosts::HostIdentity;

/// 主机密钥扫描器
#[async_trait]
pub trait HostKeyScanner: Send + Sync {
    /// 扫描 `host:port`，返回 known_hosts 格式的内容
    async fn scan(&self, address: &str, timeout: Duration) -> Result<Vec<u8>, SshError>;
}

/// 基于 russh 的扫描器
#[derive(Clone, Copy, Debug, Default)]
pub struct RusshScanner;

#[async_trait]
impl HostKeyScanner for RusshScanner {
    async fn scan(&self, address: &str, scan_timeout: Duration) -> Result<Vec<u8>, SshError> {
        let identity = HostIdentity::parse(address);
        let port = identity.port_or_default();

        let socket_addr = (identity.host(), port)
            .to_socket_addrs()
            .map_err(|e| SshError::Config(format!("Failed to resolve address: {}", e)))?
            .next()
            .ok_or_else(|| SshError::Config("No valid address found".to_string()))?;

        debug!(address = %address, socket = %socket_addr, "Scanning host key");

        let tcp_stream = timeout(scan_timeout, TcpStream::connect(socket_addr))
            .await
            .map_err(|_| SshError::Timeout(scan_timeout.as_secs()))?
            .map_err(SshError::Io)?;

        let (key_tx, key_rx) = oneshot::channel();
        let config = Arc::new(russh::client::Config::default());

        match timeout(
            scan_timeout,
            russh::client::connect_stream(config, tcp_stream, ScanHandler::new(key_tx)),
        )
        .await
        {
            Err(_) => return Err(SshError::Timeout(scan_timeout.as_secs())),
            // ScanHandler 总是拒绝，握手失败是预期结果
            Ok(Err(e)) => debug!(error = %e, "Handshake aborted after key capture"),
            Ok(Ok(_)) => {}
        }

        let key = key_rx
            .await
            .map_err(|_| SshError::Scan(format!("no host key presented by {}", address)))?;

        info!(
            address = %address,
            algorithm = %key.algorithm(),
            fingerprint = %key.fingerprint(HashAlg::Sha256),
            "Host key scanned"
        );

        Ok(format_known_hosts_line(&identity, &key)?.into_bytes())
    }
}

/// 生成一行 known_hosts 记录
pub fn format_known_hosts_line(
    identity: &HostIdentity,
    key: &PublicKey,
) -> Result<String, SshError> {
    let encoded = key
        .to_openssh()
        .map_err(|e| SshError::Key(format!("Failed to encode host key: {}", e)))?;
    Ok(format!("{} {}\n", identity.known_hosts_form(), encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::known_hosts::test_keys::{public_key, KEY_A};
    use crate::known_hosts::{HostKeyVerifier, PresentedCertificate};

    #[test]
    fn test_format_line_uses_known_hosts_form() {
        let line =
            format_known_hosts_line(&HostIdentity::parse("example.com:2222"), &public_key(KEY_A))
                .unwrap();
        assert_eq!(line, format!("[example.com]:2222 {}\n", KEY_A));

        let line =
            format_known_hosts_line(&HostIdentity::parse("example.com"), &public_key(KEY_A))
                .unwrap();
        assert!(line.starts_with("example.com ssh-ed25519 "));
    }

    #[test]
    fn test_scanned_line_is_trusted_by_verifier() {
        let identity = HostIdentity::parse("127.0.0.1:2222");
        let line = format_known_hosts_line(&identity, &public_key(KEY_A)).unwrap();

        let verifier = HostKeyVerifier::new("127.0.0.1:2222", line);
        let cert = PresentedCertificate::from_public_key(public_key(KEY_A));
        assert!(verifier
            .certificate_check(Some(&cert), false, "127.0.0.1:2222")
            .is_ok());
    }
}
