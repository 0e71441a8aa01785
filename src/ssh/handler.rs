// SSH 客户端 Handler 实现
// 实现 russh::client::Handler trait

use std::future::Future;
use std::sync::Arc;

use russh::keys::{HashAlg, PublicKey};
use tokio::sync::oneshot;
use tracing::debug;

use super::error::SshError;
use crate::known_hosts::{HostKeyVerifier, PresentedCertificate};

/// 校验服务器公钥的 Handler
pub struct VerifyingHandler {
    verifier: Arc<HostKeyVerifier>,
    /// 传输层认为自己连接的主机（`host:port`）
    hostname: String,
}

impl VerifyingHandler {
    pub fn new(verifier: Arc<HostKeyVerifier>, hostname: impl Into<String>) -> Self {
        Self {
            verifier,
            hostname: hostname.into(),
        }
    }
}

impl russh::client::Handler for VerifyingHandler {
    type Error = SshError;

    /// 检查服务器公钥，拒绝时返回错误并中止握手
    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        debug!(
            hostname = %self.hostname,
            algorithm = %server_public_key.algorithm(),
            fingerprint = %server_public_key.fingerprint(HashAlg::Sha256),
            "Server key presented"
        );

        let cert = PresentedCertificate::from_public_key(server_public_key.clone());
        let result = self
            .verifier
            .certificate_check(Some(&cert), false, &self.hostname)
            .map(|()| true)
            .map_err(SshError::from);

        async move { result }
    }
}

/// 扫描用 Handler：记录服务器公钥后拒绝继续握手
pub struct ScanHandler {
    key_tx: Option<oneshot::Sender<PublicKey>>,
}

impl ScanHandler {
    pub fn new(key_tx: oneshot::Sender<PublicKey>) -> Self {
        Self {
            key_tx: Some(key_tx),
        }
    }
}

impl russh::client::Handler for ScanHandler {
    type Error = SshError;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        if let Some(tx) = self.key_tx.take() {
            let _ = tx.send(server_public_key.clone());
        }
        async { Ok(false) }
    }
}

#[cfg(test)]
mod tests {
    use russh::client::Handler;

    use super::*;
    use crate::known_hosts::test_keys::{public_key, KEY_A, KEY_B};
    use crate::known_hosts::VerifyError;

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    fn verifier() -> Arc<HostKeyVerifier> {
        Arc::new(HostKeyVerifier::new(
            "example.com:2222",
            format!("[example.com]:2222 {}\n", KEY_A),
        ))
    }

    #[test]
    fn test_known_key_is_accepted() {
        let mut handler = VerifyingHandler::new(verifier(), "example.com:2222");
        let accepted = block_on(handler.check_server_key(&public_key(KEY_A))).unwrap();
        assert!(accepted);
    }

    #[test]
    fn test_unknown_key_aborts_handshake() {
        let mut handler = VerifyingHandler::new(verifier(), "example.com:2222");
        let err = block_on(handler.check_server_key(&public_key(KEY_B))).unwrap_err();
        assert!(matches!(
            err,
            SshError::HostKey(VerifyError::Unverified { .. })
        ));
    }

    #[test]
    fn test_scan_handler_captures_key_and_refuses() {
        let (tx, mut rx) = oneshot::channel();
        let mut handler = ScanHandler::new(tx);

        let accepted = block_on(handler.check_server_key(&public_key(KEY_A))).unwrap();
        assert!(!accepted);
        assert_eq!(rx.try_recv().unwrap(), public_key(KEY_A));
    }
}
