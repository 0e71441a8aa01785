// 主机密钥校验器
// 扫描阶段拿到的期望主机和 known_hosts 文本在构造时固定，握手时由传输层调用 certificate_check

use std::path::Path;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::entry::{EntryMarker, KnownHostsEntry};
use super::error::{KnownHostsError, VerifyError};
use super::host::HostIdentity;
use super::matcher::{FingerprintKind, HostMatcher, MatchOutcome, PresentedCertificate};
use super::parser;

/// 期望主机与传输层主机名的比较方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostnamePolicy {
    /// 主机名和端口都必须一致
    #[default]
    Exact,
    /// 只比较主机名（传输层只给出不带端口的主机名时使用）
    IgnorePort,
}

impl HostnamePolicy {
    fn accepts(&self, expected: &HostIdentity, presented: &HostIdentity) -> bool {
        match self {
            Self::Exact => expected == presented,
            Self::IgnorePort => expected.same_host(presented),
        }
    }
}

/// 单次校验的阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationStage {
    Started,
    CertificateChecked,
    HostChecked,
    EntriesScanned,
    Accepted,
    Rejected,
}

impl VerificationStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::CertificateChecked => "certificate checked",
            Self::HostChecked => "host checked",
            Self::EntriesScanned => "entries scanned",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// 主机密钥校验器
///
/// 构造后不可变；条目在第一次校验时解析并缓存，之后并发只读。
pub struct HostKeyVerifier {
    /// 期望连接的主机（`host` 或 `host:port`）
    expected_host: String,
    /// 扫描得到的 known_hosts 文本
    known_hosts: String,
    entries: OnceCell<Result<Vec<KnownHostsEntry>, KnownHostsError>>,
    matcher: HostMatcher,
    policy: HostnamePolicy,
}

impl HostKeyVerifier {
    pub fn new(expected_host: impl Into<String>, known_hosts: impl Into<String>) -> Self {
        Self {
            expected_host: expected_host.into(),
            known_hosts: known_hosts.into(),
            entries: OnceCell::new(),
            matcher: HostMatcher::default(),
            policy: HostnamePolicy::default(),
        }
    }

    /// 从 known_hosts 文件构建
    pub fn from_file(
        expected_host: impl Into<String>,
        path: &Path,
    ) -> Result<Self, KnownHostsError> {
        let text = parser::read_file(path)?;
        Ok(Self::new(expected_host, text))
    }

    pub fn with_matcher(mut self, matcher: HostMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_fingerprint_kinds(self, kinds: impl IntoIterator<Item = FingerprintKind>) -> Self {
        self.with_matcher(HostMatcher::new(kinds))
    }

    pub fn with_hostname_policy(mut self, policy: HostnamePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn expected_host(&self) -> &str {
        &self.expected_host
    }

    pub fn known_hosts(&self) -> &str {
        &self.known_hosts
    }

    pub fn matcher(&self) -> &HostMatcher {
        &self.matcher
    }

    pub fn hostname_policy(&self) -> HostnamePolicy {
        self.policy
    }

    /// 解析后的条目（首次调用时解析）
    pub fn entries(&self) -> Result<&[KnownHostsEntry], KnownHostsError> {
        match self
            .entries
            .get_or_init(|| parser::parse(&self.known_hosts))
        {
            Ok(entries) => Ok(entries.as_slice()),
            Err(err) => Err(err.clone()),
        }
    }

    /// 握手回调
    ///
    /// `valid` 是传输层自己的校验结果，只记录日志，不会因此放行。
    pub fn certificate_check(
        &self,
        cert: Option<&PresentedCertificate>,
        valid: bool,
        hostname: &str,
    ) -> Result<(), VerifyError> {
        debug!(
            expected = %self.expected_host,
            hostname = %hostname,
            transport_valid = valid,
            "Host key verification {}",
            VerificationStage::Started.label()
        );

        match self.evaluate(cert, hostname) {
            Ok(()) => {
                info!(
                    hostname = %hostname,
                    "Host key verification {}",
                    VerificationStage::Accepted.label()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    hostname = %hostname,
                    error = %err,
                    "Host key verification {}",
                    VerificationStage::Rejected.label()
                );
                Err(err)
            }
        }
    }

    fn evaluate(
        &self,
        cert: Option<&PresentedCertificate>,
        hostname: &str,
    ) -> Result<(), VerifyError> {
        let Some(cert) = cert else {
            return Err(VerifyError::MissingCertificate {
                hostname: hostname.to_string(),
            });
        };
        trace_stage(VerificationStage::CertificateChecked, hostname);

        let entries = self.entries()?;
        debug!(count = entries.len(), "Known keys");

        let expected = HostIdentity::parse(&self.expected_host);
        let presented = HostIdentity::parse(hostname);
        if !self.policy.accepts(&expected, &presented) {
            return Err(VerifyError::HostMismatch {
                expected: expected.canonical(),
                presented: presented.canonical(),
            });
        }
        trace_stage(VerificationStage::HostChecked, hostname);

        // 期望主机里带着端口，换成 known_hosts 记录时的写法再查
        let lookup = expected.known_hosts_form();

        // @revoked 优先于任何信任条目
        for entry in entries.iter().filter(|e| e.is_revoked()) {
            if self.matcher.matches(entry, &lookup, cert) {
                return Err(VerifyError::Revoked {
                    host: lookup,
                    fingerprint: cert.fingerprint(FingerprintKind::Sha256),
                });
            }
        }

        let mut unsupported = false;
        for entry in entries {
            match entry.marker() {
                Some(EntryMarker::Revoked) => continue,
                Some(EntryMarker::CertAuthority) => {
                    debug!(line = entry.line(), "Skipping @cert-authority entry");
                    continue;
                }
                None => {}
            }

            match self.matcher.check(entry, &lookup, cert) {
                MatchOutcome::Matched => {
                    trace_stage(VerificationStage::EntriesScanned, hostname);
                    return Ok(());
                }
                MatchOutcome::UnsupportedKind => unsupported = true,
                MatchOutcome::HostNotFound | MatchOutcome::KeyMismatch => {}
            }
        }
        trace_stage(VerificationStage::EntriesScanned, hostname);

        if unsupported {
            Err(VerifyError::UnsupportedKind { host: lookup })
        } else {
            Err(VerifyError::Unverified { host: lookup })
        }
    }
}

fn trace_stage(stage: VerificationStage, hostname: &str) {
    debug!(hostname = %hostname, stage = ?stage, "Host key verification {}", stage.label());
}
