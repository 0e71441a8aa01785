// 主机与指纹匹配

use russh::keys::{HashAlg, PublicKey};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::entry::KnownHostsEntry;

/// 指纹摘要算法
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintKind {
    Sha256,
    Sha512,
}

impl FingerprintKind {
    pub fn hash_alg(self) -> HashAlg {
        match self {
            Self::Sha256 => HashAlg::Sha256,
            Self::Sha512 => HashAlg::Sha512,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

/// 指纹类型集合
pub type FingerprintKinds = SmallVec<[FingerprintKind; 2]>;

fn collect_kinds(kinds: impl IntoIterator<Item = FingerprintKind>) -> FingerprintKinds {
    let mut set = FingerprintKinds::new();
    for kind in kinds {
        if !set.contains(&kind) {
            set.push(kind);
        }
    }
    set
}

/// 握手时服务器出示的主机密钥
///
/// 由传输层提供，回调期间只读。
#[derive(Clone, Debug)]
pub struct PresentedCertificate {
    public_key: PublicKey,
    /// 传输层能为该密钥计算的指纹类型
    fingerprint_kinds: FingerprintKinds,
}

impl PresentedCertificate {
    pub fn new(public_key: PublicKey, kinds: impl IntoIterator<Item = FingerprintKind>) -> Self {
        Self {
            public_key,
            fingerprint_kinds: collect_kinds(kinds),
        }
    }

    /// 拿到完整公钥时，所有指纹类型都可以计算
    pub fn from_public_key(public_key: PublicKey) -> Self {
        Self::new(
            public_key,
            [FingerprintKind::Sha256, FingerprintKind::Sha512],
        )
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn fingerprint_kinds(&self) -> &[FingerprintKind] {
        &self.fingerprint_kinds
    }

    pub fn supports(&self, kind: FingerprintKind) -> bool {
        self.fingerprint_kinds.contains(&kind)
    }

    /// 指纹字符串，形如 `SHA256:...`
    pub fn fingerprint(&self, kind: FingerprintKind) -> String {
        self.public_key.fingerprint(kind.hash_alg()).to_string()
    }
}

/// 单个条目的匹配结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    /// 条目中没有该主机
    HostNotFound,
    /// 证书不支持任何已启用的指纹类型
    UnsupportedKind,
    /// 主机匹配但指纹不同
    KeyMismatch,
}

/// 条目匹配器，持有已启用的指纹类型
#[derive(Clone, Debug)]
pub struct HostMatcher {
    supported: FingerprintKinds,
}

impl Default for HostMatcher {
    fn default() -> Self {
        Self::new([FingerprintKind::Sha256])
    }
}

impl HostMatcher {
    pub fn new(kinds: impl IntoIterator<Item = FingerprintKind>) -> Self {
        Self {
            supported: collect_kinds(kinds),
        }
    }

    pub fn supported(&self) -> &[FingerprintKind] {
        &self.supported
    }

    /// 按启用顺序选出证书也支持的第一个指纹类型
    fn negotiate(&self, cert: &PresentedCertificate) -> Option<FingerprintKind> {
        self.supported.iter().copied().find(|kind| cert.supports(*kind))
    }

    /// 检查单个条目，`host` 必须是 known_hosts 形式
    pub fn check(
        &self,
        entry: &KnownHostsEntry,
        host: &str,
        cert: &PresentedCertificate,
    ) -> MatchOutcome {
        if !entry.contains_host(host) {
            debug!(host = %host, line = entry.line(), "Host not found in entry");
            return MatchOutcome::HostNotFound;
        }

        let Some(kind) = self.negotiate(cert) else {
            debug!(
                host = %host,
                line = entry.line(),
                offered = ?cert.fingerprint_kinds(),
                "Host key kind not supported"
            );
            return MatchOutcome::UnsupportedKind;
        };

        let known = entry.key().fingerprint(kind.hash_alg()).to_string();
        let presented = cert.fingerprint(kind);
        debug!(
            host = %host,
            line = entry.line(),
            known = %known,
            presented = %presented,
            "Comparing fingerprints"
        );

        if known == presented {
            MatchOutcome::Matched
        } else {
            MatchOutcome::KeyMismatch
        }
    }

    pub fn matches(
        &self,
        entry: &KnownHostsEntry,
        host: &str,
        cert: &PresentedCertificate,
    ) -> bool {
        self.check(entry, host, cert) == MatchOutcome::Matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::known_hosts::parser::parse;
    use crate::known_hosts::test_keys::{public_key, KEY_A, KEY_B};

    fn entry(line: &str) -> KnownHostsEntry {
        parse(line).unwrap().remove(0)
    }

    #[test]
    fn test_matches_same_host_and_key() {
        let entry = entry(&format!("[example.com]:2222 {}", KEY_A));
        let cert = PresentedCertificate::from_public_key(public_key(KEY_A));
        let matcher = HostMatcher::default();

        assert!(matcher.matches(&entry, "[example.com]:2222", &cert));
    }

    #[test]
    fn test_other_host_is_not_found() {
        let entry = entry(&format!("[example.com]:2222 {}", KEY_A));
        let cert = PresentedCertificate::from_public_key(public_key(KEY_A));
        let matcher = HostMatcher::default();

        assert_eq!(
            matcher.check(&entry, "[example.org]:2222", &cert),
            MatchOutcome::HostNotFound
        );
        // 不做端口省略或模糊匹配
        assert_eq!(
            matcher.check(&entry, "example.com", &cert),
            MatchOutcome::HostNotFound
        );
    }

    #[test]
    fn test_other_key_is_mismatch() {
        let entry = entry(&format!("example.com {}", KEY_A));
        let cert = PresentedCertificate::from_public_key(public_key(KEY_B));

        assert_eq!(
            HostMatcher::default().check(&entry, "example.com", &cert),
            MatchOutcome::KeyMismatch
        );
    }

    #[test]
    fn test_unsupported_kind_never_matches_even_with_same_key() {
        let entry = entry(&format!("example.com {}", KEY_A));
        let cert = PresentedCertificate::new(public_key(KEY_A), [FingerprintKind::Sha512]);

        let matcher = HostMatcher::default();
        assert_eq!(
            matcher.check(&entry, "example.com", &cert),
            MatchOutcome::UnsupportedKind
        );
        assert!(!matcher.matches(&entry, "example.com", &cert));
    }

    #[test]
    fn test_enabled_kinds_are_data() {
        let entry = entry(&format!("example.com {}", KEY_A));
        let cert = PresentedCertificate::new(public_key(KEY_A), [FingerprintKind::Sha512]);

        let matcher = HostMatcher::new([FingerprintKind::Sha256, FingerprintKind::Sha512]);
        assert!(matcher.matches(&entry, "example.com", &cert));

        let nothing = HostMatcher::new(Vec::<FingerprintKind>::new());
        assert_eq!(
            nothing.check(&entry, "example.com", &cert),
            MatchOutcome::UnsupportedKind
        );
    }

    #[test]
    fn test_kinds_are_deduplicated() {
        let matcher = HostMatcher::new([
            FingerprintKind::Sha256,
            FingerprintKind::Sha256,
            FingerprintKind::Sha512,
        ]);
        assert_eq!(
            matcher.supported(),
            &[FingerprintKind::Sha256, FingerprintKind::Sha512]
        );
    }

    #[test]
    fn test_fingerprint_format() {
        let cert = PresentedCertificate::from_public_key(public_key(KEY_A));
        assert!(cert.fingerprint(FingerprintKind::Sha256).starts_with("SHA256:"));
        assert!(cert.fingerprint(FingerprintKind::Sha512).starts_with("SHA512:"));
    }
}
