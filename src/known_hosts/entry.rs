// known_hosts 条目数据模型

use hmac::{Hmac, Mac};
use russh::keys::ssh_key::known_hosts::{Entry, HostPatterns, Marker};
use russh::keys::PublicKey;
use sha1::Sha1;

use super::error::KnownHostsError;

/// 行首标记
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryMarker {
    /// @cert-authority（暂不支持证书校验，匹配时跳过）
    CertAuthority,
    /// @revoked
    Revoked,
}

/// 哈希主机名 `|1|salt|hash`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashedHost {
    salt: Vec<u8>,
    hash: [u8; 20],
}

impl HashedHost {
    /// HMAC-SHA1(salt, host) 是否等于记录的哈希
    pub fn matches(&self, host: &str) -> bool {
        let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(&self.salt) else {
            return false;
        };
        mac.update(host.as_bytes());
        mac.verify_slice(&self.hash).is_ok()
    }
}

/// 一条 known_hosts 记录：若干主机绑定到一个公钥
#[derive(Clone, Debug)]
pub struct KnownHostsEntry {
    /// 所在行号（从 1 开始）
    line: usize,
    marker: Option<EntryMarker>,
    /// 文件中出现的主机字段，按原顺序
    hosts: Vec<String>,
    hashed: Option<HashedHost>,
    key: PublicKey,
}

impl KnownHostsEntry {
    /// 解析单行（调用方已去掉空行和注释）
    pub(crate) fn from_line(line_no: usize, line: &str) -> Result<Self, KnownHostsError> {
        let entry = line
            .parse::<Entry>()
            .map_err(|e| KnownHostsError::Malformed {
                line: line_no,
                reason: e.to_string(),
            })?;

        let (hosts, hashed) = match entry.host_patterns() {
            // 与 HostIdentity 相同，主机名统一小写；哈希名保持原样
            HostPatterns::Patterns(patterns) => (
                patterns.iter().map(|p| p.to_ascii_lowercase()).collect(),
                None,
            ),
            HostPatterns::HashedName { salt, hash } => {
                let raw = host_field(line)
                    .ok_or(KnownHostsError::EmptyHosts { line: line_no })?
                    .to_string();
                (
                    vec![raw],
                    Some(HashedHost {
                        salt: salt.clone(),
                        hash: *hash,
                    }),
                )
            }
        };

        if hosts.is_empty() || hosts.iter().any(|h| h.is_empty()) {
            return Err(KnownHostsError::EmptyHosts { line: line_no });
        }

        let marker = entry.marker().map(|m| match m {
            Marker::Revoked => EntryMarker::Revoked,
            _ => EntryMarker::CertAuthority,
        });

        Ok(Self {
            line: line_no,
            marker,
            hosts,
            hashed,
            key: entry.public_key().clone(),
        })
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn marker(&self) -> Option<EntryMarker> {
        self.marker
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn hashed(&self) -> Option<&HashedHost> {
        self.hashed.as_ref()
    }

    pub fn key(&self) -> &PublicKey {
        &self.key
    }

    pub fn is_revoked(&self) -> bool {
        self.marker == Some(EntryMarker::Revoked)
    }

    /// 主机是否出现在本条目中（逐字比较，或哈希匹配）
    pub fn contains_host(&self, host: &str) -> bool {
        match &self.hashed {
            Some(hashed) => hashed.matches(host),
            None => self.hosts.iter().any(|h| h == host),
        }
    }
}

/// 取出主机字段（跳过 @marker）
fn host_field(line: &str) -> Option<&str> {
    let mut fields = line.split_whitespace();
    let first = fields.next()?;
    if first.starts_with('@') {
        fields.next()
    } else {
        Some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::known_hosts::test_keys::{hashed_line, KEY_A};

    #[test]
    fn test_plain_entry_keeps_host_order() {
        let line = format!("example.com,[example.com]:2222,10.0.0.1 {}", KEY_A);
        let entry = KnownHostsEntry::from_line(3, &line).unwrap();

        assert_eq!(entry.line(), 3);
        assert_eq!(
            entry.hosts(),
            &["example.com", "[example.com]:2222", "10.0.0.1"]
        );
        assert!(entry.marker().is_none());
        assert!(entry.contains_host("[example.com]:2222"));
        assert!(!entry.contains_host("example.org"));
    }

    #[test]
    fn test_plain_hosts_are_lowercased() {
        let line = format!("Example.COM,[Example.COM]:2222 {}", KEY_A);
        let entry = KnownHostsEntry::from_line(1, &line).unwrap();

        assert_eq!(entry.hosts(), &["example.com", "[example.com]:2222"]);
        assert!(entry.contains_host("[example.com]:2222"));
    }

    #[test]
    fn test_marker_is_recorded() {
        let revoked = KnownHostsEntry::from_line(1, &format!("@revoked example.com {}", KEY_A))
            .unwrap();
        assert!(revoked.is_revoked());

        let ca = KnownHostsEntry::from_line(1, &format!("@cert-authority example.com {}", KEY_A))
            .unwrap();
        assert_eq!(ca.marker(), Some(EntryMarker::CertAuthority));
        assert!(!ca.is_revoked());
    }

    #[test]
    fn test_hashed_entry_matches_by_hmac() {
        let line = hashed_line("[example.com]:2222", KEY_A);
        let entry = KnownHostsEntry::from_line(1, &line).unwrap();

        assert!(entry.hashed().is_some());
        assert_eq!(entry.hosts().len(), 1);
        assert!(entry.hosts()[0].starts_with("|1|"));
        assert!(entry.contains_host("[example.com]:2222"));
        assert!(!entry.contains_host("example.com"));
    }

    #[test]
    fn test_missing_key_is_malformed() {
        let err = KnownHostsEntry::from_line(7, "example.com ssh-ed25519").unwrap_err();
        assert!(matches!(err, KnownHostsError::Malformed { line: 7, .. }));
    }
}
