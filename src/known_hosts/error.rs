// known_hosts 解析与校验错误类型

use thiserror::Error;

/// known_hosts 数据错误
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KnownHostsError {
    /// 行内容无法解析
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// 条目没有任何主机
    #[error("line {line}: entry has no host patterns")]
    EmptyHosts { line: usize },

    /// 读取文件失败
    #[error("failed to read known_hosts file {path}: {reason}")]
    Read { path: String, reason: String },
}

/// 主机密钥校验失败的原因
///
/// 每个变体都是一次拒绝，不存在"无法判断"的中间状态。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// 传输层没有提供证书
    #[error("no certificate returned for {hostname}")]
    MissingCertificate { hostname: String },

    /// known_hosts 数据无效
    #[error("invalid known_hosts data: {0}")]
    KnownHosts(#[from] KnownHostsError),

    /// 期望主机与传输层给出的主机不一致
    #[error("host mismatch: {expected:?} {presented:?}")]
    HostMismatch { expected: String, presented: String },

    /// 命中了 @revoked 条目
    #[error("hostkey for {host} has been revoked ({fingerprint})")]
    Revoked { host: String, fingerprint: String },

    /// 证书没有提供任何受支持的指纹类型
    #[error("hostkey cannot be verified: no supported fingerprint kind for {host}")]
    UnsupportedKind { host: String },

    /// 没有条目匹配
    #[error("hostkey cannot be verified")]
    Unverified { host: String },
}
