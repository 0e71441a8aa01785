// SSH known_hosts 校验模块
//
// 模块结构:
// - host: 主机标识规范化 (HostIdentity)
// - entry: 条目数据模型 (KnownHostsEntry, EntryMarker)
// - parser: 文本解析 (parse, LineOutcome)
// - matcher: 主机与指纹匹配 (HostMatcher, PresentedCertificate, FingerprintKind)
// - verifier: 握手回调 (HostKeyVerifier)
// - error: 错误类型 (KnownHostsError, VerifyError)

pub mod entry;
pub mod error;
pub mod host;
pub mod matcher;
pub mod parser;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_keys;

// 公开导出
pub use entry::{EntryMarker, KnownHostsEntry};
pub use error::{KnownHostsError, VerifyError};
pub use host::{HostIdentity, DEFAULT_SSH_PORT};
pub use matcher::{FingerprintKind, HostMatcher, MatchOutcome, PresentedCertificate};
pub use parser::{default_known_hosts_path, parse, LineOutcome};
pub use verifier::{HostKeyVerifier, HostnamePolicy, VerificationStage};
