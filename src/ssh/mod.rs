// SSH 连接模块
//
// 模块结构:
// - config: 连接配置 (SshConfig, AuthMethod)
// - error: 错误类型 (SshError)
// - handler: russh Handler 实现 (VerifyingHandler, ScanHandler)
// - scan: 主机密钥扫描 (HostKeyScanner, RusshScanner)
// - client: SSH 客户端核心

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod scan;

// 公开导出
pub use client::SshClient;
pub use config::{AuthMethod, SshConfig};
pub use error::SshError;
pub use handler::{ScanHandler, VerifyingHandler};
pub use scan::{format_known_hosts_line, HostKeyScanner, RusshScanner};
