// hostkey-smoke
// SSH known_hosts 校验，以及基于 russh 的扫描与连接冒烟测试

pub mod config;
pub mod known_hosts;
pub mod ssh;

pub use config::SmokeConfig;
pub use known_hosts::{HostKeyVerifier, PresentedCertificate, VerifyError};
