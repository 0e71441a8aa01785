// hostkey-smoke 入口
// 扫描目标主机公钥，再用扫描结果校验真实握手；同时确认陌生公钥会被拒绝

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use russh::keys::PublicKey;
use tracing::{error, info};

use hostkey_smoke::config;
use hostkey_smoke::ssh::{
    format_known_hosts_line, AuthMethod, HostKeyScanner, RusshScanner, SshClient, SshConfig,
    SshError,
};
use hostkey_smoke::VerifyError;

/// 密码认证时读取的环境变量
const PASSWORD_ENV: &str = "HOSTKEY_SMOKE_PASSWORD";

/// 与目标主机无关的公钥，只用于反向用例
const FOREIGN_KEY: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl";

#[derive(Parser, Debug)]
#[command(
    name = "hostkey-smoke",
    about = "Smoke-test SSH host key verification against a live server"
)]
struct Cli {
    /// Target address, `host` or `host:port`
    address: String,
    /// SSH user name (defaults to the configured one)
    user: Option<String>,
    /// Private key for public key authentication; password is read from HOSTKEY_SMOKE_PASSWORD otherwise
    key: Option<PathBuf>,
}

fn main() {
    // 初始化日志系统
    // 可以通过 RUST_LOG 环境变量控制日志级别，例如：RUST_LOG=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(cli.address, cli.user, cli.key) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(address: String, username: Option<String>, key_path: Option<PathBuf>) -> Result<bool> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("ssh-worker")
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_smoke(address, username, key_path))
}

async fn run_smoke(
    address: String,
    username: Option<String>,
    key_path: Option<PathBuf>,
) -> Result<bool> {
    let settings = config::load_config()?;
    info!(
        address = %address,
        fingerprint_kinds = ?settings
            .fingerprint_kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>(),
        hostname_policy = ?settings.hostname_policy,
        "Running smoke tests"
    );

    let scanned = RusshScanner
        .scan(&address, Duration::from_secs(settings.scan_timeout))
        .await
        .context("scan host key")?;
    let known_hosts = String::from_utf8(scanned).context("scanned host key is not UTF-8")?;

    let auth = match key_path {
        Some(key_path) => AuthMethod::PublicKey {
            key_path,
            passphrase: None,
        },
        None => AuthMethod::Password(std::env::var(PASSWORD_ENV).unwrap_or_default()),
    };
    let mut ssh_config = SshConfig::for_address(
        &address,
        username.unwrap_or_else(|| settings.username.clone()),
        auth,
    );
    ssh_config.connect_timeout = settings.connect_timeout;

    let mut passed = true;

    // 期望主机取连接配置的主机标识，与握手回调收到的主机名同源
    let verifier = Arc::new(settings.verifier_for(&ssh_config, known_hosts));
    let trusted = SshClient::new(ssh_config.clone(), verifier)
        .connect()
        .await
        .map(drop)
        .map_err(anyhow::Error::from);
    passed &= report("SSH connection with scanned host key", trusted);

    // 主机相同、公钥不同
    let foreign_key =
        PublicKey::from_openssh(FOREIGN_KEY).context("Failed to decode foreign host key")?;
    let foreign_line = format_known_hosts_line(&ssh_config.identity(), &foreign_key)?;
    let foreign = Arc::new(settings.verifier_for(&ssh_config, foreign_line));
    let untrusted = match SshClient::new(ssh_config, foreign).connect().await {
        Err(SshError::HostKey(e @ VerifyError::Unverified { .. })) => {
            info!(reason = %e, "Handshake rejected as expected");
            Ok(())
        }
        Err(SshError::HostKey(e)) => Err(anyhow!("handshake rejected for another reason: {}", e)),
        Ok(_) => Err(anyhow!("handshake accepted with a foreign host key")),
        Err(e) => Err(e.into()),
    };
    passed &= report("SSH connection with foreign host key", untrusted);

    Ok(passed)
}

fn report(description: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => {
            println!("Test case {:?}: OK", description);
            true
        }
        Err(e) => {
            println!("Test case {:?}: FAILED", description);
            error!("{:#}", e);
            false
        }
    }
}
