// 主机标识规范化
//
// 同一个主机有两种书写形式：
// - canonical(): 身份比较用，`host` / `host:port` / `[v6]:port`
// - known_hosts_form(): 在 known_hosts 数据中查找用，端口为空或 22 时只写主机名，否则写成 `[host]:port`

use std::fmt;

/// SSH 默认端口
pub const DEFAULT_SSH_PORT: u16 = 22;

/// 规范化后的主机标识
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HostIdentity {
    /// 主机名（小写，不含方括号）
    host: String,
    /// 端口（未指定时为 None）
    port: Option<u16>,
}

impl HostIdentity {
    /// 由主机名和端口构建
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
            port,
        }
    }

    /// 解析 `host`、`host:port`、`[host]:port` 形式的地址
    ///
    /// 拆不出合法端口时，整个输入按主机名处理（不视为错误）。
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match split_host_port(input) {
            Some((host, port)) => Self::new(host, Some(port)),
            None => Self::new(strip_brackets(input), None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// 端口，未指定时返回 22
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SSH_PORT)
    }

    /// 身份比较用的规范形式
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// known_hosts 文件中记录该主机时使用的形式
    pub fn known_hosts_form(&self) -> String {
        match self.port {
            None | Some(DEFAULT_SSH_PORT) => self.host.clone(),
            Some(port) => format!("[{}]:{}", self.host, port),
        }
    }

    /// 仅比较主机名，忽略端口
    pub fn same_host(&self, other: &HostIdentity) -> bool {
        self.host == other.host
    }
}

impl fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) if self.host.contains(':') => write!(f, "[{}]:{}", self.host, port),
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

/// 拆分主机和端口
/// 未带方括号的 IPv6 地址（多个冒号）不拆分
fn split_host_port(input: &str) -> Option<(&str, u16)> {
    if let Some(rest) = input.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?.parse().ok()?;
        return (!host.is_empty()).then_some((host, port));
    }

    let (host, port) = input.rsplit_once(':')?;
    if host.is_empty() || host.contains(':') {
        return None;
    }
    Some((host, port.parse().ok()?))
}

fn strip_brackets(input: &str) -> &str {
    input
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(input)
}
