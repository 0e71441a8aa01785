// known_hosts 文本解析
//
// 每行先归类为 Skip / Entry / Error，再按顺序折叠：
// Skip 忽略，Entry 收集，遇到第一个 Error 立即返回。

use std::fs;
use std::path::{Path, PathBuf};

use super::entry::KnownHostsEntry;
use super::error::KnownHostsError;

/// 单行解析结果
#[derive(Debug)]
pub enum LineOutcome {
    /// 空行或注释
    Skip,
    /// 有效条目
    Entry(KnownHostsEntry),
    /// 无法解析
    Error(KnownHostsError),
}

/// 归类一行，`line_no` 从 1 开始
pub fn classify_line(line_no: usize, line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return LineOutcome::Skip;
    }
    match KnownHostsEntry::from_line(line_no, line) {
        Ok(entry) => LineOutcome::Entry(entry),
        Err(err) => LineOutcome::Error(err),
    }
}

/// 解析 known_hosts 文本，保持行序
pub fn parse(text: &str) -> Result<Vec<KnownHostsEntry>, KnownHostsError> {
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        match classify_line(idx + 1, line) {
            LineOutcome::Skip => continue,
            LineOutcome::Entry(entry) => entries.push(entry),
            LineOutcome::Error(err) => return Err(err),
        }
    }
    Ok(entries)
}

/// 读取 known_hosts 文件内容
pub fn read_file(path: &Path) -> Result<String, KnownHostsError> {
    fs::read_to_string(path).map_err(|e| KnownHostsError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// 用户默认的 known_hosts 路径（~/.ssh/known_hosts）
pub fn default_known_hosts_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("known_hosts"))
}
