//! 调试足迹 - 每次唤醒的关键节点写入本地 JSONL 文件
//!
//! 扩展进程随时可能被系统杀掉，事后只能靠这份足迹排查。

use anyhow::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// 足迹代码
pub mod code {
    pub const START: &str = "START";
    pub const ABORT_NSE_RUNS: &str = "ABORT_NSE_RUNS";
    pub const ERR_OPEN: &str = "ERR_OPEN";
    pub const ERR_CORE: &str = "ERR_CORE";
    pub const ERR_TIME: &str = "ERR_TIME";
    pub const ERR_DELIVER: &str = "ERR_DELIVER";
    pub const OK_SILENT: &str = "OK_SILENT";
    pub const OK_NOTIFIED: &str = "OK_NOTIFIED";
}

/// 一条足迹
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailEntry {
    pub ts: DateTime<Utc>,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

const MAX_ENTRIES: usize = 200;
const KEEP_AFTER_CLEANUP: usize = 100;
/// 估算行数用的平均行长（字节）
const AVG_LINE_BYTES: u64 = 60;

/// 调试足迹
#[derive(Debug, Clone)]
pub struct DebugTrail {
    path: PathBuf,
}

impl DebugTrail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join("debug_trail.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加足迹，失败只记日志
    pub fn push(&self, code: &str, detail: Option<String>) {
        let entry = TrailEntry {
            ts: Utc::now(),
            code: code.to_string(),
            detail,
        };
        if let Err(e) = self.append(&entry) {
            warn!(error = %e, code, "Failed to write debug trail");
        }
    }

    /// 追加足迹（带文件锁）
    pub fn append(&self, entry: &TrailEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive()?;
        let written = writeln!(file, "{}", serde_json::to_string(entry)?);
        file.unlock()?;
        written?;

        if let Ok(metadata) = fs::metadata(&self.path) {
            if metadata.len() / AVG_LINE_BYTES > MAX_ENTRIES as u64 {
                self.cleanup()?;
            }
        }
        Ok(())
    }

    /// 读取最近 N 条足迹
    pub fn read_recent(&self, n: usize) -> Vec<TrailEntry> {
        let entries = match File::open(&self.path) {
            Ok(file) => Self::parse(&file),
            Err(_) => return Vec::new(),
        };
        let start = entries.len().saturating_sub(n);
        entries[start..].to_vec()
    }

    fn parse(file: &File) -> Vec<TrailEntry> {
        BufReader::new(file)
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }

    /// 只保留最近的足迹
    fn cleanup(&self) -> Result<()> {
        let file = File::open(&self.path)?;
        file.lock_exclusive()?;

        let entries = Self::parse(&file);
        if entries.len() <= MAX_ENTRIES {
            file.unlock()?;
            return Ok(());
        }

        let start = entries.len().saturating_sub(KEEP_AFTER_CLEANUP);
        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp_file = File::create(&temp_path)?;
            for entry in &entries[start..] {
                writeln!(temp_file, "{}", serde_json::to_string(entry)?)?;
            }
        }
        fs::rename(&temp_path, &self.path)?;

        file.unlock()?;
        Ok(())
    }
}
