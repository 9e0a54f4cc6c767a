//! 拉取互斥 - 防止多次推送唤醒同时拉取
//!
//! 状态文件记录“拉取进行到何时”。带过期时间，进程被系统杀掉后不会永久卡住。

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct GuardState {
    #[serde(default)]
    fetching_until: Option<DateTime<Utc>>,
}

/// 拉取互斥
#[derive(Debug, Clone)]
pub struct FetchGuard {
    path: PathBuf,
}

impl FetchGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 状态目录下的默认文件
    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join("fetch_guard.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 是否有其他拉取正在进行
    pub fn is_fetching(&self) -> bool {
        self.is_fetching_at(Utc::now())
    }

    pub fn is_fetching_at(&self, now: DateTime<Utc>) -> bool {
        match self.read() {
            Ok(state) => state.fetching_until.is_some_and(|until| now < until),
            Err(e) => {
                debug!(error = %e, "Fetch guard unreadable, treating as idle");
                false
            }
        }
    }

    /// 标记拉取开始，`for_secs` 后自动过期
    pub fn begin(&self, for_secs: i64) -> Result<()> {
        self.write(&GuardState {
            fetching_until: Some(Utc::now() + Duration::seconds(for_secs)),
        })
    }

    /// 标记拉取结束
    pub fn done(&self) -> Result<()> {
        self.write(&GuardState::default())
    }

    fn read(&self) -> Result<GuardState> {
        if !self.path.exists() {
            return Ok(GuardState::default());
        }
        let mut file = File::open(&self.path)?;
        file.lock_shared()?;
        let mut content = String::new();
        let read = file.read_to_string(&mut content);
        file.unlock()?;
        read?;

        if content.trim().is_empty() {
            return Ok(GuardState::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, state: &GuardState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let result = (|| -> Result<()> {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(serde_json::to_string(state)?.as_bytes())?;
            file.flush()?;
            Ok(())
        })();
        file.unlock()?;
        result
    }
}
