//! 本地文件渠道 - 将投递的通知追加到 JSONL 文件

use anyhow::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::notification::channel::{NotificationSink, SendResult};
use crate::notification::content::NotificationContent;

/// 投递记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub content: NotificationContent,
}

/// 本地文件渠道
pub struct LocalFileSink {
    path: PathBuf,
}

impl LocalFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, record: &DeliveryRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive()?;
        let written = writeln!(file, "{}", serde_json::to_string(record)?);
        file.unlock()?;
        Ok(written?)
    }
}

impl NotificationSink for LocalFileSink {
    fn name(&self) -> &str {
        "local_file"
    }

    fn deliver(&self, content: &NotificationContent) -> Result<SendResult> {
        let record = DeliveryRecord {
            ts: Utc::now(),
            content: content.clone(),
        };

        match self.append(&record) {
            Ok(()) => {
                debug!(
                    channel = "local_file",
                    path = %self.path.display(),
                    "Notification recorded"
                );
                Ok(SendResult::Sent)
            }
            Err(e) => {
                warn!(
                    channel = "local_file",
                    error = %e,
                    "Failed to write notification to local file"
                );
                Ok(SendResult::Failed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_file_sink_appends_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("delivered.jsonl");
        let sink = LocalFileSink::new(&path);

        let result = sink.deliver(&NotificationContent::new("Alice", "hi")).unwrap();
        assert_eq!(result, SendResult::Sent);
        assert_eq!(sink.deliver(&NotificationContent::silent()).unwrap(), SendResult::Sent);

        let content = fs::read_to_string(&path).unwrap();
        let records: Vec<DeliveryRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content.title.as_deref(), Some("Alice"));
        assert!(records[1].content.is_silent());
    }
}
