pub mod alist;
pub mod memory;

use crate::error::RemoteResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use alist::AlistClient;
pub use memory::MemoryFs;

// ============ 公共常量 ============

/// 普通请求超时（秒）- login, list, mkdir, remove
pub const OP_TIMEOUT_SECS: u64 = 60;
/// 复制请求超时（秒）
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 列目录返回的一个条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
    /// 服务端给出的修改时间（RFC 3339），不参与比较
    #[serde(default)]
    pub modified: Option<String>,
}

impl FileRecord {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
            modified: None,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
            modified: None,
        }
    }

    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        self.modified
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

/// 远程文件系统接口
///
/// 源目录和目标目录都通过同一个服务访问，所有调用都是一问一答，
/// 重试和会话续期属于实现内部的事情。
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// 登录，建立后续调用使用的会话
    async fn authenticate(&self) -> RemoteResult<()>;

    /// 列出一层目录（不递归）
    async fn list(&self, path: &str) -> RemoteResult<Vec<FileRecord>>;

    /// 创建目录，目录已存在时不报错
    async fn make_dir(&self, path: &str) -> RemoteResult<()>;

    /// 把 `src_dir` 下的 `names` 复制到 `dst_dir`
    async fn copy(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> RemoteResult<()>;

    /// 删除 `dir` 下的 `names`
    async fn remove(&self, dir: &str, names: &[String]) -> RemoteResult<()>;

    /// 存储名称（用于日志）
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_listing_json() {
        let json = r#"{"name":"a.txt","size":12,"is_dir":false,"modified":"2024-03-01T08:00:00+08:00","sign":""}"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "a.txt");
        assert!(!record.is_dir);
        assert_eq!(record.size, 12);
        assert_eq!(
            record.modified_time().unwrap().to_rfc3339(),
            "2024-03-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_record_tolerates_missing_metadata() {
        let record: FileRecord = serde_json::from_str(r#"{"name":"sub","is_dir":true}"#).unwrap();
        assert_eq!(record, FileRecord::dir("sub"));
        assert!(record.modified_time().is_none());
    }
}
