//! 错误类型
//!
//! `RemoteError` 描述单次远程调用的失败，`SyncError` 描述同步流程中哪一步失败。

use std::path::PathBuf;
use thiserror::Error;

/// 远程存储调用错误
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    /// 服务端返回了非 200 的业务码
    #[error("服务端返回错误 (code={code}): {message}")]
    Api { code: i64, message: String },

    #[error("尚未登录")]
    NotLoggedIn,

    #[error("路径不存在: {0}")]
    NotFound(String),

    #[error("请求被拒绝: {0}")]
    Rejected(String),
}

/// 同步流程错误
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("登录失败")]
    Auth(#[source] RemoteError),

    #[error("列出目录 {path} 失败")]
    Listing {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("创建目录 {path} 失败")]
    Directory {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("从 {from} 复制到 {to} 失败")]
    Transfer {
        from: String,
        to: String,
        #[source]
        source: RemoteError,
    },

    #[error("删除 {dir} 中的文件失败")]
    Removal {
        dir: String,
        #[source]
        source: RemoteError,
    },
}

impl SyncError {
    /// 列目录和登录失败会终止整个同步
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Auth(_) | SyncError::Listing { .. })
    }
}

/// 配置文件错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("解析配置文件 {path:?} 失败")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// 把错误及其 source 链拼成一行，用于日志
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        message.push_str(": ");
        message.push_str(&source.to_string());
        current = source.source();
    }
    message
}
