//! 应用配置模块
//!
//! 命令行参数先生效，配置文件中非空的值再覆盖它们。
//! 合并完成后得到一个不可变的 `AppConfig`，之后不再修改。

use crate::core::SyncConfig;
use crate::error::{error_chain, ConfigError};
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "alistsync", version, about = "把本地目录单向同步到 Alist 远程目录")]
pub struct Cli {
    /// 配置文件路径（JSON）
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Alist 服务地址
    #[arg(long, default_value = "")]
    pub endpoint: String,

    /// Alist 用户名
    #[arg(long, default_value = "")]
    pub username: String,

    /// Alist 密码
    #[arg(long, env = "ALIST_PASSWORD", hide_env_values = true, default_value = "")]
    pub password: String,

    /// 本地数据目录
    #[arg(long = "src-dir", default_value = "")]
    pub src_dir: String,

    /// 远程数据目录
    #[arg(long = "dst-dir", default_value = "")]
    pub dst_dir: String,

    /// 同时进行的列目录请求数
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// 只分析差异，不做任何修改
    #[arg(long)]
    pub dry_run: bool,

    /// 输出调试日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 不显示扫描进度
    #[arg(short, long)]
    pub quiet: bool,
}

/// 配置文件内容
#[derive(Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "srcDir")]
    pub src_dir: String,
    #[serde(default, alias = "dstDir", alias = "dst_dri")]
    pub dst_dir: String,
    #[serde(default)]
    pub concurrency: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 合并后的运行配置
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub src_dir: String,
    pub dst_dir: String,
    pub concurrency: usize,
    pub dry_run: bool,
    pub show_progress: bool,
}

// 密码不进日志
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("src_dir", &self.src_dir)
            .field("dst_dir", &self.dst_dir)
            .field("concurrency", &self.concurrency)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

fn override_if_set(target: &mut String, value: String) {
    if !value.is_empty() {
        *target = value;
    }
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            endpoint: cli.endpoint.clone(),
            username: cli.username.clone(),
            password: cli.password.clone(),
            src_dir: cli.src_dir.clone(),
            dst_dir: cli.dst_dir.clone(),
            concurrency: cli.concurrency,
            dry_run: cli.dry_run,
            show_progress: !cli.quiet,
        }
    }

    /// 配置文件中存在且非空的值覆盖当前值
    pub fn merge_file(&mut self, file: FileConfig) {
        override_if_set(&mut self.endpoint, file.endpoint);
        override_if_set(&mut self.username, file.username);
        override_if_set(&mut self.password, file.password);
        override_if_set(&mut self.src_dir, file.src_dir);
        override_if_set(&mut self.dst_dir, file.dst_dir);
        if let Some(n) = file.concurrency.filter(|n| *n > 0) {
            self.concurrency = n;
        }
    }

    /// 命令行 + 配置文件。配置文件读不到或解析失败时只记录日志，沿用命令行的值
    pub fn resolve(cli: &Cli) -> Self {
        let mut config = Self::from_cli(cli);

        if let Some(path) = &cli.config {
            info!("从文件加载配置: {}", path.display());
            match FileConfig::load(path) {
                Ok(file) => {
                    config.merge_file(file);
                    info!("配置加载成功: {:?}", config);
                }
                Err(e) => error!("{}", error_chain(&e)),
            }
        }

        config.validate();
        config
    }

    /// 源目录或目标目录为空时记录错误；不中止运行
    pub fn validate(&self) -> bool {
        if self.src_dir.is_empty() || self.dst_dir.is_empty() {
            error!("src-dir 或 dst-dir 为空");
            return false;
        }
        true
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            source_root: self.src_dir.clone(),
            destination_root: self.dst_dir.clone(),
            max_concurrent_lookups: self.concurrency,
            show_progress: self.show_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("alistsync").chain(args.iter().copied()))
    }

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_flags_only() {
        let config = AppConfig::resolve(&cli(&[
            "--endpoint",
            "http://nas:5244",
            "--src-dir",
            "/local",
            "--dst-dir",
            "/baidu/backup",
            "--concurrency",
            "4",
            "--quiet",
        ]));
        assert_eq!(config.endpoint, "http://nas:5244");
        assert_eq!(config.src_dir, "/local");
        assert_eq!(config.dst_dir, "/baidu/backup");
        assert_eq!(config.concurrency, 4);
        assert!(!config.show_progress);
        assert!(config.validate());
    }

    #[test]
    fn test_file_overrides_only_non_empty_values() {
        let file = config_file(
            r#"{"endpoint":"http://file:5244","username":"","src_dir":"/from-file","dstDir":"/remote","log":{"level":"debug"}}"#,
        );
        let path = file.path().to_str().unwrap();
        let config = AppConfig::resolve(&cli(&[
            "--config",
            path,
            "--endpoint",
            "http://flag:5244",
            "--username",
            "admin",
            "--src-dir",
            "/from-flag",
        ]));

        assert_eq!(config.endpoint, "http://file:5244");
        assert_eq!(config.username, "admin");
        assert_eq!(config.src_dir, "/from-file");
        assert_eq!(config.dst_dir, "/remote");
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_unreadable_file_keeps_flags() {
        let config = AppConfig::resolve(&cli(&[
            "--config",
            "/definitely/not/here.json",
            "--src-dir",
            "/a",
            "--dst-dir",
            "/b",
        ]));
        assert_eq!(config.src_dir, "/a");
        assert_eq!(config.dst_dir, "/b");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let file = config_file("{ not json");
        let err = FileConfig::load(file.path()).err().unwrap();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_empty_roots_fail_validation_but_resolve() {
        let config = AppConfig::resolve(&cli(&["--src-dir", "/a"]));
        assert!(!config.validate());
        assert_eq!(config.sync_config().destination_root, "");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = AppConfig::resolve(&cli(&["--password", "hunter2"]));
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("***"));
    }
}
