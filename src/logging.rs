//! 日志模块 - 控制台日志，以及可选的带大小限制的文件日志

use serde::Deserialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "alistsync.log";

/// 日志配置，对应配置文件中的 `log` 字段
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 是否启用日志记录
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_level")]
    pub level: String,
    /// 日志文件目录，不设置时只输出到控制台
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// 最大日志文件大小（MB）
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_max_size_mb() -> u32 {
    5
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            level: default_level(),
            dir: None,
            max_size_mb: default_max_size_mb(),
        }
    }
}

impl LogConfig {
    /// 从配置文件读取 `log` 字段；文件不存在或字段无效时使用默认值
    pub fn load(config_file: Option<&Path>) -> Self {
        config_file
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
            .and_then(|config| config.get("log").cloned())
            .and_then(|log| serde_json::from_value::<LogConfig>(log).ok())
            .unwrap_or_default()
    }

    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

fn quiet_directive(spec: &str) -> Option<Directive> {
    spec.parse().ok()
}

/// 初始化日志系统
pub fn init(config: &LogConfig, verbose: bool) {
    if !config.enabled {
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        return;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config.tracing_level()
    };

    let mut env_filter = EnvFilter::from_default_env().add_directive(level.into());
    for spec in ["hyper=warn", "hyper_util=warn", "reqwest=warn"] {
        if let Some(directive) = quiet_directive(spec) {
            env_filter = env_filter.add_directive(directive);
        }
    }

    let file_layer = config.dir.as_deref().and_then(|dir| {
        match SizeRotatingWriter::new(dir, config.max_size_mb) {
            Ok(writer) => Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false),
            ),
            Err(e) => {
                // 订阅器还没装好，只能直接写 stderr
                eprintln!("无法创建日志文件 {}: {}", dir.display(), e);
                None
            }
        }
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    written: u64,
    writer: Option<BufWriter<File>>,
}

impl RotatingFile {
    fn open(path: &Path) -> io::Result<(BufWriter<File>, u64)> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();
        Ok((BufWriter::new(file), len))
    }

    /// alistsync.log → alistsync.log.old，旧备份被覆盖
    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut w) = self.writer.take() {
            let _ = w.flush();
        }
        let backup = self.path.with_extension("log.old");
        if backup.exists() {
            fs::remove_file(&backup)?;
        }
        fs::rename(&self.path, &backup)?;

        let (writer, len) = Self::open(&self.path)?;
        self.writer = Some(writer);
        self.written = len;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "日志文件不可用"))?;
        let n = writer.write(buf)?;
        writer.flush()?;
        self.written += n as u64;

        if self.written > self.max_bytes {
            self.rotate()?;
        }
        Ok(n)
    }
}

/// 带大小限制的日志写入器
#[derive(Clone)]
pub struct SizeRotatingWriter {
    inner: Arc<Mutex<RotatingFile>>,
}

impl SizeRotatingWriter {
    pub fn new(log_dir: &Path, max_size_mb: u32) -> io::Result<Self> {
        Self::with_max_bytes(log_dir, u64::from(max_size_mb) * 1024 * 1024)
    }

    pub fn with_max_bytes(log_dir: &Path, max_bytes: u64) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(LOG_FILE_NAME);

        let mut file = RotatingFile {
            path,
            max_bytes,
            written: 0,
            writer: None,
        };
        let (writer, len) = RotatingFile::open(&file.path)?;
        file.writer = Some(writer);
        file.written = len;
        if len > max_bytes {
            file.rotate()?;
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RotatingFile> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 单次日志事件使用的写入句柄
pub struct LogWriter {
    inner: Arc<Mutex<RotatingFile>>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .writer
            .as_mut()
        {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SizeRotatingWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            inner: self.inner.clone(),
        }
    }
}

impl Write for SizeRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.lock().writer.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}
