use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 扫描进度
///
/// 每一轮扫描（先目标、后源）开始前调用 `reset`。计数只用于显示，
/// 不参与任何同步决策；并发扫描时由多个分支同时累加。
#[derive(Debug, Default)]
pub struct ScanProgress {
    discovered: AtomicUsize,
    echo: bool,
}

impl ScanProgress {
    /// `echo` 为 true 时把进度行写到 stderr
    pub fn new(echo: bool) -> Self {
        Self {
            discovered: AtomicUsize::new(0),
            echo,
        }
    }

    pub fn silent() -> Self {
        Self::new(false)
    }

    pub fn reset(&self) {
        self.discovered.store(0, Ordering::Relaxed);
    }

    /// 累加并返回新的计数
    pub fn advance(&self, count: usize) -> usize {
        self.discovered.fetch_add(count, Ordering::Relaxed) + count
    }

    pub fn discovered(&self) -> usize {
        self.discovered.load(Ordering::Relaxed)
    }

    /// 覆盖式输出当前计数
    pub fn report(&self) {
        if self.echo {
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "\r已发现文件: {}", self.discovered());
            let _ = err.flush();
        }
    }

    /// 一轮扫描结束，换行
    pub fn finish(&self) {
        if self.echo {
            let _ = writeln!(std::io::stderr());
        }
    }
}
