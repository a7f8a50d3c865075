use crate::core::comparator::{count_files, FileComparator, OperationGroup};
use crate::core::path::Namespaces;
use crate::core::progress::ScanProgress;
use crate::core::scanner::{FileScanner, FlatTree};
use crate::error::{error_chain, SyncError, SyncResult};
use crate::storage::RemoteFs;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 同步配置
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 源目录（本地数据目录）
    pub source_root: String,
    /// 目标目录（远程数据目录）
    pub destination_root: String,
    /// 同时进行的列目录请求数，1 表示逐个深度优先
    pub max_concurrent_lookups: usize,
    /// 是否在 stderr 显示扫描进度
    pub show_progress: bool,
}

impl SyncConfig {
    pub fn new(source_root: impl Into<String>, destination_root: impl Into<String>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            ..Default::default()
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_root: String::new(),
            destination_root: String::new(),
            max_concurrent_lookups: 1,
            show_progress: false,
        }
    }
}

/// 差异分析结果（不执行任何修改）
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub dest_files: usize,
    pub source_files: usize,
    /// 目标端绝对父目录 → 待删除文件名
    pub deletions: OperationGroup,
    /// 相对源根目录的父目录 → 待上传文件名
    pub uploads: OperationGroup,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.uploads.is_empty()
    }
}

/// 同步报告
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dest_files: usize,
    pub source_files: usize,
    pub delete_groups: usize,
    pub deleted_files: usize,
    pub upload_groups: usize,
    pub uploaded_files: usize,
    pub failed_groups: usize,
    pub errors: Vec<String>,
}

impl SyncReport {
    fn begin(started_at: DateTime<Utc>, plan: &SyncPlan) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            dest_files: plan.dest_files,
            source_files: plan.source_files,
            delete_groups: 0,
            deleted_files: 0,
            upload_groups: 0,
            uploaded_files: 0,
            failed_groups: 0,
            errors: Vec::new(),
        }
    }

    fn record(&mut self, err: SyncError) {
        let message = error_chain(&err);
        error!("{}", message);
        self.errors.push(message);
    }

    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// 同步引擎
///
/// 流程是一条直线：登录 → 扫描目标 → 扫描源 → 删除 → 上传。
/// 登录和扫描失败会终止整个同步；单个目录的删除、建目录、复制失败
/// 只记录日志，继续处理其余目录。
pub struct SyncEngine {
    storage: Arc<dyn RemoteFs>,
    comparator: FileComparator,
    scanner: FileScanner,
}

impl SyncEngine {
    pub fn new(storage: Arc<dyn RemoteFs>, config: SyncConfig) -> Self {
        let progress = Arc::new(ScanProgress::new(config.show_progress));
        Self {
            storage,
            comparator: FileComparator::new(Namespaces::new(
                config.source_root,
                config.destination_root,
            )),
            scanner: FileScanner::new(config.max_concurrent_lookups, progress),
        }
    }

    fn namespaces(&self) -> &Namespaces {
        self.comparator.namespaces()
    }

    /// 登录并扫描两棵树，返回待执行的操作
    pub async fn analyze(&self) -> SyncResult<SyncPlan> {
        self.storage.authenticate().await.map_err(SyncError::Auth)?;
        info!("已登录 {}", self.storage.name());

        let (dest_tree, source_tree) = self.scan_both().await?;

        let deletions = self.comparator.compute_deletions(&dest_tree, &source_tree);
        let uploads = self.comparator.compute_uploads(&dest_tree, &source_tree);

        Ok(SyncPlan {
            dest_files: dest_tree.len(),
            source_files: source_tree.len(),
            deletions,
            uploads,
        })
    }

    async fn scan_both(&self) -> SyncResult<(FlatTree, FlatTree)> {
        let storage = self.storage.as_ref();

        info!("开始扫描目标文件");
        let dest_tree = self
            .scanner
            .scan_tree(storage, self.namespaces().destination_root())
            .await?;
        info!("共找到 {} 个目标文件", dest_tree.len());

        info!("开始扫描源文件");
        let source_tree = self
            .scanner
            .scan_tree(storage, self.namespaces().source_root())
            .await?;
        info!("共找到 {} 个源文件", source_tree.len());

        Ok((dest_tree, source_tree))
    }

    /// 执行同步
    pub async fn run(&self) -> SyncResult<SyncReport> {
        let started_at = Utc::now();
        let plan = self.analyze().await?;
        let mut report = SyncReport::begin(started_at, &plan);

        self.delete_files(&plan.deletions, &mut report).await;
        self.upload_files(&plan.uploads, &mut report).await;

        report.finished_at = Utc::now();
        info!(
            "同步结束: 删除 {} 个目录中的 {} 个文件, 上传 {} 个目录中的 {} 个文件, {} 个目录失败, 耗时 {}s",
            report.delete_groups,
            report.deleted_files,
            report.upload_groups,
            report.uploaded_files,
            report.failed_groups,
            report.duration_secs()
        );
        Ok(report)
    }

    async fn delete_files(&self, deletions: &OperationGroup, report: &mut SyncReport) {
        info!(
            "共 {} 个目录、{} 个目标文件需要删除",
            deletions.len(),
            count_files(deletions)
        );

        for (dir, names) in deletions {
            debug!("删除 {} 中的 {:?}", dir, names);
            match self.storage.remove(dir, names).await {
                Ok(()) => {
                    report.delete_groups += 1;
                    report.deleted_files += names.len();
                }
                Err(source) => {
                    report.failed_groups += 1;
                    report.record(SyncError::Removal {
                        dir: dir.clone(),
                        source,
                    });
                }
            }
        }

        info!(
            "============ 已删除 {} 个目录中的 {} 个文件 ============",
            report.delete_groups, report.deleted_files
        );
    }

    async fn upload_files(&self, uploads: &OperationGroup, report: &mut SyncReport) {
        info!(
            "共 {} 个目录、{} 个源文件需要上传",
            uploads.len(),
            count_files(uploads)
        );

        for (relative_dir, names) in uploads {
            let src = self.namespaces().source_dir(relative_dir);
            let dst = self.namespaces().destination_dir(relative_dir);

            // 建目录失败不阻止复制，目录可能已经存在
            if let Err(source) = self.storage.make_dir(&dst).await {
                warn!("创建目录 {} 失败，仍尝试复制", dst);
                report.record(SyncError::Directory {
                    path: dst.clone(),
                    source,
                });
            }

            debug!("复制 {} -> {}: {:?}", src, dst, names);
            match self.storage.copy(&src, &dst, names).await {
                Ok(()) => {
                    report.upload_groups += 1;
                    report.uploaded_files += names.len();
                }
                Err(source) => {
                    report.failed_groups += 1;
                    report.record(SyncError::Transfer {
                        from: src,
                        to: dst,
                        source,
                    });
                }
            }
        }

        info!(
            "============ 已上传 {} 个目录中的 {} 个文件 ============",
            report.upload_groups, report.uploaded_files
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryFs;

    fn engine(fs: &Arc<MemoryFs>) -> SyncEngine {
        SyncEngine::new(fs.clone(), SyncConfig::new("/data", "/remote"))
    }

    #[tokio::test]
    async fn test_analyze_does_not_modify() {
        let fs = Arc::new(
            MemoryFs::new()
                .with_file("/data/a.txt", 1)
                .with_file("/data/sub/b.txt", 1)
                .with_file("/remote/a.txt", 1)
                .with_file("/remote/old.txt", 1),
        );

        let plan = engine(&fs).analyze().await.unwrap();
        assert_eq!((plan.dest_files, plan.source_files), (2, 2));
        assert_eq!(count_files(&plan.deletions), 1);
        assert_eq!(count_files(&plan.uploads), 1);
        assert!(!plan.is_empty());

        assert!(fs
            .calls()
            .iter()
            .all(|c| c == "login" || c.starts_with("list ")));
    }

    #[tokio::test]
    async fn test_order_of_remote_calls() {
        let fs = Arc::new(
            MemoryFs::new()
                .with_file("/data/sub/b.txt", 1)
                .with_file("/remote/old.txt", 1),
        );

        engine(&fs).run().await.unwrap();

        assert_eq!(
            fs.calls(),
            vec![
                "login",
                "list /remote",
                "list /data",
                "list /data/sub",
                "remove /remote [old.txt]",
                "mkdir /remote/sub",
                "copy /data/sub -> /remote/sub [b.txt]",
            ]
        );
    }

    #[tokio::test]
    async fn test_login_failure_is_fatal() {
        let fs = Arc::new(MemoryFs::new().with_dir("/data").fail_login());

        let err = engine(&fs).run().await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
        assert_eq!(fs.calls(), vec!["login"]);
    }

    #[tokio::test]
    async fn test_make_dir_failure_still_copies() {
        let fs = Arc::new(
            MemoryFs::new()
                .with_file("/data/sub/b.txt", 1)
                .with_dir("/remote/sub")
                .fail_make_dir("/remote/sub"),
        );

        let report = engine(&fs).run().await.unwrap();
        assert_eq!(report.uploaded_files, 1);
        assert_eq!(report.failed_groups, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(fs.files_under("/remote").contains("/remote/sub/b.txt"));
    }
}
