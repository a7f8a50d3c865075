use crate::core::path::join;
use crate::core::progress::ScanProgress;
use crate::error::{SyncError, SyncResult};
use crate::storage::{FileRecord, RemoteFs};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// 扁平化的文件树：绝对路径 → 文件条目，只包含文件，不包含目录
pub type FlatTree = HashMap<String, FileRecord>;

/// 文件扫描器
///
/// 递归列出一个目录树。兄弟子目录可以并发列出，每个分支返回自己的结果，
/// 由上层合并；任何一层列目录失败都会让整次扫描失败，已扫到的部分丢弃。
pub struct FileScanner {
    max_concurrent: usize,
    limiter: Semaphore,
    progress: Arc<ScanProgress>,
}

impl FileScanner {
    pub fn new(max_concurrent: usize, progress: Arc<ScanProgress>) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            max_concurrent,
            limiter: Semaphore::new(max_concurrent),
            progress,
        }
    }

    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    /// 扫描 `root` 下的全部文件
    pub async fn scan_tree(&self, storage: &dyn RemoteFs, root: &str) -> SyncResult<FlatTree> {
        info!("开始扫描: {} {}", storage.name(), root);
        self.progress.reset();

        let result = self.scan_dir(storage, root.to_string()).await;
        self.progress.finish();

        let tree = result?;
        info!("扫描完成: {} 下共 {} 个文件", root, tree.len());
        Ok(tree)
    }

    fn scan_dir<'a>(
        &'a self,
        storage: &'a dyn RemoteFs,
        dir: String,
    ) -> BoxFuture<'a, SyncResult<FlatTree>> {
        async move {
            let entries = {
                // 只在请求期间占用名额，递归前释放
                let _permit = self.limiter.acquire().await.ok();
                storage
                    .list(&dir)
                    .await
                    .map_err(|source| SyncError::Listing {
                        path: dir.clone(),
                        source,
                    })?
            };
            debug!("{}: {} 个条目", dir, entries.len());

            let mut files = FlatTree::new();
            let mut subdirs = Vec::new();
            for entry in entries {
                let path = join(&dir, &entry.name);
                if entry.is_dir {
                    subdirs.push(path);
                } else {
                    files.insert(path, entry);
                }
            }

            let mut branches = stream::iter(subdirs)
                .map(|sub| self.scan_dir(storage, sub))
                .buffered(self.max_concurrent);

            while let Some(subtree) = branches.try_next().await? {
                // 只统计合并进来的子目录结果，本层直接加入的文件不计数
                self.progress.advance(subtree.len());
                files.extend(subtree);
            }

            self.progress.report();
            Ok(files)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryFs;

    async fn logged_in(fs: MemoryFs) -> MemoryFs {
        fs.authenticate().await.unwrap();
        fs
    }

    fn sorted_keys(tree: &FlatTree) -> Vec<&str> {
        let mut keys: Vec<&str> = tree.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    #[tokio::test]
    async fn test_flattens_nested_tree() {
        let fs = logged_in(
            MemoryFs::new()
                .with_file("/data/a.txt", 1)
                .with_file("/data/sub/b.txt", 2)
                .with_file("/data/sub/deep/c.txt", 3)
                .with_dir("/data/empty"),
        )
        .await;
        let scanner = FileScanner::new(1, Arc::new(ScanProgress::silent()));

        let tree = scanner.scan_tree(&fs, "/data").await.unwrap();
        assert_eq!(
            sorted_keys(&tree),
            vec!["/data/a.txt", "/data/sub/b.txt", "/data/sub/deep/c.txt"]
        );
        assert_eq!(tree["/data/sub/b.txt"].size, 2);
        assert!(tree.values().all(|r| !r.is_dir));
    }

    #[tokio::test]
    async fn test_root_with_trailing_separator() {
        let fs = logged_in(MemoryFs::new().with_file("/data/sub/b.txt", 2)).await;
        let scanner = FileScanner::new(1, Arc::new(ScanProgress::silent()));

        let tree = scanner.scan_tree(&fs, "/data/").await.unwrap();
        assert_eq!(sorted_keys(&tree), vec!["/data/sub/b.txt"]);
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let fs = logged_in(MemoryFs::new().with_dir("/data")).await;
        let scanner = FileScanner::new(1, Arc::new(ScanProgress::silent()));

        assert!(scanner.scan_tree(&fs, "/data").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nested_failure_aborts_scan() {
        let fs = logged_in(
            MemoryFs::new()
                .with_file("/r/top.txt", 1)
                .with_file("/r/a/one.txt", 1)
                .with_file("/r/a/b/two.txt", 1)
                .with_file("/r/a/b/c/three.txt", 1)
                .fail_list_on_call(3),
        )
        .await;
        let scanner = FileScanner::new(1, Arc::new(ScanProgress::silent()));

        let err = scanner.scan_tree(&fs, "/r").await.unwrap_err();
        match err {
            SyncError::Listing { path, .. } => assert_eq!(path, "/r/a/b"),
            other => panic!("unexpected error: {other:?}"),
        }
        // 失败后不再继续向下列目录
        assert_eq!(fs.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_root_is_listing_error() {
        let fs = logged_in(MemoryFs::new()).await;
        let scanner = FileScanner::new(1, Arc::new(ScanProgress::silent()));

        let err = scanner.scan_tree(&fs, "/nope").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_progress_counts_only_merged_subtrees() {
        let fs = logged_in(
            MemoryFs::new()
                .with_file("/data/a.txt", 1)
                .with_file("/data/b.txt", 1)
                .with_file("/data/sub/c.txt", 1),
        )
        .await;
        let progress = Arc::new(ScanProgress::silent());
        let scanner = FileScanner::new(1, progress.clone());

        let tree = scanner.scan_tree(&fs, "/data").await.unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(progress.discovered(), 1);

        // 下一轮扫描从零开始
        let fs = logged_in(MemoryFs::new().with_file("/x/y/z.txt", 1)).await;
        scanner.scan_tree(&fs, "/x").await.unwrap();
        assert_eq!(scanner.progress().discovered(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_scan_matches_sequential() {
        let mut fs = MemoryFs::new();
        for d in 0..6 {
            for f in 0..4 {
                fs = fs.with_file(&format!("/data/d{d}/n{f}/f{f}.bin"), f);
            }
        }
        let fs = logged_in(fs).await;

        let sequential = FileScanner::new(1, Arc::new(ScanProgress::silent()))
            .scan_tree(&fs, "/data")
            .await
            .unwrap();
        let concurrent = FileScanner::new(4, Arc::new(ScanProgress::silent()))
            .scan_tree(&fs, "/data")
            .await
            .unwrap();

        assert_eq!(sequential.len(), 24);
        assert_eq!(sequential, concurrent);
    }
}
