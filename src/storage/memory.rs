//! 内存中的远程文件系统
//!
//! 用于测试和离线演练：目录与文件保存在进程内，可以按调用注入失败，
//! 并记录每一次调用供断言使用。

use super::{FileRecord, RemoteFs};
use crate::core::path::{join, split};
use crate::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Tree {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, FileRecord>,
    logged_in: bool,
    list_calls: usize,
    journal: Vec<String>,
}

/// 注入的失败
#[derive(Debug, Default)]
struct Faults {
    login: bool,
    list_on_call: Option<usize>,
    list_paths: BTreeSet<String>,
    make_dir: BTreeSet<String>,
    copy_into: BTreeSet<String>,
    remove_in: BTreeSet<String>,
}

pub struct MemoryFs {
    tree: Mutex<Tree>,
    faults: Faults,
    name: String,
}

fn normalize(path: &str) -> String {
    join(path, "")
}

fn parent_of(path: &str) -> String {
    normalize(split(path).0)
}

fn leaf_of(path: &str) -> &str {
    split(path).1
}

impl Tree {
    fn add_dir_all(&mut self, path: &str) {
        let mut current = normalize(path);
        while !current.is_empty() && self.dirs.insert(current.clone()) {
            let parent = parent_of(&current);
            if parent == current {
                break;
            }
            current = parent;
        }
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut tree = Tree::default();
        tree.dirs.insert("/".to_string());
        Self {
            tree: Mutex::new(tree),
            faults: Faults::default(),
            name: "memory".to_string(),
        }
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tree_mut(&mut self) -> &mut Tree {
        self.tree.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// 添加一个文件，并补齐它的所有上级目录
    pub fn with_file(mut self, path: &str, size: u64) -> Self {
        let path = normalize(path);
        let tree = self.tree_mut();
        tree.add_dir_all(&parent_of(&path));
        tree.files
            .insert(path.clone(), FileRecord::file(leaf_of(&path), size));
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.tree_mut().add_dir_all(path);
        self
    }

    pub fn fail_login(mut self) -> Self {
        self.faults.login = true;
        self
    }

    /// 第 `n` 次（从 1 开始）列目录调用失败
    pub fn fail_list_on_call(mut self, n: usize) -> Self {
        self.faults.list_on_call = Some(n);
        self
    }

    pub fn fail_list_of(mut self, path: &str) -> Self {
        self.faults.list_paths.insert(normalize(path));
        self
    }

    pub fn fail_make_dir(mut self, path: &str) -> Self {
        self.faults.make_dir.insert(normalize(path));
        self
    }

    pub fn fail_copy_into(mut self, dir: &str) -> Self {
        self.faults.copy_into.insert(normalize(dir));
        self
    }

    pub fn fail_remove_in(mut self, dir: &str) -> Self {
        self.faults.remove_in.insert(normalize(dir));
        self
    }

    /// 所有调用记录，按发生顺序
    pub fn calls(&self) -> Vec<String> {
        self.tree().journal.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.tree().list_calls
    }

    /// `root` 之下的全部文件路径
    pub fn files_under(&self, root: &str) -> BTreeSet<String> {
        let root = normalize(root);
        let prefix = if root.ends_with('/') {
            root
        } else {
            format!("{}/", root)
        };
        self.tree()
            .files
            .keys()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.tree().dirs.contains(&normalize(path))
    }

    fn check_login(tree: &Tree) -> RemoteResult<()> {
        if tree.logged_in {
            Ok(())
        } else {
            Err(RemoteError::NotLoggedIn)
        }
    }
}

#[async_trait]
impl RemoteFs for MemoryFs {
    async fn authenticate(&self) -> RemoteResult<()> {
        let mut tree = self.tree();
        tree.journal.push("login".to_string());
        if self.faults.login {
            return Err(RemoteError::Api {
                code: 400,
                message: "password is incorrect".to_string(),
            });
        }
        tree.logged_in = true;
        Ok(())
    }

    async fn list(&self, path: &str) -> RemoteResult<Vec<FileRecord>> {
        let path = normalize(path);
        let mut tree = self.tree();
        Self::check_login(&tree)?;
        tree.list_calls += 1;
        tree.journal.push(format!("list {}", path));

        if self.faults.list_on_call == Some(tree.list_calls) || self.faults.list_paths.contains(&path) {
            return Err(RemoteError::Rejected(format!("注入的列目录失败: {}", path)));
        }
        if !tree.dirs.contains(&path) {
            return Err(RemoteError::NotFound(path));
        }

        let mut entries: Vec<FileRecord> = tree
            .dirs
            .iter()
            .filter(|d| **d != path && parent_of(d) == path)
            .map(|d| FileRecord::dir(leaf_of(d)))
            .collect();
        entries.extend(
            tree.files
                .iter()
                .filter(|(p, _)| parent_of(p) == path)
                .map(|(_, record)| record.clone()),
        );
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn make_dir(&self, path: &str) -> RemoteResult<()> {
        let path = normalize(path);
        let mut tree = self.tree();
        Self::check_login(&tree)?;
        tree.journal.push(format!("mkdir {}", path));

        if self.faults.make_dir.contains(&path) {
            return Err(RemoteError::Rejected(format!("注入的创建目录失败: {}", path)));
        }
        tree.add_dir_all(&path);
        Ok(())
    }

    async fn copy(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> RemoteResult<()> {
        let (src_dir, dst_dir) = (normalize(src_dir), normalize(dst_dir));
        let mut tree = self.tree();
        Self::check_login(&tree)?;
        tree.journal
            .push(format!("copy {} -> {} [{}]", src_dir, dst_dir, names.join(",")));

        if self.faults.copy_into.contains(&dst_dir) {
            return Err(RemoteError::Rejected(format!("注入的复制失败: {}", dst_dir)));
        }
        if !tree.dirs.contains(&dst_dir) {
            return Err(RemoteError::NotFound(dst_dir));
        }

        let mut copied = Vec::with_capacity(names.len());
        for name in names {
            let from = join(&src_dir, name);
            let record = tree
                .files
                .get(&from)
                .cloned()
                .ok_or_else(|| RemoteError::NotFound(from.clone()))?;
            copied.push((join(&dst_dir, name), record));
        }
        tree.files.extend(copied);
        Ok(())
    }

    async fn remove(&self, dir: &str, names: &[String]) -> RemoteResult<()> {
        let dir = normalize(dir);
        let mut tree = self.tree();
        Self::check_login(&tree)?;
        tree.journal
            .push(format!("remove {} [{}]", dir, names.join(",")));

        if self.faults.remove_in.contains(&dir) {
            return Err(RemoteError::Rejected(format!("注入的删除失败: {}", dir)));
        }
        for name in names {
            let target = join(&dir, name);
            if tree.files.remove(&target).is_none() {
                let nested = format!("{}/", target);
                tree.dirs.retain(|d| *d != target && !d.starts_with(&nested));
                tree.files.retain(|p, _| !p.starts_with(&nested));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
