use crate::core::path::{split, Namespaces};
use crate::core::scanner::FlatTree;
use std::collections::BTreeMap;
use tracing::debug;

/// 按父目录分组的操作：目录 → 该目录下需要处理的文件名
pub type OperationGroup = BTreeMap<String, Vec<String>>;

/// 分组中的文件总数
pub fn count_files(group: &OperationGroup) -> usize {
    group.values().map(Vec::len).sum()
}

/// 文件比较器
///
/// 只按路径是否存在比较，不看大小、时间或内容。两边都有的文件永远不动。
pub struct FileComparator {
    namespaces: Namespaces,
}

impl FileComparator {
    pub fn new(namespaces: Namespaces) -> Self {
        Self { namespaces }
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// 目标端有、源端没有的文件，按目标端的绝对父目录分组
    pub fn compute_deletions(&self, dest: &FlatTree, source: &FlatTree) -> OperationGroup {
        let mut group = OperationGroup::new();

        for path in sorted_paths(dest) {
            let source_path = self.namespaces.to_source(path);
            if source.contains_key(&source_path) {
                continue;
            }

            let (dir, name) = split(path);
            debug!("目标文件 {}{} 在源端不存在，加入删除列表", dir, name);
            group
                .entry(dir.to_string())
                .or_default()
                .push(name.to_string());
        }

        group
    }

    /// 源端有、目标端没有的文件，按相对源根目录的父目录分组
    pub fn compute_uploads(&self, dest: &FlatTree, source: &FlatTree) -> OperationGroup {
        let mut group = OperationGroup::new();

        for path in sorted_paths(source) {
            let dest_path = self.namespaces.to_destination(path);
            if dest.contains_key(&dest_path) {
                continue;
            }

            let (dir, name) = split(self.namespaces.relative_to_source(path));
            debug!("源文件 {}{} 在目标端不存在，加入上传列表", dir, name);
            group
                .entry(dir.to_string())
                .or_default()
                .push(name.to_string());
        }

        group
    }
}

fn sorted_paths(tree: &FlatTree) -> Vec<&str> {
    let mut paths: Vec<&str> = tree.keys().map(String::as_str).collect();
    paths.sort_unstable();
    paths
}
