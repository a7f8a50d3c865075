//! 路径工具
//!
//! 远程路径统一使用 `/` 分隔。这里的函数都是纯字符串操作：
//! 不访问文件系统，不解析 `.` / `..`，对任何输入都返回确定的结果。

/// 拼接两段路径，合并重复的 `/`，去掉末尾的 `/`（根路径 `/` 除外）
///
/// 空段会被忽略，两段都为空时返回空字符串。
pub fn join(base: &str, tail: &str) -> String {
    let mut joined = String::with_capacity(base.len() + tail.len() + 1);
    for part in [base, tail] {
        if part.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push('/');
        }
        joined.push_str(part);
    }
    collapse_separators(&joined)
}

fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// 在最后一个 `/` 之后切分，目录部分保留末尾的 `/`
///
/// `"/remote/old.txt"` → `("/remote/", "old.txt")`，`"a.txt"` → `("", "a.txt")`
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// 去掉字面前缀；不检查分隔符边界，前缀不匹配时原样返回
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}

/// 源目录与目标目录这一对命名空间
///
/// 在一次同步中两个根目录保持不变，所有路径换算都以它们为基准。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    source_root: String,
    destination_root: String,
}

impl Namespaces {
    pub fn new(source_root: impl Into<String>, destination_root: impl Into<String>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
        }
    }

    pub fn source_root(&self) -> &str {
        &self.source_root
    }

    pub fn destination_root(&self) -> &str {
        &self.destination_root
    }

    /// 源路径 → 目标路径
    pub fn to_destination(&self, source_path: &str) -> String {
        join(
            &self.destination_root,
            strip_prefix(source_path, &self.source_root),
        )
    }

    /// 目标路径 → 源路径
    pub fn to_source(&self, destination_path: &str) -> String {
        join(
            &self.source_root,
            strip_prefix(destination_path, &self.destination_root),
        )
    }

    /// 源路径相对于源根目录的部分，不带开头的 `/`
    pub fn relative_to_source<'a>(&self, source_path: &'a str) -> &'a str {
        strip_prefix(source_path, &self.source_root).trim_start_matches('/')
    }

    /// 相对目录在源端的绝对路径
    pub fn source_dir(&self, relative_dir: &str) -> String {
        join(&self.source_root, relative_dir)
    }

    /// 相对目录在目标端的绝对路径
    pub fn destination_dir(&self, relative_dir: &str) -> String {
        join(&self.destination_root, relative_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join("/remote", "a.txt"), "/remote/a.txt");
        assert_eq!(join("/remote/", "/a.txt"), "/remote/a.txt");
        assert_eq!(join("/remote", ""), "/remote");
        assert_eq!(join("/remote/", ""), "/remote");
        assert_eq!(join("", "sub"), "sub");
        assert_eq!(join("", ""), "");
        assert_eq!(join("/", ""), "/");
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("//x///y", "z//"), "/x/y/z");
    }

    #[test]
    fn test_join_keeps_dot_segments() {
        assert_eq!(join("/data", "../etc"), "/data/../etc");
        assert_eq!(join("/data/.", "a"), "/data/./a");
    }

    #[test]
    fn test_split() {
        assert_eq!(split("/remote/old.txt"), ("/remote/", "old.txt"));
        assert_eq!(split("sub/b.txt"), ("sub/", "b.txt"));
        assert_eq!(split("a.txt"), ("", "a.txt"));
        assert_eq!(split("/a.txt"), ("/", "a.txt"));
        assert_eq!(split("/dir/"), ("/dir/", ""));
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("/data/a.txt", "/data"), "/a.txt");
        assert_eq!(strip_prefix("/other/a.txt", "/data"), "/other/a.txt");
        assert_eq!(strip_prefix("/data", "/data"), "");
    }

    #[test]
    fn test_namespace_translation() {
        let ns = Namespaces::new("/data", "/remote");
        assert_eq!(ns.to_destination("/data/sub/b.txt"), "/remote/sub/b.txt");
        assert_eq!(ns.to_source("/remote/old.txt"), "/data/old.txt");
        assert_eq!(ns.relative_to_source("/data/sub/b.txt"), "sub/b.txt");
        assert_eq!(ns.source_dir("sub/"), "/data/sub");
        assert_eq!(ns.destination_dir(""), "/remote");
    }

    #[test]
    fn test_roots_with_trailing_separator() {
        let ns = Namespaces::new("/data/", "/remote/");
        assert_eq!(ns.to_destination("/data/a.txt"), "/remote/a.txt");
        assert_eq!(ns.to_source("/remote/a.txt"), "/data/a.txt");
    }

    // 前缀按字面去除：/data 会匹配 /data2 下的路径
    #[test]
    fn test_literal_prefix_matches_sibling_directory() {
        let ns = Namespaces::new("/data", "/remote");
        assert_eq!(ns.to_destination("/data2/x.txt"), "/remote/2/x.txt");
        assert_eq!(ns.relative_to_source("/data2/x.txt"), "2/x.txt");
    }

    #[test]
    fn test_unrelated_path_is_still_joined() {
        let ns = Namespaces::new("/data", "/remote");
        assert_eq!(ns.to_destination("/elsewhere/x"), "/remote/elsewhere/x");
    }
}
