//! 存储后端
//!
//! [`AssetStore`] 抽象了持久化层需要的三种操作：读取、写入、复制。
//! [`FsStore`] 直接操作文件系统；[`MemoryStore`] 把文件保存在内存中，
//! 用于无 I/O 的测试。

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 持久化后端
#[allow(async_fn_in_trait)]
pub trait AssetStore {
    /// 读取文件；文件不存在时返回 `Ok(None)`
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// 写入文件，必要时创建父目录
    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// 复制文件，必要时创建目标的父目录
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;
}

// ============================================================================
// 文件系统
// ============================================================================

/// 基于 `tokio::fs` 的文件系统存储
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl FsStore {
    async fn ensure_parent(path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                tokio::fs::create_dir_all(parent).await
            }
            _ => Ok(()),
        }
    }
}

impl AssetStore for FsStore {
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        Self::ensure_parent(path).await?;
        tokio::fs::write(path, contents).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        Self::ensure_parent(to).await?;
        tokio::fs::copy(from, to).await.map(|_| ())
    }
}

// ============================================================================
// 内存
// ============================================================================

/// 内存存储，记录写入次数
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个文件（不计入写入次数）
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl AsRef<[u8]>) -> Self {
        self.insert(path, contents);
        self
    }

    /// 直接放入文件（不计入写入次数）
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl AsRef<[u8]>) {
        self.files()
            .insert(path.into(), contents.as_ref().to_vec());
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files().get(path).cloned()
    }

    /// 以 UTF-8（有损）读取文件内容
    pub fn get_string(&self, path: &Path) -> Option<String> {
        self.get(path)
            .map(|contents| String::from_utf8_lossy(&contents).into_owned())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files().keys().cloned().collect()
    }

    /// 通过 [`AssetStore`] 发生的写入次数
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn files(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AssetStore for MemoryStore {
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        Ok(self.get(path))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.insert(path, contents);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let contents = self.get(from).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", from.display()),
            )
        })?;
        self.write(to, &contents).await
    }
}
