//! 图标包输出目录管理模块
//!
//! # 设计思路
//!
//! 统一管理图标包的落盘位置，支持用户自定义目录，
//! 并在目录不存在时自动创建。
//!
//! # 实现思路
//!
//! - 优先使用显式传入的目录，其次是设置中的目录。
//! - 都未设置时回退到系统下载目录，再回退到当前工作目录。
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::icon_factory::{ArchiveSink, ExportedArchive, IconError};

/// 获取图标包输出目录
///
/// # 参数
/// * `explicit_dir` - 本次调用显式指定的目录（可选）
/// * `settings_dir` - 设置文件中的目录（可选）
///
/// # 返回
/// - `Ok(PathBuf)` — 可用的输出目录
/// - `Err(AppError::Storage)` — 无法获取或创建目录
pub fn resolve_output_dir(
    explicit_dir: Option<&Path>,
    settings_dir: Option<&Path>,
) -> Result<PathBuf, AppError> {
    let chosen = explicit_dir
        .or(settings_dir)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf);

    let dir = match chosen {
        Some(dir) => dir,
        None => match dirs::download_dir() {
            Some(dir) => dir,
            None => std::env::current_dir()
                .map_err(|e| AppError::Storage(format!("获取当前目录失败: {}", e)))?,
        },
    };

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::Storage(format!("创建输出目录 '{}' 失败: {}", dir.display(), e))
        })?;
    }
    Ok(dir)
}

/// 将图标包写入目录的下载交付方。
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArchiveSink for DirectorySink {
    fn save(&self, archive: &ExportedArchive) -> Result<PathBuf, IconError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| IconError::FileSystem(format!("创建输出目录失败: {}", e)))?;

        let target = self.dir.join(archive.file_name);
        fs::write(&target, &archive.bytes)
            .map_err(|e| IconError::FileSystem(format!("写入 {} 失败: {}", target.display(), e)))?;

        log::info!("💾 图标包已写入 {}（{} bytes）", target.display(), archive.bytes.len());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon_factory::ARCHIVE_FILE_NAME;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("nexus-icons-storage-{}-{}", tag, std::process::id()))
    }

    #[test]
    fn explicit_dir_wins_and_is_created() {
        let explicit = temp_dir("explicit");
        let settings = temp_dir("settings");
        let _ = fs::remove_dir_all(&explicit);

        let dir = resolve_output_dir(Some(&explicit), Some(&settings)).expect("resolve");
        assert_eq!(dir, explicit);
        assert!(dir.is_dir());

        let _ = fs::remove_dir_all(&explicit);
    }

    #[test]
    fn settings_dir_used_when_no_explicit_dir() {
        let settings = temp_dir("fallback");
        let dir = resolve_output_dir(None, Some(&settings)).expect("resolve");
        assert_eq!(dir, settings);

        let _ = fs::remove_dir_all(&settings);
    }

    #[test]
    fn directory_sink_overwrites_fixed_file_name() {
        let dir = temp_dir("sink");
        let sink = DirectorySink::new(&dir);

        for payload in [vec![1u8, 2, 3], vec![4u8]] {
            let archive = ExportedArchive {
                file_name: ARCHIVE_FILE_NAME,
                bytes: payload.clone().into(),
            };
            let path = sink.save(&archive).expect("save");
            assert_eq!(path, dir.join("nexus-icons.zip"));
            assert_eq!(fs::read(&path).expect("read back"), payload);
        }

        let _ = fs::remove_dir_all(&dir);
    }
}
