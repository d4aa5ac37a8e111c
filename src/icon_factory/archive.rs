//! # 打包模块
//!
//! 将各尺寸 PNG 与 `favicon.ico` 打成单个 ZIP（每个条目独立 deflate 压缩，无目录层级）。
//! 同名条目后写覆盖先写，但保留首次出现的位置。

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::IconError;
use super::source::IconArchiveEntry;

/// 构建图标包 ZIP 字节。
pub fn build_archive(entries: &[IconArchiveEntry]) -> Result<Vec<u8>, IconError> {
    let entries = dedupe_last_write_wins(entries);

    for entry in &entries {
        if entry.file_name.is_empty()
            || entry.file_name.contains('/')
            || entry.file_name.contains('\\')
        {
            return Err(IconError::Packaging(format!(
                "非法文件名：{:?}",
                entry.file_name
            )));
        }
        if entry.bytes.is_empty() {
            return Err(IconError::Packaging(format!(
                "{} 内容为空",
                entry.file_name
            )));
        }
    }

    // 固定时间戳：相同条目产出相同字节
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in &entries {
        zip.start_file(entry.file_name.as_str(), options)
            .map_err(|e| IconError::Packaging(format!("写入 {} 失败：{}", entry.file_name, e)))?;
        zip.write_all(&entry.bytes)
            .map_err(|e| IconError::Packaging(format!("写入 {} 失败：{}", entry.file_name, e)))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| IconError::Packaging(format!("ZIP 收尾失败：{}", e)))?;
    let bytes = cursor.into_inner();

    log::debug!("📦 打包完成 - {} 个条目, {} bytes", entries.len(), bytes.len());

    Ok(bytes)
}

fn dedupe_last_write_wins(entries: &[IconArchiveEntry]) -> Vec<IconArchiveEntry> {
    let mut unique: Vec<IconArchiveEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match unique.iter_mut().find(|e| e.file_name == entry.file_name) {
            Some(existing) => {
                log::warn!("⚠️ 重复的图标包条目：{}，以后写入为准", entry.file_name);
                existing.bytes = entry.bytes.clone();
            }
            None => unique.push(entry.clone()),
        }
    }
    unique
}
