//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（本地文件 / 拖放字节 / Data URL）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是在进入裁剪状态之前就拒绝非图片输入。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取，MIME 由文件签名推断。
//! - 拖放字节：沿用调用方声明的 MIME，要求 `image/*`。
//! - Data URL：解析 `data:<mime>;base64,` 前缀 + 解码前体积估算。
//! - 最终统一经过 `validate_source`：声明类型 + 文件签名双重校验。

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};

use super::source::SourceImage;
use super::{IconConfig, IconError};

/// 从本地路径加载图片（文件选择器等价入口）。
pub fn load_from_file(path: &Path, config: &IconConfig) -> Result<SourceImage, IconError> {
    log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

    if !path.exists() {
        return Err(IconError::FileSystem(format!(
            "文件不存在：{}",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| IconError::FileSystem(format!("无法读取文件信息：{}", e)))?;

    if metadata.len() > config.max_file_size {
        return Err(IconError::ResourceLimit(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            metadata.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| IconError::FileSystem(format!("无法读取图片文件：{}", e)))?;
    let mime = infer::get(&bytes).map(|kind| kind.mime_type().to_string());

    let source = SourceImage {
        bytes,
        mime,
        source_hint: "file",
    };
    validate_source(&source)?;
    Ok(source)
}

/// 从拖放/内存字节加载图片，`mime` 为浏览器声明的文件类型。
pub fn load_from_bytes(
    bytes: Vec<u8>,
    mime: Option<String>,
    config: &IconConfig,
) -> Result<SourceImage, IconError> {
    if bytes.len() as u64 > config.max_file_size {
        return Err(IconError::ResourceLimit(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            bytes.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let source = SourceImage {
        bytes,
        mime,
        source_hint: "drop",
    };
    validate_source(&source)?;
    Ok(source)
}

/// 从 `data:image/...;base64,` 形式加载图片。
pub fn load_from_data_url(data: &str, config: &IconConfig) -> Result<SourceImage, IconError> {
    log::info!("📝 开始处理 Data URL 图片");

    let normalized = data.trim();
    let rest = normalized
        .strip_prefix("data:")
        .ok_or_else(|| IconError::UnsupportedImage("无效的 Data URL".to_string()))?;
    let marker = rest
        .find(";base64,")
        .ok_or_else(|| IconError::UnsupportedImage("缺少 base64 标记".to_string()))?;

    let mime = rest[..marker].to_string();
    if !mime.starts_with("image/") {
        return Err(IconError::UnsupportedImage(format!("不是图片类型：{}", mime)));
    }

    let payload = &rest[marker + 8..];
    let estimated_len = estimate_base64_decoded_upper_bound_len(payload)?;
    if estimated_len > config.max_file_size {
        return Err(IconError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| IconError::Decode(format!("Base64 解码失败：{}", e)))?;

    let source = SourceImage {
        bytes,
        mime: Some(mime),
        source_hint: "data-url",
    };
    validate_source(&source)?;
    Ok(source)
}

/// 声明类型 + 文件签名双重校验。
///
/// 声明类型缺失时只看签名；二者任一不是图片都视为不支持。
pub fn validate_source(source: &SourceImage) -> Result<(), IconError> {
    if let Some(mime) = source.mime.as_deref() {
        if !mime.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(IconError::UnsupportedImage(format!("不是图片类型：{}", mime)));
        }
    }

    validate_image_signature(&source.bytes)
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, IconError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| IconError::ResourceLimit("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| IconError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), IconError> {
    if bytes.is_empty() {
        return Err(IconError::UnsupportedImage("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| IconError::UnsupportedImage("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(IconError::UnsupportedImage(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}
