//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“流水线中间结果”解耦：
//! - `SourceImage` 表示用户选择的原始文件
//! - `CanonicalIcon` 表示裁剪确认后的 512×512 母版
//! - `SizedRaster` 表示由母版派生的某个目标尺寸
//! - `IconArchiveEntry` / `ExportedArchive` 表示打包阶段的产物
//!
//! 除 `SourceImage` 外都是值语义，按字节内容区分。

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use super::IconError;

/// 母版边长（像素）。
pub const CANONICAL_SIZE: u32 = 512;

/// 图标包下载文件名。
pub const ARCHIVE_FILE_NAME: &str = "nexus-icons.zip";

/// 图标包中的 ICO 文件名。
pub const ICO_FILE_NAME: &str = "favicon.ico";

/// ICO 内嵌图片的尺寸。
pub const ICO_SOURCE_SIZE: u32 = 32;

/// 固定导出尺寸与文件名（浏览器/系统按文件名约定查找图标）。
pub const ICON_TARGETS: [IconTarget; 5] = [
    IconTarget {
        size: 16,
        file_name: "favicon-16x16.png",
    },
    IconTarget {
        size: 32,
        file_name: "favicon-32x32.png",
    },
    IconTarget {
        size: 180,
        file_name: "apple-touch-icon.png",
    },
    IconTarget {
        size: 192,
        file_name: "android-chrome-192x192.png",
    },
    IconTarget {
        size: 512,
        file_name: "android-chrome-512x512.png",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconTarget {
    pub size: u32,
    pub file_name: &'static str,
}

/// 所有固定导出尺寸。
pub fn target_sizes() -> Vec<u32> {
    ICON_TARGETS.iter().map(|t| t.size).collect()
}

/// 用户选择/拖入的原始图片。
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// 原始文件字节。
    pub bytes: Vec<u8>,
    /// 声明的 MIME 类型（文件选择器或拖放提供；未知时为 `None`）。
    pub mime: Option<String>,
    /// 来源提示（用于日志与诊断）。
    pub source_hint: &'static str,
}

impl SourceImage {
    pub fn new(bytes: Vec<u8>, mime: Option<String>) -> Self {
        Self {
            bytes,
            mime,
            source_hint: "bytes",
        }
    }
}

/// 裁剪确认后的 512×512 RGBA 母版。
///
/// 创建后不可变；重新裁剪会整体替换，而不是原地修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalIcon {
    pixels: RgbaImage,
}

impl CanonicalIcon {
    pub(crate) fn from_pixels(pixels: RgbaImage) -> Result<Self, IconError> {
        if pixels.dimensions() != (CANONICAL_SIZE, CANONICAL_SIZE) {
            return Err(IconError::Internal(format!(
                "母版尺寸异常：{}x{}",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// 生成预览用的 PNG Data URL（favicon 与 app 图标预览共用）。
    pub fn preview_data_url(&self) -> Result<String, IconError> {
        let png = encode_png(&self.pixels, CompressionType::Fast)
            .map_err(|e| IconError::Encode(format!("预览 PNG 编码失败：{}", e)))?;
        Ok(format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(png)
        ))
    }
}

/// 由母版派生的某个目标尺寸。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedRaster {
    pub size: u32,
    pub pixels: RgbaImage,
}

impl SizedRaster {
    /// 编码为独立 PNG 字节流。
    pub fn to_png(&self, compression: CompressionType) -> Result<Vec<u8>, IconError> {
        encode_png(&self.pixels, compression).map_err(|e| IconError::Encode(format!(
            "{}x{} PNG 编码失败：{}",
            self.size, self.size, e
        )))
    }
}

/// 图标包中的一个文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconArchiveEntry {
    pub file_name: String,
    pub bytes: Bytes,
}

impl IconArchiveEntry {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// 打包完成、等待交付下载的图标包。
#[derive(Debug, Clone)]
pub struct ExportedArchive {
    pub file_name: &'static str,
    pub bytes: Bytes,
}

pub(crate) fn encode_png(
    pixels: &RgbaImage,
    compression: CompressionType,
) -> image::ImageResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    PngEncoder::new_with_quality(&mut cursor, compression, PngFilterType::Adaptive).write_image(
        pixels.as_raw(),
        pixels.width(),
        pixels.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(cursor.into_inner())
}
