//! # ICO 编码模块
//!
//! ## 二进制布局
//!
//! ```text
//! offset  size  field
//! ------  ----  -----------------------------------------------
//!      0     2  reserved        = 0
//!      2     2  type            = 1 (icon)
//!      4     2  count           = 1
//!      6     1  width           = 32   (0 表示 256)
//!      7     1  height          = 32
//!      8     1  palette count   = 0    (真彩色)
//!      9     1  reserved        = 0
//!     10     2  color planes    = 1
//!     12     2  bits per pixel  = 32
//!     14     4  data length     = PNG 字节长度
//!     18     4  data offset     = 22
//!     22     n  PNG 字节流
//! ```
//!
//! 所有多字节字段均为小端序。任何偏移/长度不一致都会导致部分系统静默拒绝该文件。

use image::codecs::png::CompressionType;

use super::IconError;
use super::source::{ICO_SOURCE_SIZE, SizedRaster};

const ICONDIR_LEN: usize = 6;
const ICONDIRENTRY_LEN: usize = 16;
/// 图片数据起始偏移（紧跟在目录头和唯一目录项之后）。
pub const ICO_IMAGE_OFFSET: u32 = (ICONDIR_LEN + ICONDIRENTRY_LEN) as u32;

const RESOURCE_TYPE_ICON: u16 = 1;
const COLOR_PLANES: u16 = 1;
const BITS_PER_PIXEL: u16 = 32;

/// 单图 ICO 容器（PNG 压缩）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcoContainer {
    bytes: Vec<u8>,
}

/// 32×32 栅格编码为 ICO。
pub fn encode_ico(
    raster: &SizedRaster,
    compression: CompressionType,
) -> Result<IcoContainer, IconError> {
    let (width, height) = raster.pixels.dimensions();
    if raster.size != ICO_SOURCE_SIZE || width != ICO_SOURCE_SIZE || height != ICO_SOURCE_SIZE {
        return Err(IconError::Encode(format!(
            "ICO 输入必须为 {0}x{0}，实际为 {1}x{2}",
            ICO_SOURCE_SIZE, width, height
        )));
    }

    let png = raster.to_png(compression)?;
    let png_len = u32::try_from(png.len())
        .map_err(|_| IconError::Encode("PNG 数据超过 ICO 长度字段上限".to_string()))?;

    let mut bytes = Vec::with_capacity(ICO_IMAGE_OFFSET as usize + png.len());

    // ICONDIR
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&RESOURCE_TYPE_ICON.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());

    // ICONDIRENTRY
    bytes.push(dimension_byte(width));
    bytes.push(dimension_byte(height));
    bytes.push(0);
    bytes.push(0);
    bytes.extend_from_slice(&COLOR_PLANES.to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
    bytes.extend_from_slice(&png_len.to_le_bytes());
    bytes.extend_from_slice(&ICO_IMAGE_OFFSET.to_le_bytes());

    debug_assert_eq!(bytes.len(), ICO_IMAGE_OFFSET as usize);
    bytes.extend_from_slice(&png);

    log::debug!("🧷 ICO 编码完成 - PNG {} bytes, 总计 {} bytes", png.len(), bytes.len());

    Ok(IcoContainer { bytes })
}

/// 目录项中的宽/高字节：256 记为 0。
fn dimension_byte(value: u32) -> u8 {
    if value >= 256 { 0 } else { value as u8 }
}

impl IcoContainer {
    /// 校验并包装已有 ICO 字节（仅支持本模块产出的单图 PNG 布局）。
    pub fn parse(bytes: Vec<u8>) -> Result<Self, IconError> {
        if bytes.len() < ICO_IMAGE_OFFSET as usize {
            return Err(IconError::Encode(format!(
                "ICO 数据过短：{} bytes",
                bytes.len()
            )));
        }

        let reserved = read_u16_le(&bytes, 0);
        let kind = read_u16_le(&bytes, 2);
        let count = read_u16_le(&bytes, 4);
        if reserved != 0 || kind != RESOURCE_TYPE_ICON || count != 1 {
            return Err(IconError::Encode(format!(
                "ICO 目录头异常：reserved={} type={} count={}",
                reserved, kind, count
            )));
        }

        let container = Self { bytes };
        let offset = container.image_offset() as usize;
        let len = container.image_len() as usize;
        let end = offset
            .checked_add(len)
            .ok_or_else(|| IconError::Encode("ICO 图片区间溢出".to_string()))?;
        if offset != ICO_IMAGE_OFFSET as usize || end != container.bytes.len() {
            return Err(IconError::Encode(format!(
                "ICO 图片区间不匹配：offset={} len={} total={}",
                offset,
                len,
                container.bytes.len()
            )));
        }
        Ok(container)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// 目录项宽度（0 表示 256）。
    pub fn width(&self) -> u32 {
        match self.bytes[6] {
            0 => 256,
            w => w as u32,
        }
    }

    pub fn height(&self) -> u32 {
        match self.bytes[7] {
            0 => 256,
            h => h as u32,
        }
    }

    pub fn bits_per_pixel(&self) -> u16 {
        read_u16_le(&self.bytes, 12)
    }

    pub fn image_len(&self) -> u32 {
        read_u32_le(&self.bytes, 14)
    }

    pub fn image_offset(&self) -> u32 {
        read_u32_le(&self.bytes, 18)
    }

    /// 内嵌的 PNG 字节流。
    pub fn embedded_png(&self) -> &[u8] {
        &self.bytes[ICO_IMAGE_OFFSET as usize..]
    }
}

fn read_u16_le(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32_le(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
