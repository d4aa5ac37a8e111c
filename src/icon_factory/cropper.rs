//! # 裁剪适配模块
//!
//! ## 设计思路
//!
//! 裁剪框是一个普通的可变值：每次拖动/缩放回调直接改写 `CropRegion`，
//! 并在每次更新时重新收敛到图片边界内，保证始终是 1:1 正方形。
//!
//! ## 实现思路
//!
//! - `begin_crop`：校验 + 解码源图，源字节随即丢弃，仅保留 RGBA 像素。
//! - 初始选区：居中、边长为短边 80%（与交互式裁剪器默认自动裁剪区域一致）。
//! - `confirm`：按选区裁剪后统一放缩到 512×512，允许放大。

use std::sync::Arc;

use image::RgbaImage;
use image::imageops;

use super::config::ResampleFilter;
use super::loader::validate_source;
use super::pipeline::{decode_source, resize_rgba};
use super::source::{CANONICAL_SIZE, CanonicalIcon, SourceImage};
use super::{IconConfig, IconError};

/// 初始自动裁剪区域占短边的比例。
const AUTO_CROP_AREA: f64 = 0.8;

/// 源图中的正方形选区。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

impl CropRegion {
    /// 构造并收敛到 `bounds` 内的正方形选区。
    ///
    /// 先限制边长（1 ~ 短边），再限制位置，保证选区完整落在图片内。
    pub fn clamped(x: u32, y: u32, side: u32, bounds: (u32, u32)) -> Self {
        let (width, height) = bounds;
        let max_side = width.min(height).max(1);
        let side = side.clamp(1, max_side);

        Self {
            x: x.min(width.saturating_sub(side)),
            y: y.min(height.saturating_sub(side)),
            side,
        }
    }

    /// 居中的默认选区。
    pub fn centered(bounds: (u32, u32)) -> Self {
        let (width, height) = bounds;
        let side = ((width.min(height) as f64 * AUTO_CROP_AREA).floor() as u32).max(1);
        Self::clamped(
            width.saturating_sub(side) / 2,
            height.saturating_sub(side) / 2,
            side,
            bounds,
        )
    }

    pub fn fits_within(&self, bounds: (u32, u32)) -> bool {
        self.side >= 1
            && self.x as u64 + self.side as u64 <= bounds.0 as u64
            && self.y as u64 + self.side as u64 <= bounds.1 as u64
    }
}

/// 一次交互式裁剪会话。
///
/// 同一时刻只存在一个会话，由编排器持有。克隆只复制选区，像素共享。
#[derive(Debug, Clone)]
pub struct CropSession {
    image: Arc<RgbaImage>,
    region: Option<CropRegion>,
    filter: ResampleFilter,
}

/// 打开裁剪会话：校验并解码源图，给出默认选区。
pub fn begin_crop(source: SourceImage, config: &IconConfig) -> Result<CropSession, IconError> {
    validate_source(&source)?;
    let decoded = decode_source(&source, config)?;
    let image = decoded.to_rgba8();
    let region = CropRegion::centered(image.dimensions());

    log::debug!(
        "✂️ 打开裁剪会话 - 源图 {}x{} 默认选区 ({}, {}, {})",
        image.width(),
        image.height(),
        region.x,
        region.y,
        region.side
    );

    Ok(CropSession {
        image: Arc::new(image),
        region: Some(region),
        filter: config.resample_filter,
    })
}

impl CropSession {
    pub fn image_dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn region(&self) -> Option<CropRegion> {
        self.region
    }

    pub fn set_region(&mut self, x: u32, y: u32, side: u32) -> CropRegion {
        let region = CropRegion::clamped(x, y, side, self.image_dimensions());
        self.region = Some(region);
        region
    }

    /// 拖动选区（保持边长）。
    pub fn move_to(&mut self, x: u32, y: u32) -> CropRegion {
        let side = self
            .region
            .map(|r| r.side)
            .unwrap_or_else(|| CropRegion::centered(self.image_dimensions()).side);
        self.set_region(x, y, side)
    }

    /// 缩放选区（保持左上角，越界时整体回推）。
    pub fn resize_to(&mut self, side: u32) -> CropRegion {
        let (x, y) = self.region.map(|r| (r.x, r.y)).unwrap_or((0, 0));
        self.set_region(x, y, side)
    }

    /// 选中最大的居中正方形。
    pub fn select_all(&mut self) -> CropRegion {
        let (width, height) = self.image_dimensions();
        let side = width.min(height);
        self.set_region((width - side) / 2, (height - side) / 2, side)
    }

    pub fn clear_region(&mut self) {
        self.region = None;
    }

    /// 同一源图且选区未变。
    pub(crate) fn same_selection(&self, other: &CropSession) -> bool {
        Arc::ptr_eq(&self.image, &other.image) && self.region == other.region
    }

    /// 按当前选区生成 512×512 母版。
    pub fn confirm(&self) -> Result<CanonicalIcon, IconError> {
        let region = self.region.ok_or(IconError::NoActiveCrop)?;
        if !region.fits_within(self.image_dimensions()) {
            return Err(IconError::NoActiveCrop);
        }

        let cropped = imageops::crop_imm(&*self.image, region.x, region.y, region.side, region.side)
            .to_image();
        let pixels = resize_rgba(&cropped, CANONICAL_SIZE, CANONICAL_SIZE, self.filter)
            .map_err(|e| IconError::Internal(format!("裁剪放缩失败：{}", e)))?;

        log::info!(
            "✅ 裁剪完成 - 选区 ({}, {}, {}) -> {}x{}",
            region.x,
            region.y,
            region.side,
            CANONICAL_SIZE,
            CANONICAL_SIZE
        );

        CanonicalIcon::from_pixels(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use proptest::prelude::*;
    use std::io::Cursor;

    fn png_source(width: u32, height: u32) -> SourceImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, 128, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        SourceImage::new(cursor.into_inner(), Some("image/png".to_string()))
    }

    #[test]
    fn default_region_is_centered_square() {
        let region = CropRegion::centered((1000, 500));
        assert_eq!(
            region,
            CropRegion {
                x: 300,
                y: 50,
                side: 400,
            }
        );
    }

    #[test]
    fn clamped_pulls_region_back_inside() {
        let region = CropRegion::clamped(900, 900, 400, (1000, 600));
        assert_eq!(
            region,
            CropRegion {
                x: 600,
                y: 200,
                side: 400,
            }
        );

        let oversized = CropRegion::clamped(0, 0, 5000, (1000, 600));
        assert_eq!(oversized.side, 600);
    }

    #[test]
    fn tiny_image_still_has_region() {
        let region = CropRegion::centered((1, 1));
        assert_eq!(
            region,
            CropRegion {
                x: 0,
                y: 0,
                side: 1,
            }
        );
    }

    #[test]
    fn confirm_yields_canonical_size_for_small_and_large_regions() {
        let mut session = begin_crop(png_source(120, 80), &IconConfig::default()).expect("begin");

        let small = session.set_region(10, 10, 20);
        assert_eq!(small.side, 20);
        let icon = session.confirm().expect("confirm small region");
        assert_eq!((icon.width(), icon.height()), (512, 512));

        session.select_all();
        let icon = session.confirm().expect("confirm full region");
        assert_eq!((icon.width(), icon.height()), (512, 512));
    }

    #[test]
    fn confirm_without_region_fails() {
        let mut session = begin_crop(png_source(64, 64), &IconConfig::default()).expect("begin");
        session.clear_region();

        assert_eq!(session.confirm(), Err(IconError::NoActiveCrop));
    }

    #[test]
    fn cloned_session_tracks_selection_changes() {
        let mut session = begin_crop(png_source(90, 90), &IconConfig::default()).expect("begin");
        let snapshot = session.clone();
        assert!(session.same_selection(&snapshot));

        session.move_to(0, 0);
        assert!(!session.same_selection(&snapshot));

        let other = begin_crop(png_source(90, 90), &IconConfig::default()).expect("begin");
        assert!(!other.same_selection(&snapshot));
    }

    #[test]
    fn move_and_resize_keep_square_inside_bounds() {
        let mut session = begin_crop(png_source(200, 100), &IconConfig::default()).expect("begin");

        let moved = session.move_to(190, 90);
        assert!(moved.fits_within((200, 100)));

        let resized = session.resize_to(150);
        assert_eq!(resized.side, 100);
        assert!(resized.fits_within((200, 100)));
    }

    #[test]
    fn non_image_source_is_rejected() {
        let source = SourceImage::new(b"hello world".to_vec(), Some("text/plain".to_string()));
        let result = begin_crop(source, &IconConfig::default());
        assert!(matches!(result, Err(IconError::UnsupportedImage(_))));
    }

    proptest! {
        #[test]
        fn clamped_region_is_always_square_and_inside(
            x in 0u32..5000,
            y in 0u32..5000,
            side in 0u32..5000,
            width in 1u32..3000,
            height in 1u32..3000,
        ) {
            let region = CropRegion::clamped(x, y, side, (width, height));
            prop_assert!(region.fits_within((width, height)));
            prop_assert!(region.side <= width.min(height));
        }
    }
}
