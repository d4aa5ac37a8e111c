//! # 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做入参接收与结果返回，不承载业务逻辑。
//! 所有实际处理交由 `IconFactory`，保持命令函数薄、稳定、易测试。
//! 前端与 CLI 共用同一组命令，错误统一为 `{ code, stage, message }`。

use std::path::Path;

use super::cropper::CropRegion;
use super::orchestrator::{ExportReport, FactoryStateKind};
use super::{IconAdvancedConfig, IconError, IconFactory, IconQualityProfile};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[error("{message}")]
pub struct FactoryCommandError {
    pub code: &'static str,
    pub stage: &'static str,
    pub message: String,
}

impl From<IconError> for FactoryCommandError {
    fn from(error: IconError) -> Self {
        Self {
            code: error.code(),
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

/// 前端预览所需的裁剪结果。
#[derive(Debug, Clone, serde::Serialize)]
pub struct CropPreview {
    pub width: u32,
    pub height: u32,
    pub data_url: String,
}

/// 选择本地图片并打开裁剪。
pub fn open_icon_file(
    factory: &IconFactory,
    path: &Path,
) -> Result<CropRegion, FactoryCommandError> {
    Ok(factory.select_path(path)?)
}

/// 拖放图片（原始字节 + 声明的 MIME）并打开裁剪。
pub fn open_dropped_icon(
    factory: &IconFactory,
    bytes: Vec<u8>,
    mime: Option<String>,
) -> Result<CropRegion, FactoryCommandError> {
    Ok(factory.select_bytes(bytes, mime)?)
}

/// 拖放图片（FileReader Data URL）并打开裁剪。
pub fn open_icon_data_url(
    factory: &IconFactory,
    data_url: &str,
) -> Result<CropRegion, FactoryCommandError> {
    Ok(factory.select_data_url(data_url)?)
}

pub fn update_crop_region(
    factory: &IconFactory,
    x: u32,
    y: u32,
    side: u32,
) -> Result<CropRegion, FactoryCommandError> {
    Ok(factory.set_crop_region(x, y, side)?)
}

/// 选中最大的居中正方形。
pub fn select_full_crop(factory: &IconFactory) -> Result<CropRegion, FactoryCommandError> {
    Ok(factory.select_all_crop()?)
}

/// 确认裁剪，返回预览 Data URL。
pub fn confirm_icon_crop(factory: &IconFactory) -> Result<CropPreview, FactoryCommandError> {
    let icon = factory.confirm_crop()?;
    Ok(CropPreview {
        width: icon.width(),
        height: icon.height(),
        data_url: icon.preview_data_url()?,
    })
}

pub fn cancel_icon_crop(factory: &IconFactory) -> Result<FactoryStateKind, FactoryCommandError> {
    Ok(factory.cancel_crop()?)
}

/// 生成并交付图标包。
pub async fn download_icon_pack(
    factory: &IconFactory,
) -> Result<ExportReport, FactoryCommandError> {
    Ok(factory.export().await?)
}

pub fn dismiss_icon_error(factory: &IconFactory) -> Result<FactoryStateKind, FactoryCommandError> {
    Ok(factory.acknowledge_error()?)
}

/// 切换图标质量档位。
pub fn set_icon_quality_profile(factory: &IconFactory, profile: &str) -> Result<(), AppError> {
    factory.set_quality_profile(IconQualityProfile::parse(profile)?)?;
    Ok(())
}

/// 查询当前生效档位。
pub fn get_icon_quality_profile(factory: &IconFactory) -> Result<String, AppError> {
    Ok(factory.quality_profile()?.as_str().to_string())
}

pub fn set_icon_advanced_config(
    factory: &IconFactory,
    config: IconAdvancedConfig,
) -> Result<(), AppError> {
    factory.set_advanced_config(config)?;
    Ok(())
}

pub fn get_icon_advanced_config(factory: &IconFactory) -> Result<IconAdvancedConfig, AppError> {
    Ok(factory.advanced_config()?)
}
