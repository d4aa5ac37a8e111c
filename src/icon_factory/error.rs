//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载图标工场链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 每个分支都有稳定的 `code()` 与 `stage()`，供前端/CLI 做结构化展示。

/// 图标工场统一错误类型。
///
/// 该类型会在命令层被上转为 `AppError`，最终透传给前端。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IconError {
    /// 文件声明类型不是图片，或字节签名/解码无法识别为位图。
    #[error("不支持的图片：{0}")]
    UnsupportedImage(String),

    /// 确认裁剪时没有任何活动选区。
    #[error("没有可用的裁剪选区")]
    NoActiveCrop,

    /// 某个目标尺寸降采样失败，整批作废。
    #[error("尺寸 {size}x{size} 降采样失败：{reason}")]
    Resample { size: u32, reason: String },

    #[error("ICO 编码失败：{0}")]
    Encode(String),

    #[error("打包失败：{0}")]
    Packaging(String),

    /// 已有导出任务在进行中。
    #[error("图标包正在生成中，请稍候")]
    ExportInProgress,

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    /// 配置项越界或无法识别。
    #[error("配置无效：{0}")]
    InvalidConfig(String),

    #[error("内部错误：{0}")]
    Internal(String),
}

impl IconError {
    /// 稳定错误码（前端按此分支处理，不依赖文案）。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedImage(_) => "E_UNSUPPORTED_IMAGE",
            Self::NoActiveCrop => "E_NO_ACTIVE_CROP",
            Self::Resample { .. } => "E_RESAMPLE",
            Self::Encode(_) => "E_ENCODE",
            Self::Packaging(_) => "E_PACKAGING",
            Self::ExportInProgress => "E_EXPORT_IN_PROGRESS",
            Self::Decode(_) => "E_DECODE",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::FileSystem(_) => "E_FILE_SYSTEM",
            Self::InvalidConfig(_) => "E_INVALID_CONFIG",
            Self::Internal(_) => "E_INTERNAL",
        }
    }

    /// 出错所在的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::UnsupportedImage(_) | Self::Decode(_) | Self::ResourceLimit(_) => "load",
            Self::NoActiveCrop => "crop",
            Self::Resample { .. } => "resample",
            Self::Encode(_) => "encode",
            Self::Packaging(_) => "package",
            Self::FileSystem(_) => "save",
            Self::InvalidConfig(_) => "config",
            Self::ExportInProgress | Self::Internal(_) => "state",
        }
    }
}
