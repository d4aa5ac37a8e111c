//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `IconConfig`，保证运行时行为可观测、可调整、可测试。
//! 其中质量档位（quality / balanced / speed）作为高层语义，映射到底层参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置（面积平均降采样 + 默认 PNG 压缩）。
//! - `IconQualityProfile` 负责档位字符串解析与反向输出。
//! - `apply_quality_profile` 将档位转换为具体参数。
//! - `infer_quality_profile` 用于从当前配置反推档位（给前端展示状态）。
//! - `IconAdvancedConfig` 是资源上限的可持久化视图，写入前做范围校验。

use fast_image_resize as fr;
use image::codecs::png::CompressionType;

use super::IconError;

/// 降采样滤镜。
///
/// `Box` 在缩小时等价于面积平均，是默认选择。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleFilter {
    Box,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResampleFilter {
    pub(crate) fn to_fast_filter(self) -> fr::FilterType {
        match self {
            Self::Box => fr::FilterType::Box,
            Self::Bilinear => fr::FilterType::Bilinear,
            Self::CatmullRom => fr::FilterType::CatmullRom,
            Self::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

/// 图标处理配置。
///
/// 字段覆盖了读取、解码、降采样与 PNG 编码四个阶段。
#[derive(Debug, Clone)]
pub struct IconConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 降采样滤镜策略（裁剪放缩与多尺寸派生共用）。
    pub resample_filter: ResampleFilter,
    /// PNG 输出压缩级别。
    pub png_compression: CompressionType,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            resample_filter: ResampleFilter::Box,
            png_compression: CompressionType::Default,
        }
    }
}

/// 图标质量档位（面向产品/用户语义）。
///
/// - `Quality`：尽量保真
/// - `Balanced`：质量与性能平衡
/// - `Speed`：优先生成速度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconQualityProfile {
    Quality,
    Balanced,
    Speed,
}

impl IconQualityProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use nexus_icons::icon_factory::IconQualityProfile;
    ///
    /// let p = IconQualityProfile::parse("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), nexus_icons::icon_factory::IconError>(())
    /// ```
    pub fn parse(profile: &str) -> Result<Self, IconError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(IconError::InvalidConfig(format!(
                "未知质量档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    /// 将档位输出为稳定字符串，供前端展示与持久化。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl IconConfig {
    /// 基于当前参数反推质量档位。
    pub fn infer_quality_profile(&self) -> IconQualityProfile {
        match (self.resample_filter, self.png_compression) {
            (ResampleFilter::Lanczos3 | ResampleFilter::CatmullRom, CompressionType::Best) => {
                IconQualityProfile::Quality
            }
            (ResampleFilter::Bilinear, _) | (_, CompressionType::Fast) => IconQualityProfile::Speed,
            _ => IconQualityProfile::Balanced,
        }
    }

    /// 应用指定质量档位到实际参数。
    ///
    /// 只改滤镜与压缩，不触碰资源上限。
    pub fn apply_quality_profile(&mut self, profile: IconQualityProfile) {
        match profile {
            IconQualityProfile::Quality => {
                self.resample_filter = ResampleFilter::Lanczos3;
                self.png_compression = CompressionType::Best;
            }
            IconQualityProfile::Balanced => {
                self.resample_filter = ResampleFilter::Box;
                self.png_compression = CompressionType::Default;
            }
            IconQualityProfile::Speed => {
                self.resample_filter = ResampleFilter::Bilinear;
                self.png_compression = CompressionType::Fast;
            }
        }
    }
}

/// 资源上限的高级配置（设置文件 / 前端高级面板）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IconAdvancedConfig {
    pub max_file_size: u64,
    pub max_decoded_pixels: u64,
    pub max_decoded_bytes: u64,
}

impl IconAdvancedConfig {
    pub fn validate(&self) -> Result<(), IconError> {
        if !(1024 * 1024..=200 * 1024 * 1024).contains(&self.max_file_size) {
            return Err(IconError::InvalidConfig(
                "max_file_size 必须在 1MB~200MB 之间".to_string(),
            ));
        }
        if !(1_000_000..=100_000_000).contains(&self.max_decoded_pixels) {
            return Err(IconError::InvalidConfig(
                "max_decoded_pixels 必须在 100万~1亿 之间".to_string(),
            ));
        }
        if self.max_decoded_bytes < 8 * 1024 * 1024 {
            return Err(IconError::InvalidConfig(
                "max_decoded_bytes 不能小于 8MB".to_string(),
            ));
        }
        Ok(())
    }
}

impl IconConfig {
    pub fn advanced(&self) -> IconAdvancedConfig {
        IconAdvancedConfig {
            max_file_size: self.max_file_size,
            max_decoded_pixels: self.max_decoded_pixels,
            max_decoded_bytes: self.max_decoded_bytes,
        }
    }

    /// 校验后写入资源上限；校验失败时配置保持不变。
    pub fn apply_advanced(&mut self, advanced: IconAdvancedConfig) -> Result<(), IconError> {
        advanced.validate()?;
        self.max_file_size = advanced.max_file_size;
        self.max_decoded_pixels = advanced.max_decoded_pixels;
        self.max_decoded_bytes = advanced.max_decoded_bytes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_balanced() {
        let config = IconConfig::default();
        assert_eq!(config.infer_quality_profile(), IconQualityProfile::Balanced);
        assert_eq!(config.resample_filter, ResampleFilter::Box);
    }

    #[test]
    fn profile_apply_and_infer_roundtrip() {
        let mut config = IconConfig::default();
        for profile in [
            IconQualityProfile::Quality,
            IconQualityProfile::Speed,
            IconQualityProfile::Balanced,
        ] {
            config.apply_quality_profile(profile);
            assert_eq!(config.infer_quality_profile(), profile);
        }
    }

    #[test]
    fn profile_parse_is_case_insensitive() {
        assert_eq!(
            IconQualityProfile::parse("  Quality ").expect("parse"),
            IconQualityProfile::Quality
        );
        assert!(IconQualityProfile::parse("ultra").is_err());
    }

    #[test]
    fn advanced_config_rejects_out_of_range_values() {
        let mut config = IconConfig::default();
        let mut advanced = config.advanced();
        advanced.max_file_size = 10;

        assert!(matches!(
            config.apply_advanced(advanced),
            Err(IconError::InvalidConfig(_))
        ));
        assert_eq!(config.max_file_size, IconConfig::default().max_file_size);
    }

    #[test]
    fn advanced_config_applies_valid_values() {
        let mut config = IconConfig::default();
        let advanced = IconAdvancedConfig {
            max_file_size: 10 * 1024 * 1024,
            max_decoded_pixels: 20_000_000,
            max_decoded_bytes: 80 * 1024 * 1024,
        };
        config.apply_advanced(advanced).expect("valid advanced config");
        assert_eq!(config.advanced(), advanced);
    }
}
