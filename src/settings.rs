//! 图标工场设置
//!
//! 设置以 JSON 文件保存（质量档位、输出目录、资源上限）。
//! 文件不存在时视为默认设置；写入前先做范围校验，非法设置不会落盘。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::icon_factory::{IconAdvancedConfig, IconConfig, IconFactory, IconQualityProfile};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconSettings {
    /// `quality` / `balanced` / `speed`
    pub profile: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub advanced: Option<IconAdvancedConfig>,
}

impl IconSettings {
    /// 校验并应用到配置，失败时配置保持不变。
    pub fn apply_to(&self, config: &mut IconConfig) -> Result<(), AppError> {
        let mut next = config.clone();
        if let Some(profile) = self.profile.as_deref() {
            next.apply_quality_profile(IconQualityProfile::parse(profile)?);
        }
        if let Some(advanced) = self.advanced {
            next.apply_advanced(advanced)?;
        }
        *config = next;
        Ok(())
    }

    /// 应用到运行中的图标工场。
    pub fn apply_to_factory(&self, factory: &IconFactory) -> Result<(), AppError> {
        let profile = self
            .profile
            .as_deref()
            .map(IconQualityProfile::parse)
            .transpose()?;
        if let Some(advanced) = self.advanced {
            advanced.validate()?;
        }

        if let Some(profile) = profile {
            factory.set_quality_profile(profile)?;
        }
        if let Some(advanced) = self.advanced {
            factory.set_advanced_config(advanced)?;
        }
        Ok(())
    }
}

/// 默认设置文件位置：`<配置目录>/nexus-icons/settings.json`。
pub fn default_settings_path() -> Result<PathBuf, AppError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Settings("无法获取系统配置目录".to_string()))?;
    Ok(config_dir.join("nexus-icons").join(SETTINGS_FILE_NAME))
}

pub fn load_settings(path: &Path) -> Result<IconSettings, AppError> {
    if !path.exists() {
        return Ok(IconSettings::default());
    }

    let content = fs::read_to_string(path)?;
    let settings = serde_json::from_str::<IconSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;

    log::info!("⚙️ 已加载设置：{}", path.display());
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &IconSettings) -> Result<(), AppError> {
    // 先校验，避免非法值落盘
    settings.apply_to(&mut IconConfig::default())?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
        }
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon_factory::{IconError, ResampleFilter};

    fn temp_settings_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("nexus-icons-settings-{}-{}", tag, std::process::id()))
            .join(SETTINGS_FILE_NAME)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_settings(&temp_settings_path("missing")).expect("load");
        assert_eq!(settings, IconSettings::default());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let path = temp_settings_path("roundtrip");
        let settings = IconSettings {
            profile: Some("quality".into()),
            output_dir: Some(PathBuf::from("/tmp/icons")),
            advanced: None,
        };
        save_settings(&path, &settings).expect("save");
        assert_eq!(load_settings(&path).expect("load"), settings);

        let _ = fs::remove_dir_all(path.parent().expect("parent"));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let settings: IconSettings =
            serde_json::from_str(r#"{ "profile": "speed" }"#).expect("parse");
        let mut config = IconConfig::default();
        settings.apply_to(&mut config).expect("apply");
        assert_eq!(config.resample_filter, ResampleFilter::Bilinear);
    }

    #[test]
    fn invalid_settings_leave_config_untouched() {
        let settings = IconSettings {
            profile: Some("quality".into()),
            output_dir: None,
            advanced: Some(IconAdvancedConfig {
                max_file_size: 1,
                max_decoded_pixels: 1,
                max_decoded_bytes: 1,
            }),
        };
        let mut config = IconConfig::default();
        let result = settings.apply_to(&mut config);

        assert!(matches!(
            result,
            Err(AppError::Icon(IconError::InvalidConfig(_)))
        ));
        assert_eq!(config.resample_filter, ResampleFilter::Box);
    }

    #[test]
    fn apply_to_factory_switches_profile_and_limits() {
        use crate::icon_factory::{ArchiveSink, ExportedArchive};
        use std::sync::Arc;

        struct NullSink;
        impl ArchiveSink for NullSink {
            fn save(&self, archive: &ExportedArchive) -> Result<PathBuf, IconError> {
                Ok(PathBuf::from(archive.file_name))
            }
        }

        let factory = IconFactory::new(IconConfig::default(), Arc::new(NullSink));
        let advanced = IconAdvancedConfig {
            max_file_size: 5 * 1024 * 1024,
            max_decoded_pixels: 4_000_000,
            max_decoded_bytes: 16 * 1024 * 1024,
        };
        let settings = IconSettings {
            profile: Some("quality".into()),
            output_dir: None,
            advanced: Some(advanced),
        };

        settings.apply_to_factory(&factory).expect("apply");
        assert_eq!(factory.quality_profile().expect("profile"), IconQualityProfile::Quality);
        assert_eq!(factory.advanced_config().expect("advanced"), advanced);
    }
}
