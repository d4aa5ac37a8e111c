//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 设置、存储与 CLI 入口统一返回 `Result<T, AppError>`，
//! 前端通过 `Serialize` 获得结构化的错误信息。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `IconError` / `FactoryCommandError` / `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 输出 `{ code, stage, message }`，与命令层错误保持一致。

use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::icon_factory::{FactoryCommandError, IconError};

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图标工场错误（裁剪 / 派生 / 编码 / 打包）
    #[error("{0}")]
    Icon(#[from] IconError),

    /// 命令层已转换过的错误
    #[error("{0}")]
    Command(#[from] FactoryCommandError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件读写或解析失败
    #[error("设置错误: {0}")]
    Settings(String),

    /// 输出目录不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Icon(err) => err.code(),
            Self::Command(err) => err.code,
            Self::Io(_) => "E_IO",
            Self::Settings(_) => "E_SETTINGS",
            Self::Storage(_) => "E_STORAGE",
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::Icon(err) => err.stage(),
            Self::Command(err) => err.stage,
            Self::Io(_) | Self::Storage(_) => "save",
            Self::Settings(_) => "config",
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AppError", 3)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("stage", self.stage())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
