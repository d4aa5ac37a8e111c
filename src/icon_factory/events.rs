//! # 进度与提示事件
//!
//! 编排器在每个阶段向外发出 `FactoryEvent`，前端据此更新进度条或弹出提示（toast）。
//! 事件接收方是一个普通闭包，默认实现只写日志。

use std::sync::Arc;

use super::IconError;

/// 导出进度阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Resampling,
    Encoding,
    Packaging,
    Saving,
    Completed,
    Failed,
}

/// 提示级别（对应前端 toast 样式）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactoryEvent {
    /// 面向用户的一次性提示。
    Notice { level: NoticeLevel, message: String },
    /// 导出进度。
    Progress(ExportProgressPayload),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ExportProgressPayload {
    pub status: ExportStatus,
    pub progress: u8,
    pub size: Option<u32>,
    pub stage: Option<&'static str>,
    pub error_code: Option<&'static str>,
    pub error_message: Option<String>,
}

impl ExportProgressPayload {
    pub(crate) fn step(status: ExportStatus, progress: u8, size: Option<u32>) -> Self {
        Self {
            status,
            progress: progress.min(100),
            size,
            stage: None,
            error_code: None,
            error_message: None,
        }
    }

    pub(crate) fn failed(error: &IconError) -> Self {
        Self {
            status: ExportStatus::Failed,
            progress: 0,
            size: match error {
                IconError::Resample { size, .. } => Some(*size),
                _ => None,
            },
            stage: Some(error.stage()),
            error_code: Some(error.code()),
            error_message: Some(error.to_string()),
        }
    }
}

pub type EventSink = Arc<dyn Fn(FactoryEvent) + Send + Sync>;

/// 默认事件接收方：写日志。
pub fn log_event_sink() -> EventSink {
    Arc::new(|event: FactoryEvent| match event {
        FactoryEvent::Notice { level: NoticeLevel::Error, message } => {
            log::error!("🔔 {}", message)
        }
        FactoryEvent::Notice { message, .. } => log::info!("🔔 {}", message),
        FactoryEvent::Progress(payload) => log::debug!(
            "📈 导出进度 {:?} {}%{}",
            payload.status,
            payload.progress,
            payload.size.map(|s| format!(" ({0}x{0})", s)).unwrap_or_default()
        ),
    })
}
