//! # 图标工场模块（icon_factory）
//!
//! ## 设计思路
//!
//! 该模块将“选图校验 → 交互裁剪 → 多尺寸派生 → ICO 编码 → 打包下载”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `commands`：仅做入参/出参适配（薄封装）
//! - `orchestrator`：状态机与导出编排（`IconFactory`）
//! - `loader`：文件 / 拖放字节 / Data URL 加载与类型校验
//! - `pipeline`：解码、像素限制、放缩
//! - `cropper`：正方形选区与 512×512 母版生成
//! - `resampler`：从母版派生固定尺寸
//! - `ico`：单图 PNG 压缩 ICO 容器
//! - `archive`：ZIP 打包
//! - `config/error/source/events`：配置、错误、中间数据模型、进度事件
//!
//! ## 新同事快速上手
//!
//! ```text
//! 前端 / CLI
//!    ↓
//! commands.rs（参数适配）
//!    ↓
//! orchestrator.rs（状态机 + 阶段耗时日志）
//!    ├─ loader.rs → cropper.rs（选图 + 裁剪，生成母版）
//!    ├─ resampler.rs（5 个尺寸并发派生）
//!    ├─ ico.rs（32×32 → favicon.ico）
//!    └─ archive.rs（nexus-icons.zip）
//!    ↓
//! ArchiveSink（交付下载）
//! ```
//!
//! ## 分层职责建议
//!
//! - 调用入口变更优先改 `commands.rs`
//! - 配置与策略变更优先改 `config.rs`
//! - 状态迁移或导出顺序变更优先改 `orchestrator.rs`
//! - 单阶段行为优化分别改 `cropper/resampler/ico/archive`

pub mod archive;
pub mod commands;
mod config;
pub mod cropper;
mod error;
pub mod events;
pub mod ico;
pub mod loader;
mod orchestrator;
mod pipeline;
pub mod resampler;
mod source;

pub use commands::FactoryCommandError;
pub use config::{IconAdvancedConfig, IconConfig, IconQualityProfile, ResampleFilter};
pub use cropper::{CropRegion, CropSession};
pub use error::IconError;
pub use events::{EventSink, ExportProgressPayload, ExportStatus, FactoryEvent, NoticeLevel};
pub use ico::IcoContainer;
pub use orchestrator::{ArchiveSink, ExportReport, FactoryStateKind, IconFactory};
pub use source::{
    ARCHIVE_FILE_NAME, CANONICAL_SIZE, CanonicalIcon, ExportedArchive, ICO_FILE_NAME,
    ICON_TARGETS, IconArchiveEntry, IconTarget, SizedRaster, SourceImage, target_sizes,
};
