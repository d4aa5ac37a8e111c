//! # Nexus 图标工场 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            前端（个人极客控制台）/ CLI                   │
//! │   选图 · 拖放 ── 裁剪窗口 ── 预览 ── 下载图标包          │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ commands (Result<T, FactoryCommandError>)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ icon_factory  裁剪 · 多尺寸派生 · ICO · ZIP           │
//! │  │   └─ IconFactory  状态机 + 单导出守卫                  │
//! │  ├─ settings      质量档位 / 输出目录 / 资源上限          │
//! │  └─ storage       输出目录解析 + DirectorySink           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，序列化为 `{ code, stage, message }` |
//! | [`icon_factory`] | 从文件/拖放/Data URL 选图，裁剪为 512 母版并导出图标包 |
//! | [`settings`] | JSON 设置文件的读取、校验与应用 |
//! | [`storage`] | 图标包输出目录的解析与自动创建 |

pub mod error;
pub mod icon_factory;
pub mod settings;
pub mod storage;
