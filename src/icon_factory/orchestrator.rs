//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `IconFactory` 持有图标工场的状态机，是唯一可以替换“当前母版”的角色：
//!
//! ```text
//! Idle ──选择文件──▶ Cropping ──确认──▶ CroppedReady ──导出──▶ Exporting ──▶ Done
//!                       │                    ▲                    │
//!                       └──失败──▶ Error ─────┘◀─────失败───────────┘
//! ```
//!
//! - `Exporting` 状态本身就是“导出进行中”的守卫：进入该状态发生在任何 await 之前，
//!   第二次导出、重新选图、确认裁剪都会得到 `ExportInProgress`。
//! - 裁剪失败的恢复点是 `Idle`，导出失败的恢复点是 `CroppedReady`（母版不变）。
//!
//! ## 实现思路
//!
//! - 状态放在 `Arc<Mutex<_>>` 中，锁从不跨 await 持有，也不在放缩期间持有。
//! - 导出整体运行在一个独立的 tokio 任务里：5 个尺寸各自 `spawn_blocking` 并发降采样，
//!   逐个 await 句柄做结构化汇合，任一失败整批失败；随后 ICO 编码、打包、交付下载。
//! - 调用方放弃等待（future 被丢弃）时导出任务照常跑完，由任务自己写入 `Done`/`Error`；
//!   在此之前状态一直是 `Exporting`。
//! - 配置通过 `RwLock<IconConfig>` 支持运行时切档，单次导出使用同一配置快照。

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use chrono::{DateTime, Local};

use super::archive::build_archive;
use super::config::IconAdvancedConfig;
use super::cropper::{CropRegion, CropSession, begin_crop};
use super::events::{
    EventSink, ExportProgressPayload, ExportStatus, FactoryEvent, NoticeLevel, log_event_sink,
};
use super::ico::encode_ico;
use super::loader;
use super::resampler::resample_one;
use super::source::{
    ARCHIVE_FILE_NAME, CanonicalIcon, ExportedArchive, ICO_FILE_NAME, ICO_SOURCE_SIZE,
    ICON_TARGETS, IconArchiveEntry, SizedRaster, SourceImage,
};
use super::{IconConfig, IconError, IconQualityProfile};

/// 下载交付方（浏览器中的“另存为”，CLI 中写入下载目录）。
pub trait ArchiveSink: Send + Sync {
    /// 保存图标包，返回最终位置。
    fn save(&self, archive: &ExportedArchive) -> Result<PathBuf, IconError>;
}

/// 对外可见的状态标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryStateKind {
    Idle,
    Cropping,
    CroppedReady,
    Exporting,
    Done,
    Error,
}

/// 一次成功导出的摘要。
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub file_name: &'static str,
    pub saved_to: PathBuf,
    /// `(文件名, 字节数)`，顺序与包内一致。
    pub entries: Vec<(String, usize)>,
    pub archive_len: usize,
    pub exported_at: DateTime<Local>,
}

#[derive(Debug, Clone)]
enum Recovery {
    Idle,
    CroppedReady(Arc<CanonicalIcon>),
}

enum FactoryState {
    Idle,
    Cropping {
        session: CropSession,
        /// 重新打开裁剪前的母版；新母版确认前保持不变。
        previous: Option<Arc<CanonicalIcon>>,
    },
    CroppedReady {
        icon: Arc<CanonicalIcon>,
    },
    Exporting {
        icon: Arc<CanonicalIcon>,
    },
    Done {
        icon: Arc<CanonicalIcon>,
        report: ExportReport,
    },
    Error {
        error: IconError,
        recover_to: Recovery,
    },
}

impl FactoryState {
    fn kind(&self) -> FactoryStateKind {
        match self {
            Self::Idle => FactoryStateKind::Idle,
            Self::Cropping { .. } => FactoryStateKind::Cropping,
            Self::CroppedReady { .. } => FactoryStateKind::CroppedReady,
            Self::Exporting { .. } => FactoryStateKind::Exporting,
            Self::Done { .. } => FactoryStateKind::Done,
            Self::Error { .. } => FactoryStateKind::Error,
        }
    }

    /// 当前稳定可用的母版（不含裁剪中的候选）。
    fn stable_icon(&self) -> Option<Arc<CanonicalIcon>> {
        match self {
            Self::Idle => None,
            Self::Cropping { previous, .. } => previous.clone(),
            Self::CroppedReady { icon } | Self::Exporting { icon } | Self::Done { icon, .. } => {
                Some(Arc::clone(icon))
            }
            Self::Error { recover_to, .. } => match recover_to {
                Recovery::Idle => None,
                Recovery::CroppedReady(icon) => Some(Arc::clone(icon)),
            },
        }
    }
}

type SharedState = Arc<Mutex<FactoryState>>;

fn lock(state: &Mutex<FactoryState>) -> Result<MutexGuard<'_, FactoryState>, IconError> {
    state
        .lock()
        .map_err(|_| IconError::Internal("状态锁已中毒".to_string()))
}

fn emit_notice(events: &EventSink, level: NoticeLevel, message: impl Into<String>) {
    events(FactoryEvent::Notice {
        level,
        message: message.into(),
    });
}

fn emit_progress(events: &EventSink, status: ExportStatus, progress: u8, size: Option<u32>) {
    events(FactoryEvent::Progress(ExportProgressPayload::step(
        status, progress, size,
    )));
}

/// 图标工场编排器。
pub struct IconFactory {
    config: RwLock<IconConfig>,
    state: SharedState,
    sink: Arc<dyn ArchiveSink>,
    events: EventSink,
}

impl IconFactory {
    pub fn new(config: IconConfig, sink: Arc<dyn ArchiveSink>) -> Self {
        Self {
            config: RwLock::new(config),
            state: Arc::new(Mutex::new(FactoryState::Idle)),
            sink,
            events: log_event_sink(),
        }
    }

    /// 替换事件接收方（前端进度条 / toast）。
    pub fn with_event_sink(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, FactoryState>, IconError> {
        lock(&self.state)
    }

    /// 获取配置快照，保证单次操作使用一致参数。
    pub fn config_snapshot(&self) -> Result<IconConfig, IconError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| IconError::Internal("配置读取锁已中毒".to_string()))
    }

    pub fn set_quality_profile(&self, profile: IconQualityProfile) -> Result<(), IconError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| IconError::Internal("配置写入锁已中毒".to_string()))?;
        config.apply_quality_profile(profile);

        log::info!(
            "⚙️ 已切换图标质量档位：{:?}（filter={:?}, png={:?}）",
            profile,
            config.resample_filter,
            config.png_compression
        );
        Ok(())
    }

    pub fn quality_profile(&self) -> Result<IconQualityProfile, IconError> {
        Ok(self.config_snapshot()?.infer_quality_profile())
    }

    pub fn set_advanced_config(&self, advanced: IconAdvancedConfig) -> Result<(), IconError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| IconError::Internal("配置写入锁已中毒".to_string()))?;
        config.apply_advanced(advanced)?;

        log::info!(
            "⚙️ 已更新资源上限：file={}B pixels={} decoded={}B",
            advanced.max_file_size,
            advanced.max_decoded_pixels,
            advanced.max_decoded_bytes
        );
        Ok(())
    }

    pub fn advanced_config(&self) -> Result<IconAdvancedConfig, IconError> {
        Ok(self.config_snapshot()?.advanced())
    }

    pub fn state_kind(&self) -> Result<FactoryStateKind, IconError> {
        Ok(self.lock_state()?.kind())
    }

    pub fn current_icon(&self) -> Result<Option<Arc<CanonicalIcon>>, IconError> {
        Ok(self.lock_state()?.stable_icon())
    }

    pub fn crop_region(&self) -> Result<Option<CropRegion>, IconError> {
        Ok(match &*self.lock_state()? {
            FactoryState::Cropping { session, .. } => session.region(),
            _ => None,
        })
    }

    pub fn last_error(&self) -> Result<Option<IconError>, IconError> {
        Ok(match &*self.lock_state()? {
            FactoryState::Error { error, .. } => Some(error.clone()),
            _ => None,
        })
    }

    pub fn last_report(&self) -> Result<Option<ExportReport>, IconError> {
        Ok(match &*self.lock_state()? {
            FactoryState::Done { report, .. } => Some(report.clone()),
            _ => None,
        })
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        emit_notice(&self.events, level, message);
    }

    /// 记录并提示一次被拒绝的操作，原样返回错误。
    fn reject<T>(&self, action: &str, err: IconError) -> Result<T, IconError> {
        log::warn!("❌ 拒绝操作 {}：{}", action, err);
        self.notify(NoticeLevel::Error, err.to_string());
        Err(err)
    }

    fn reject_while_exporting(&self, action: &str) -> Result<(), IconError> {
        if self.lock_state()?.kind() == FactoryStateKind::Exporting {
            return self.reject(action, IconError::ExportInProgress);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // 裁剪阶段
    // ------------------------------------------------------------------------

    /// 选择/拖入文件，打开新的裁剪会话（旧的未确认会话直接丢弃）。
    ///
    /// 校验失败时状态保持不变。
    pub fn select_file(&self, source: SourceImage) -> Result<CropRegion, IconError> {
        self.reject_while_exporting("select_file")?;

        let config = self.config_snapshot()?;
        let session = match begin_crop(source, &config) {
            Ok(session) => session,
            Err(err) => {
                log::warn!("❌ 图片不可用：{}", err);
                self.notify(NoticeLevel::Error, err.to_string());
                return Err(err);
            }
        };

        let mut state = self.lock_state()?;
        // 解码期间可能已开始导出
        if state.kind() == FactoryStateKind::Exporting {
            drop(state);
            return self.reject("select_file", IconError::ExportInProgress);
        }

        let region = session
            .region()
            .unwrap_or_else(|| CropRegion::centered(session.image_dimensions()));
        let previous = state.stable_icon();
        *state = FactoryState::Cropping { session, previous };
        Ok(region)
    }

    /// 从本地路径选择图片。
    pub fn select_path(&self, path: &Path) -> Result<CropRegion, IconError> {
        self.load_then_select(|config| loader::load_from_file(path, config))
    }

    /// 拖放的文件字节（`mime` 为浏览器声明的类型）。
    pub fn select_bytes(
        &self,
        bytes: Vec<u8>,
        mime: Option<String>,
    ) -> Result<CropRegion, IconError> {
        self.load_then_select(|config| loader::load_from_bytes(bytes, mime, config))
    }

    /// FileReader 产出的 Data URL。
    pub fn select_data_url(&self, data_url: &str) -> Result<CropRegion, IconError> {
        self.load_then_select(|config| loader::load_from_data_url(data_url, config))
    }

    fn load_then_select(
        &self,
        load: impl FnOnce(&IconConfig) -> Result<SourceImage, IconError>,
    ) -> Result<CropRegion, IconError> {
        self.reject_while_exporting("select_file")?;
        let config = self.config_snapshot()?;
        match load(&config) {
            Ok(source) => self.select_file(source),
            Err(err) => {
                log::warn!("❌ 图片读取失败：{}", err);
                self.notify(NoticeLevel::Error, err.to_string());
                Err(err)
            }
        }
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut CropSession) -> R) -> Result<R, IconError> {
        match &mut *self.lock_state()? {
            FactoryState::Cropping { session, .. } => Ok(f(session)),
            FactoryState::Exporting { .. } => Err(IconError::ExportInProgress),
            _ => Err(IconError::NoActiveCrop),
        }
    }

    pub fn set_crop_region(&self, x: u32, y: u32, side: u32) -> Result<CropRegion, IconError> {
        self.with_session(|session| session.set_region(x, y, side))
    }

    pub fn move_crop(&self, x: u32, y: u32) -> Result<CropRegion, IconError> {
        self.with_session(|session| session.move_to(x, y))
    }

    pub fn resize_crop(&self, side: u32) -> Result<CropRegion, IconError> {
        self.with_session(|session| session.resize_to(side))
    }

    pub fn select_all_crop(&self) -> Result<CropRegion, IconError> {
        self.with_session(CropSession::select_all)
    }

    pub fn clear_crop_region(&self) -> Result<(), IconError> {
        self.with_session(CropSession::clear_region)
    }

    /// 关闭裁剪窗口：回到之前的母版，或回到 `Idle`。
    pub fn cancel_crop(&self) -> Result<FactoryStateKind, IconError> {
        let mut state = self.lock_state()?;
        let next = match &*state {
            FactoryState::Cropping { previous, .. } => Some(match previous.clone() {
                Some(icon) => FactoryState::CroppedReady { icon },
                None => FactoryState::Idle,
            }),
            _ => None,
        };
        if let Some(next) = next {
            *state = next;
        }
        Ok(state.kind())
    }

    /// 确认裁剪，生成新的母版并替换旧母版。
    ///
    /// 放缩在锁外进行；期间会话被替换或选区被改动时丢弃本次结果。
    pub fn confirm_crop(&self) -> Result<Arc<CanonicalIcon>, IconError> {
        let snapshot = match &*self.lock_state()? {
            FactoryState::Cropping { session, .. } => Ok(session.clone()),
            FactoryState::Exporting { .. } => Err(IconError::ExportInProgress),
            _ => Err(IconError::NoActiveCrop),
        };
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(err) => return self.reject("confirm_crop", err),
        };

        let result = snapshot.confirm();

        let mut state = self.lock_state()?;
        let unchanged = matches!(
            &*state,
            FactoryState::Cropping { session, .. } if session.same_selection(&snapshot)
        );
        if !unchanged {
            drop(state);
            log::warn!("⚠️ 确认期间裁剪会话已变更，丢弃本次结果");
            return self.reject("confirm_crop", IconError::NoActiveCrop);
        }

        match result {
            Ok(icon) => {
                let icon = Arc::new(icon);
                *state = FactoryState::CroppedReady {
                    icon: Arc::clone(&icon),
                };
                drop(state);
                self.notify(NoticeLevel::Success, "裁剪完成，可下载图标");
                Ok(icon)
            }
            Err(err) => {
                log::error!("❌ 裁剪失败：{}", err);
                *state = FactoryState::Error {
                    error: err.clone(),
                    recover_to: Recovery::Idle,
                };
                drop(state);
                self.notify(NoticeLevel::Error, err.to_string());
                Err(err)
            }
        }
    }

    /// 用户确认错误提示后回到最近的稳定状态（`Idle` 或 `CroppedReady`）。
    pub fn acknowledge_error(&self) -> Result<FactoryStateKind, IconError> {
        let mut state = self.lock_state()?;
        let next = match &*state {
            FactoryState::Error { recover_to, .. } => Some(match recover_to.clone() {
                Recovery::Idle => FactoryState::Idle,
                Recovery::CroppedReady(icon) => FactoryState::CroppedReady { icon },
            }),
            _ => None,
        };
        if let Some(next) = next {
            log::info!("🔁 错误已确认，回到 {:?}", next.kind());
            *state = next;
        }
        Ok(state.kind())
    }

    // ------------------------------------------------------------------------
    // 导出阶段
    // ------------------------------------------------------------------------

    /// 导出图标包：降采样扇出 → 汇合 → ICO → 打包 → 交付下载。
    ///
    /// 同一时刻只允许一个导出；并发调用得到 `ExportInProgress`。
    /// 返回的 future 被丢弃时导出仍会完成，状态在完成前保持 `Exporting`。
    pub async fn export(&self) -> Result<ExportReport, IconError> {
        let job = self.begin_export()?;
        self.notify(NoticeLevel::Info, "正在生成图标包...");

        match tokio::spawn(job.run()).await {
            Ok(result) => result,
            Err(join_err) => {
                let err = IconError::Internal(format!("导出任务异常退出：{}", join_err));
                log::error!("❌ {}", err);
                self.notify(NoticeLevel::Error, err.to_string());
                Err(err)
            }
        }
    }

    fn begin_export(&self) -> Result<ExportJob, IconError> {
        let config = self.config_snapshot()?;
        let mut state = self.lock_state()?;

        let icon = match &*state {
            FactoryState::CroppedReady { icon } | FactoryState::Done { icon, .. } => {
                Ok(Arc::clone(icon))
            }
            FactoryState::Exporting { .. } => Err(IconError::ExportInProgress),
            _ => Err(IconError::NoActiveCrop),
        };
        let icon = match icon {
            Ok(icon) => icon,
            Err(err) => {
                drop(state);
                return self.reject("export", err);
            }
        };

        *state = FactoryState::Exporting {
            icon: Arc::clone(&icon),
        };

        Ok(ExportJob {
            guard: ExportGuard {
                state: Arc::clone(&self.state),
                icon: Some(Arc::clone(&icon)),
            },
            icon,
            config,
            sink: Arc::clone(&self.sink),
            events: Arc::clone(&self.events),
        })
    }
}

/// 一次导出所需的全部输入，整体移交给独立任务。
struct ExportJob {
    guard: ExportGuard,
    icon: Arc<CanonicalIcon>,
    config: IconConfig,
    sink: Arc<dyn ArchiveSink>,
    events: EventSink,
}

impl ExportJob {
    async fn run(self) -> Result<ExportReport, IconError> {
        let result = self.pipeline().await;
        let Self { guard, events, .. } = self;
        guard.finish(&events, result)
    }

    fn progress(&self, status: ExportStatus, progress: u8, size: Option<u32>) {
        emit_progress(&self.events, status, progress, size);
    }

    async fn pipeline(&self) -> Result<ExportReport, IconError> {
        let total_start = Instant::now();
        let config = &self.config;

        // 扇出：每个尺寸独立降采样 + PNG 编码
        let resample_start = Instant::now();
        let handles: Vec<_> = ICON_TARGETS
            .iter()
            .map(|target| {
                let icon = Arc::clone(&self.icon);
                let filter = config.resample_filter;
                let compression = config.png_compression;
                let size = target.size;
                let handle = tokio::task::spawn_blocking(move || {
                    let raster = resample_one(&icon, size, filter)?;
                    let png = raster.to_png(compression)?;
                    Ok::<_, IconError>((raster, png))
                });
                (*target, handle)
            })
            .collect();

        // 汇合：等待全部任务结束，记录第一个失败
        let total = handles.len();
        let mut first_error = None;
        let mut outputs: Vec<(&'static str, SizedRaster, Vec<u8>)> = Vec::with_capacity(total);
        for (done, (target, handle)) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok((raster, png))) => outputs.push((target.file_name, raster, png)),
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(join_err) => {
                    first_error.get_or_insert(IconError::Resample {
                        size: target.size,
                        reason: format!("任务执行失败：{}", join_err),
                    });
                }
            }
            self.progress(
                ExportStatus::Resampling,
                ((done + 1) * 60 / total) as u8,
                Some(target.size),
            );
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        let resample_elapsed = resample_start.elapsed();

        // ICO：使用 32×32 结果
        let encode_start = Instant::now();
        self.progress(ExportStatus::Encoding, 70, Some(ICO_SOURCE_SIZE));
        let ico_source = outputs
            .iter()
            .find(|(_, raster, _)| raster.size == ICO_SOURCE_SIZE)
            .map(|(_, raster, _)| raster.clone())
            .ok_or_else(|| IconError::Encode("缺少 32x32 栅格".to_string()))?;
        let compression = config.png_compression;
        let ico = tokio::task::spawn_blocking(move || encode_ico(&ico_source, compression))
            .await
            .map_err(|e| IconError::Encode(format!("任务执行失败：{}", e)))??;
        let encode_elapsed = encode_start.elapsed();

        // 打包
        let package_start = Instant::now();
        self.progress(ExportStatus::Packaging, 85, None);
        let mut entries: Vec<IconArchiveEntry> = outputs
            .into_iter()
            .map(|(file_name, _, png)| IconArchiveEntry::new(file_name, png))
            .collect();
        entries.push(IconArchiveEntry::new(ICO_FILE_NAME, ico.into_bytes()));
        let summary: Vec<(String, usize)> = entries
            .iter()
            .map(|e| (e.file_name.clone(), e.bytes.len()))
            .collect();

        let archive_bytes = tokio::task::spawn_blocking(move || build_archive(&entries))
            .await
            .map_err(|e| IconError::Packaging(format!("任务执行失败：{}", e)))??;
        let archive = ExportedArchive {
            file_name: ARCHIVE_FILE_NAME,
            bytes: archive_bytes.into(),
        };
        let package_elapsed = package_start.elapsed();

        // 交付下载
        let save_start = Instant::now();
        self.progress(ExportStatus::Saving, 95, None);
        let sink = Arc::clone(&self.sink);
        let archive_len = archive.bytes.len();
        let saved_to = tokio::task::spawn_blocking(move || sink.save(&archive))
            .await
            .map_err(|e| IconError::FileSystem(format!("任务执行失败：{}", e)))??;
        let save_elapsed = save_start.elapsed();

        log::info!(
            "✅ 图标包生成完成 - resample={}ms encode={}ms package={}ms save={}ms total={}ms",
            resample_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            package_elapsed.as_millis(),
            save_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(ExportReport {
            file_name: ARCHIVE_FILE_NAME,
            saved_to,
            entries: summary,
            archive_len,
            exported_at: Local::now(),
        })
    }
}

/// 导出期间的状态守卫（RAII）。
///
/// 导出任务结束时由 `finish` 写入 `Done`/`Error`；
/// 任务本身被中止（panic 或运行时关闭）时在 drop 中退回 `CroppedReady`。
struct ExportGuard {
    state: SharedState,
    icon: Option<Arc<CanonicalIcon>>,
}

impl ExportGuard {
    fn finish(
        mut self,
        events: &EventSink,
        result: Result<ExportReport, IconError>,
    ) -> Result<ExportReport, IconError> {
        let Some(icon) = self.icon.take() else {
            return Err(IconError::Internal("导出守卫已结束".to_string()));
        };

        match result {
            Ok(report) => {
                *lock(&self.state)? = FactoryState::Done {
                    icon,
                    report: report.clone(),
                };
                emit_progress(events, ExportStatus::Completed, 100, None);
                emit_notice(events, NoticeLevel::Success, "下载已开始");
                log::info!("📦 {} 已保存到 {}", report.file_name, report.saved_to.display());
                Ok(report)
            }
            Err(err) => {
                log::error!("❌ 图标包生成失败：{}", err);
                *lock(&self.state)? = FactoryState::Error {
                    error: err.clone(),
                    recover_to: Recovery::CroppedReady(icon),
                };
                events(FactoryEvent::Progress(ExportProgressPayload::failed(&err)));
                emit_notice(events, NoticeLevel::Error, err.to_string());
                Err(err)
            }
        }
    }
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        if let Some(icon) = self.icon.take() {
            log::warn!("⚠️ 导出任务被中止，状态退回 CroppedReady");
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = FactoryState::CroppedReady { icon };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<ExportedArchive>>,
    }

    impl ArchiveSink for MemorySink {
        fn save(&self, archive: &ExportedArchive) -> Result<PathBuf, IconError> {
            self.saved
                .lock()
                .map_err(|_| IconError::Internal("poisoned".into()))?
                .push(archive.clone());
            Ok(PathBuf::from(archive.file_name))
        }
    }

    struct FailingSink;

    impl ArchiveSink for FailingSink {
        fn save(&self, _archive: &ExportedArchive) -> Result<PathBuf, IconError> {
            Err(IconError::FileSystem("disk full".into()))
        }
    }

    fn png_source(width: u32, height: u32) -> SourceImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, 64, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        SourceImage::new(cursor.into_inner(), Some("image/png".to_string()))
    }

    fn factory(sink: Arc<dyn ArchiveSink>) -> IconFactory {
        IconFactory::new(IconConfig::default(), sink)
            .with_event_sink(Arc::new(|_: FactoryEvent| {}))
    }

    #[test]
    fn crop_flow_transitions_states() {
        let factory = factory(Arc::new(MemorySink::default()));
        assert_eq!(factory.state_kind().expect("state"), FactoryStateKind::Idle);

        factory.select_file(png_source(80, 60)).expect("select");
        assert_eq!(factory.state_kind().expect("state"), FactoryStateKind::Cropping);

        let region = factory.set_crop_region(5, 5, 40).expect("region");
        assert_eq!(
            region,
            CropRegion {
                x: 5,
                y: 5,
                side: 40,
            }
        );

        let icon = factory.confirm_crop().expect("confirm");
        assert_eq!((icon.width(), icon.height()), (512, 512));
        assert_eq!(factory.state_kind().expect("state"), FactoryStateKind::CroppedReady);
    }

    #[test]
    fn confirm_without_region_goes_to_error_then_idle() {
        let factory = factory(Arc::new(MemorySink::default()));
        factory.select_file(png_source(32, 32)).expect("select");
        factory.clear_crop_region().expect("clear");

        assert_eq!(factory.confirm_crop(), Err(IconError::NoActiveCrop));
        assert_eq!(factory.state_kind().expect("state"), FactoryStateKind::Error);
        assert_eq!(factory.last_error().expect("err"), Some(IconError::NoActiveCrop));

        assert_eq!(factory.acknowledge_error().expect("ack"), FactoryStateKind::Idle);
    }

    #[test]
    fn confirm_outside_cropping_does_not_transition() {
        let factory = factory(Arc::new(MemorySink::default()));
        assert_eq!(factory.confirm_crop(), Err(IconError::NoActiveCrop));
        assert_eq!(factory.state_kind().expect("state"), FactoryStateKind::Idle);
    }

    #[test]
    fn recrop_keeps_previous_icon_until_confirmed() {
        let factory = factory(Arc::new(MemorySink::default()));
        factory.select_file(png_source(64, 64)).expect("select");
        let first = factory.confirm_crop().expect("confirm");

        factory.select_file(png_source(100, 100)).expect("reselect");
        let current = factory.current_icon().expect("icon").expect("previous kept");
        assert!(Arc::ptr_eq(&first, &current));

        assert_eq!(factory.cancel_crop().expect("cancel"), FactoryStateKind::CroppedReady);
        let restored = factory.current_icon().expect("icon").expect("restored");
        assert!(Arc::ptr_eq(&first, &restored));
    }

    #[tokio::test]
    async fn export_failure_recovers_to_cropped_ready() {
        let factory = factory(Arc::new(FailingSink));
        factory.select_file(png_source(64, 64)).expect("select");
        let icon = factory.confirm_crop().expect("confirm");

        let result = factory.export().await;
        assert!(matches!(result, Err(IconError::FileSystem(_))));
        assert_eq!(factory.state_kind().expect("state"), FactoryStateKind::Error);

        assert_eq!(factory.acknowledge_error().expect("ack"), FactoryStateKind::CroppedReady);
        let kept = factory.current_icon().expect("icon").expect("kept");
        assert!(Arc::ptr_eq(&icon, &kept));
    }

    #[tokio::test]
    async fn export_without_icon_is_rejected() {
        let factory = factory(Arc::new(MemorySink::default()));
        assert!(matches!(factory.export().await, Err(IconError::NoActiveCrop)));
        assert_eq!(factory.state_kind().expect("state"), FactoryStateKind::Idle);
    }

    #[tokio::test]
    async fn dropped_export_keeps_guard_until_task_finishes() {
        let sink = Arc::new(MemorySink::default());
        let factory = factory(sink.clone());
        factory.select_file(png_source(64, 64)).expect("select");
        factory.confirm_crop().expect("confirm");

        {
            let fut = factory.export();
            futures_poll_once(fut).await;
        }
        assert_eq!(factory.state_kind().expect("state"), FactoryStateKind::Exporting);
        assert!(matches!(factory.export().await, Err(IconError::ExportInProgress)));

        for _ in 0..500 {
            if factory.state_kind().expect("state") != FactoryStateKind::Exporting {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(factory.state_kind().expect("state"), FactoryStateKind::Done);
        assert_eq!(sink.saved.lock().expect("sink lock").len(), 1);
        assert!(factory.last_report().expect("report").is_some());
    }

    #[tokio::test]
    async fn rejected_actions_are_announced() {
        let events: Arc<Mutex<Vec<FactoryEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&events);
        let factory = IconFactory::new(IconConfig::default(), Arc::new(MemorySink::default()))
            .with_event_sink(Arc::new(move |event: FactoryEvent| {
                recorder.lock().expect("event lock").push(event);
            }));

        assert_eq!(factory.confirm_crop(), Err(IconError::NoActiveCrop));
        assert!(matches!(factory.export().await, Err(IconError::NoActiveCrop)));

        let expected = FactoryEvent::Notice {
            level: NoticeLevel::Error,
            message: IconError::NoActiveCrop.to_string(),
        };
        assert_eq!(*events.lock().expect("event lock"), vec![expected.clone(), expected]);
    }

    /// 轮询一次后丢弃 future。
    async fn futures_poll_once<F: std::future::Future>(fut: F) {
        let mut fut = std::pin::pin!(fut);
        std::future::poll_fn(|cx| {
            let _ = fut.as_mut().poll(cx);
            std::task::Poll::Ready(())
        })
        .await;
    }
}
