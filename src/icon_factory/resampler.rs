//! # 多尺寸降采样模块
//!
//! 所有尺寸都直接从 512×512 母版派生，不做级联缩放，避免误差累积。
//! 任一尺寸失败即整批失败，并在错误中指明失败的尺寸。

use std::collections::BTreeMap;

use super::config::ResampleFilter;
use super::pipeline::resize_rgba;
use super::source::{CANONICAL_SIZE, CanonicalIcon, SizedRaster};
use super::{IconConfig, IconError};

/// 从母版派生单个尺寸。
///
/// 纯函数：相同母版与尺寸总是得到逐字节相同的结果。
pub fn resample_one(
    canonical: &CanonicalIcon,
    size: u32,
    filter: ResampleFilter,
) -> Result<SizedRaster, IconError> {
    if size == 0 || size > CANONICAL_SIZE {
        return Err(IconError::Resample {
            size,
            reason: format!("目标尺寸须在 1~{} 之间", CANONICAL_SIZE),
        });
    }

    let pixels = resize_rgba(canonical.pixels(), size, size, filter)
        .map_err(|reason| IconError::Resample { size, reason })?;

    log::debug!("🧩 降采样 {}x{} 完成（filter={:?}）", size, size, filter);

    Ok(SizedRaster { size, pixels })
}

/// 批量派生：每个请求尺寸恰好一个输出。
pub fn resample(
    canonical: &CanonicalIcon,
    target_sizes: &[u32],
    config: &IconConfig,
) -> Result<BTreeMap<u32, SizedRaster>, IconError> {
    let mut outputs = BTreeMap::new();
    for &size in target_sizes {
        if outputs.contains_key(&size) {
            continue;
        }
        let raster = resample_one(canonical, size, config.resample_filter)?;
        outputs.insert(size, raster);
    }
    Ok(outputs)
}
