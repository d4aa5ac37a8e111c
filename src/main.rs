//! # Nexus 图标工场 — 命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与设置加载。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use nexus_icons::error::AppError;
use nexus_icons::icon_factory::commands;
use nexus_icons::icon_factory::{IcoContainer, IconConfig, IconError, IconFactory};
use nexus_icons::settings::{self, IconSettings};
use nexus_icons::storage;

#[derive(Parser, Debug)]
#[command(
    name = "nexus-icons",
    version,
    about = "裁剪图片并生成 favicon / apple-touch / android 图标包"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 生成 nexus-icons.zip
    Generate {
        /// 源图片
        input: PathBuf,
        /// 声明的 MIME 类型（模拟拖放），缺省时按文件签名识别
        #[arg(long)]
        mime: Option<String>,
        /// 正方形选区，缺省时选中最大的居中正方形
        #[arg(long, num_args = 3, value_names = ["X", "Y", "SIDE"])]
        crop: Option<Vec<u32>>,
        /// 输出目录
        #[arg(long)]
        out: Option<PathBuf>,
        /// quality / balanced / speed
        #[arg(long)]
        profile: Option<String>,
        /// 设置文件路径
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// 查看 ICO 目录头
    Inspect {
        ico: PathBuf,
    },
    /// 修改并保存默认设置
    Config {
        /// quality / balanced / speed
        #[arg(long)]
        profile: Option<String>,
        /// 默认输出目录
        #[arg(long)]
        out: Option<PathBuf>,
        /// 设置文件路径
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Generate {
            input,
            mime,
            crop,
            out,
            profile,
            settings,
        } => generate(input, mime, crop, out, profile, settings).await,
        Commands::Inspect { ico } => inspect(ico),
        Commands::Config {
            profile,
            out,
            settings,
        } => configure(profile, out, settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("[{}] {}", err.code(), err);
            ExitCode::FAILURE
        }
    }
}

fn resolve_settings_path(explicit: Option<PathBuf>) -> Result<PathBuf, AppError> {
    match explicit {
        Some(path) => Ok(path),
        None => settings::default_settings_path(),
    }
}

async fn generate(
    input: PathBuf,
    mime: Option<String>,
    crop: Option<Vec<u32>>,
    out: Option<PathBuf>,
    profile: Option<String>,
    settings_path: Option<PathBuf>,
) -> Result<(), AppError> {
    let mut icon_settings = settings::load_settings(&resolve_settings_path(settings_path)?)?;
    if profile.is_some() {
        icon_settings.profile = profile;
    }

    let out_dir = storage::resolve_output_dir(out.as_deref(), icon_settings.output_dir.as_deref())?;
    let sink = storage::DirectorySink::new(out_dir);
    log::info!("📁 输出目录：{}", sink.dir().display());

    let factory = IconFactory::new(IconConfig::default(), Arc::new(sink));
    icon_settings.apply_to_factory(&factory)?;

    match mime {
        Some(mime) => {
            let bytes = std::fs::read(&input)?;
            commands::open_dropped_icon(&factory, bytes, Some(mime))?;
        }
        None => {
            commands::open_icon_file(&factory, &input)?;
        }
    }

    match crop.as_deref() {
        Some([x, y, side]) => {
            let region = commands::update_crop_region(&factory, *x, *y, *side)?;
            log::info!("✂️ 选区 ({}, {}, {})", region.x, region.y, region.side);
        }
        Some(_) => {
            return Err(AppError::Settings("--crop 需要 X Y SIDE 三个值".to_string()));
        }
        None => {
            commands::select_full_crop(&factory)?;
        }
    }

    let preview = commands::confirm_icon_crop(&factory)?;
    log::debug!("🖼️ 母版 {}x{}", preview.width, preview.height);
    let report = commands::download_icon_pack(&factory).await?;

    for (name, len) in &report.entries {
        println!("{:<28} {:>8} bytes", name, len);
    }
    println!(
        "{} -> {} ({} bytes, {})",
        report.file_name,
        report.saved_to.display(),
        report.archive_len,
        report.exported_at.format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

fn configure(
    profile: Option<String>,
    out: Option<PathBuf>,
    settings_path: Option<PathBuf>,
) -> Result<(), AppError> {
    let path = resolve_settings_path(settings_path)?;
    let mut icon_settings: IconSettings = settings::load_settings(&path)?;
    if profile.is_some() {
        icon_settings.profile = profile;
    }
    if out.is_some() {
        icon_settings.output_dir = out;
    }

    settings::save_settings(&path, &icon_settings)?;
    println!("settings        {}", path.display());
    println!(
        "profile         {}",
        icon_settings.profile.as_deref().unwrap_or("balanced")
    );
    if let Some(dir) = &icon_settings.output_dir {
        println!("output dir      {}", dir.display());
    }
    Ok(())
}

fn inspect(path: PathBuf) -> Result<(), AppError> {
    let bytes = std::fs::read(&path)?;
    let ico = IcoContainer::parse(bytes)?;

    let png = image::load_from_memory_with_format(ico.embedded_png(), image::ImageFormat::Png)
        .map_err(|e| IconError::Encode(format!("内嵌 PNG 无法解码：{}", e)))?;

    println!("file            {}", path.display());
    println!("entries         1");
    println!("width x height  {}x{}", ico.width(), ico.height());
    println!("bits per pixel  {}", ico.bits_per_pixel());
    println!("image offset    {}", ico.image_offset());
    println!("image length    {}", ico.image_len());
    println!("embedded png    {}x{}", png.width(), png.height());
    Ok(())
}
