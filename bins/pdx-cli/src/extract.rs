//! 单个文件的提取任务.
//!
//! 输出目录结构: `<目标目录>/<文件名>` 为原始文件,
//! `<目标目录>/<文件名去扩展名>/` 下存放音轨、视频帧与解码后的 PNG.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use pdx_codec::VideoFrame;
use pdx_codec::decoders::jpeg::JpegHeaderConfig;
use pdx_codec::decoders::xa_adpcm::OUTPUT_SAMPLE_RATE;
use pdx_core::PixelFormat;
use pdx_format::extract::{decode_video_frames, extract_audio, extract_video};
use pdx_format::wav::write_mono_s16;
use pdx_format::{DirectoryRecord, IsoImage};

/// 本次运行要做的提取
#[derive(Debug, Clone, Default)]
pub struct Tasks {
    /// 原始文件
    pub raw: bool,
    /// 音轨 (WAV)
    pub audio: bool,
    /// 视频帧原始数据 (.bin)
    pub video: bool,
    /// 解码后的视频帧 (PNG)
    pub frames: Option<JpegHeaderConfig>,
}

/// 文件对应的输出子目录
fn stream_dir(destination: &Path, record: &DirectoryRecord) -> Result<PathBuf> {
    let stem = Path::new(&record.identifier)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| record.identifier.clone());
    let dir = destination.join(stem);
    std::fs::create_dir_all(&dir).with_context(|| format!("创建目录 {} 失败", dir.display()))?;
    Ok(dir)
}

/// 将 RGB24 视频帧保存为 PNG
pub fn save_png(frame: &VideoFrame, path: &Path) -> Result<()> {
    anyhow::ensure!(
        frame.pixel_format == PixelFormat::Rgb24,
        "不支持的像素格式 {}",
        frame.pixel_format
    );
    let image = image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("帧数据长度与尺寸不符")?;
    image
        .save(path)
        .with_context(|| format!("写入 {} 失败", path.display()))?;
    Ok(())
}

/// 处理一个文件的所有提取任务
pub fn process_file(
    image: &mut IsoImage,
    record: &DirectoryRecord,
    destination: &Path,
    tasks: &Tasks,
) -> Result<()> {
    if tasks.raw {
        let path = destination.join(&record.identifier);
        image
            .extract_file(record, &path)
            .with_context(|| format!("提取 {} 失败", record.identifier))?;
        info!("{} -> {}", record.identifier, path.display());
    }

    if tasks.audio {
        let dir = stream_dir(destination, record)?;
        extract_audio(image, record, |track| {
            let path = dir.join(format!("track{:02}.wav", track.index));
            write_mono_s16(&path, &track.samples, OUTPUT_SAMPLE_RATE)?;
            info!(
                "{}: 音轨 {} ({:.2} 秒) -> {}",
                record.identifier,
                track.index,
                track.samples.len() as f64 / f64::from(OUTPUT_SAMPLE_RATE),
                path.display()
            );
            Ok(())
        })
        .with_context(|| format!("{}: 音频提取失败", record.identifier))?;
    }

    if tasks.video {
        let dir = stream_dir(destination, record)?;
        extract_video(image, record, |frame| {
            let path = dir.join(format!("frame_{:04}.bin", frame.index));
            std::fs::write(&path, &frame.data)?;
            Ok(())
        })
        .with_context(|| format!("{}: 视频提取失败", record.identifier))?;
    }

    if let Some(config) = &tasks.frames {
        let dir = stream_dir(destination, record)?;
        let mut failed = Vec::new();
        let decoded = decode_video_frames(image, record, config, |index, frame| {
            let path = dir.join(format!("frame_{:04}.png", index));
            if let Err(e) = save_png(&frame, &path) {
                failed.push((index, e));
            }
            Ok(())
        })
        .with_context(|| format!("{}: 视频帧解码失败", record.identifier))?;
        for (index, e) in &failed {
            log::error!("{} 帧 {}: {:#}", record.identifier, index, e);
        }
        info!("{}: 解码 {} 帧", record.identifier, decoded);
    }
    Ok(())
}
