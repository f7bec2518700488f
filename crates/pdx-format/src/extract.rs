//! 音视频流提取.
//!
//! 交错文件从目录记录的起始 LBA 开始逐扇区遍历, 直到子模式带 EOF 的扇区:
//! - 音频扇区 (AUDIO) 按 XA-ADPCM 解码, 遇到记录结尾 (EOR) 输出一条音轨并复位预测器;
//! - 视频扇区 (VIDEO) 的负载按 EOR 切分为帧.
//!
//! Playdia 视频帧在每 0x800 字节开头带一个帧内序号字节, 解码前需去掉.

use bytes::Bytes;
use log::{debug, info, warn};
use pdx_codec::decoders::jpeg::{JpegDecoder, JpegHeaderConfig};
use pdx_codec::decoders::xa_adpcm::XaAdpcmDecoder;
use pdx_codec::{Decoder, Frame, Packet, VideoFrame};
use pdx_core::{PdxError, PdxResult};

use crate::disc::sector::Submode;
use crate::disc::store::SectorStore;
use crate::iso9660::{DirectoryRecord, IsoImage};

/// 视频帧分块大小
pub const FRAME_CHUNK_SIZE: usize = 0x800;

/// 提取出的音轨
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    /// 在文件中的序号
    pub index: usize,
    /// 起始 LBA
    pub start_lba: usize,
    /// 44100 Hz 单声道采样
    pub samples: Vec<i16>,
}

/// 提取出的原始视频帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVideoFrame {
    /// 在文件中的序号
    pub index: usize,
    /// 起始 LBA
    pub start_lba: usize,
    /// 各视频扇区负载的拼接
    pub data: Vec<u8>,
}

/// 从 `start` 开始遍历扇区直到 EOF 扇区 (不含)
///
/// 镜像在 EOF 之前结束时记录警告并正常返回.
fn walk_sectors<F>(store: &mut SectorStore, start: usize, mut visit: F) -> PdxResult<()>
where
    F: FnMut(&mut SectorStore, usize, Submode) -> PdxResult<()>,
{
    let mut lba = start;
    loop {
        let submode = match store.header(lba) {
            Ok(header) => header.submode,
            Err(PdxError::OutOfRange { .. }) => {
                warn!("LBA {} 起的流在镜像末尾 (LBA {}) 仍未遇到 EOF", start, lba);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if submode.contains(Submode::EOF) {
            debug!("LBA {}: EOF, 共 {} 个扇区", lba, lba - start);
            return Ok(());
        }
        visit(store, lba, submode)?;
        lba += 1;
    }
}

/// 读取扇区负载后释放缓存
fn take_payload(store: &mut SectorStore, lba: usize) -> PdxResult<Bytes> {
    let data = store.read_sector(lba)?.data.clone().unwrap_or_default();
    store.release(lba);
    Ok(data)
}

/// 提取文件中的全部音轨, 每完成一条调用一次 `sink`, 返回音轨数
///
/// EOF 之前未以 EOR 结束的采样作为最后一条音轨输出.
pub fn extract_audio<F>(image: &mut IsoImage, record: &DirectoryRecord, mut sink: F) -> PdxResult<usize>
where
    F: FnMut(AudioTrack) -> PdxResult<()>,
{
    let mut decoder = XaAdpcmDecoder::new();
    let mut samples = Vec::new();
    let mut start_lba = record.extent as usize;
    let mut count = 0;

    walk_sectors(image.store_mut(), record.extent as usize, |store, lba, submode| {
        if !submode.contains(Submode::AUDIO) {
            return Ok(());
        }
        if samples.is_empty() {
            start_lba = lba;
        }
        let mut packet = Packet::from_data(take_payload(store, lba)?);
        packet.pos = lba as i64;
        packet.end_of_record = submode.contains(Submode::EOR);
        decoder.send_packet(&packet)?;
        if let Frame::Audio(frame) = decoder.receive_frame()? {
            samples.extend(frame.samples_s16());
        }

        if packet.end_of_record {
            debug!("音轨 {}: LBA {}..={}, {} 个采样", count, start_lba, lba, samples.len());
            sink(AudioTrack {
                index: count,
                start_lba,
                samples: std::mem::take(&mut samples),
            })?;
            count += 1;
        }
        Ok(())
    })?;

    if !samples.is_empty() {
        warn!("{}: 最后一条音轨没有 EOR 标记", record.identifier);
        sink(AudioTrack {
            index: count,
            start_lba,
            samples,
        })?;
        count += 1;
    }
    info!("{}: 提取 {} 条音轨", record.identifier, count);
    Ok(count)
}

/// 提取文件中的原始视频帧, 每完成一帧调用一次 `sink`, 返回帧数
pub fn extract_video<F>(image: &mut IsoImage, record: &DirectoryRecord, mut sink: F) -> PdxResult<usize>
where
    F: FnMut(RawVideoFrame) -> PdxResult<()>,
{
    let mut data = Vec::new();
    let mut start_lba = record.extent as usize;
    let mut count = 0;

    walk_sectors(image.store_mut(), record.extent as usize, |store, lba, submode| {
        if !submode.contains(Submode::VIDEO) {
            return Ok(());
        }
        if data.is_empty() {
            start_lba = lba;
        }
        data.extend_from_slice(&take_payload(store, lba)?);
        if submode.contains(Submode::EOR) {
            sink(RawVideoFrame {
                index: count,
                start_lba,
                data: std::mem::take(&mut data),
            })?;
            count += 1;
        }
        Ok(())
    })?;

    if !data.is_empty() {
        warn!("{}: 最后一帧没有 EOR 标记", record.identifier);
        sink(RawVideoFrame {
            index: count,
            start_lba,
            data,
        })?;
        count += 1;
    }
    info!("{}: 提取 {} 帧视频", record.identifier, count);
    Ok(count)
}

/// 去掉每个 0x800 字节分块的首字节
pub fn strip_frame_padding(frame: &[u8]) -> Vec<u8> {
    frame
        .chunks(FRAME_CHUNK_SIZE)
        .flat_map(|chunk| chunk.iter().skip(1).copied())
        .collect()
}

/// 用头信息快照解码文件中的视频帧, 每帧调用一次 `sink`, 返回成功解码的帧数
///
/// 单帧解码失败只记录错误并跳过.
pub fn decode_video_frames<F>(
    image: &mut IsoImage,
    record: &DirectoryRecord,
    config: &JpegHeaderConfig,
    mut sink: F,
) -> PdxResult<usize>
where
    F: FnMut(usize, VideoFrame) -> PdxResult<()>,
{
    let mut decoder = JpegDecoder::with_config(config)?;
    let mut decoded = 0;
    extract_video(image, record, |raw| {
        let mut packet = Packet::from_data(strip_frame_padding(&raw.data));
        packet.pts = raw.index as i64;
        packet.pos = raw.start_lba as i64;
        let result = decoder
            .send_packet(&packet)
            .and_then(|_| decoder.receive_frame());
        match result {
            Ok(Frame::Video(frame)) => {
                decoded += 1;
                sink(raw.index, frame)
            }
            Ok(Frame::Audio(_)) => Err(PdxError::Internal("JPEG 解码器输出了音频帧".into())),
            Err(e) => {
                warn!("{} 帧 {} (LBA {}): 解码失败: {}", record.identifier, raw.index, raw.start_lba, e);
                Ok(())
            }
        }
    })?;
    Ok(decoded)
}
