//! WAV (RIFF WAVE) 写入器.
//!
//! 写入流程:
//! 1. `new()` - 写入 RIFF 和 fmt 块, 预留 data 块大小
//! 2. `write_samples()` - 追加 16 位 PCM 采样
//! 3. `finish()` - 回填 RIFF 大小和 data 块大小

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;
use pdx_core::{PdxError, PdxResult};

/// WAV 音频格式码: PCM 整数
const WAV_FORMAT_PCM: u16 = 0x0001;
/// 位深
const BITS_PER_SAMPLE: u16 = 16;
/// RIFF 大小字段偏移
const RIFF_SIZE_OFFSET: u64 = 4;
/// data 块大小字段偏移
const DATA_SIZE_OFFSET: u64 = 40;

/// 16 位 PCM WAV 写入器
pub struct WavWriter<W: Write + Seek> {
    /// 输出
    inner: W,
    /// 声道数
    channels: u16,
    /// 已写入的数据字节数
    data_written: u64,
}

impl<W: Write + Seek> WavWriter<W> {
    /// 写入文件头, 返回写入器
    pub fn new(mut inner: W, sample_rate: u32, channels: u16) -> PdxResult<Self> {
        if channels == 0 || sample_rate == 0 {
            return Err(PdxError::InvalidArgument(format!(
                "WAV 参数无效: {} Hz, {} 声道",
                sample_rate, channels
            )));
        }
        let block_align = channels * (BITS_PER_SAMPLE / 8);
        let byte_rate = sample_rate * u32::from(block_align);

        // RIFF 头
        inner.write_all(b"RIFF")?;
        inner.write_u32::<LittleEndian>(0)?; // 占位, finish 中回填
        inner.write_all(b"WAVE")?;

        // fmt 块
        inner.write_all(b"fmt ")?;
        inner.write_u32::<LittleEndian>(16)?; // 标准 PCM fmt 块大小
        inner.write_u16::<LittleEndian>(WAV_FORMAT_PCM)?;
        inner.write_u16::<LittleEndian>(channels)?;
        inner.write_u32::<LittleEndian>(sample_rate)?;
        inner.write_u32::<LittleEndian>(byte_rate)?;
        inner.write_u16::<LittleEndian>(block_align)?;
        inner.write_u16::<LittleEndian>(BITS_PER_SAMPLE)?;

        // data 块
        inner.write_all(b"data")?;
        inner.write_u32::<LittleEndian>(0)?; // 占位, finish 中回填

        debug!("WAV: {} Hz, {} 声道, 16 位", sample_rate, channels);
        Ok(Self {
            inner,
            channels,
            data_written: 0,
        })
    }

    /// 追加交错排列的采样
    pub fn write_samples(&mut self, samples: &[i16]) -> PdxResult<()> {
        for &s in samples {
            self.inner.write_i16::<LittleEndian>(s)?;
        }
        self.data_written += samples.len() as u64 * 2;
        Ok(())
    }

    /// 已写入的每声道采样数
    pub fn frames_written(&self) -> u64 {
        self.data_written / (2 * u64::from(self.channels))
    }

    /// 回填大小字段, 返回底层输出
    pub fn finish(mut self) -> PdxResult<W> {
        let too_large = || PdxError::InvalidArgument("WAV 数据超过 4 GB".into());
        let data_size = u32::try_from(self.data_written).map_err(|_| too_large())?;
        let riff_size = data_size.checked_add(36).ok_or_else(too_large)?;

        self.inner.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.inner.write_u32::<LittleEndian>(riff_size)?;
        self.inner.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.inner.write_u32::<LittleEndian>(data_size)?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;

        debug!("WAV: 写入完成, {} 字节数据", data_size);
        Ok(self.inner)
    }
}

impl WavWriter<BufWriter<File>> {
    /// 创建 WAV 文件
    pub fn create(path: &Path, sample_rate: u32, channels: u16) -> PdxResult<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), sample_rate, channels)
    }
}

/// 将单声道采样写成 WAV 文件
pub fn write_mono_s16(path: &Path, samples: &[i16], sample_rate: u32) -> PdxResult<()> {
    let mut writer = WavWriter::create(path, sample_rate, 1)?;
    writer.write_samples(samples)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_写入头与数据() {
        let mut w = WavWriter::new(Cursor::new(Vec::new()), 44100, 1).unwrap();
        w.write_samples(&[1, -1, 0x1234]).unwrap();
        assert_eq!(w.frames_written(), 3);
        let data = w.finish().unwrap().into_inner();

        assert_eq!(data.len(), 44 + 6);
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(data[4..8].try_into().unwrap()), 42);
        assert_eq!(&data[8..16], b"WAVEfmt ");
        // 单声道, 44100 Hz, 字节率 88200, 块对齐 2, 16 位
        assert_eq!(u16::from_le_bytes([data[22], data[23]]), 1);
        assert_eq!(u32::from_le_bytes(data[24..28].try_into().unwrap()), 44100);
        assert_eq!(u32::from_le_bytes(data[28..32].try_into().unwrap()), 88200);
        assert_eq!(u16::from_le_bytes([data[32], data[33]]), 2);
        assert_eq!(u16::from_le_bytes([data[34], data[35]]), 16);
        assert_eq!(&data[36..40], b"data");
        assert_eq!(u32::from_le_bytes(data[40..44].try_into().unwrap()), 6);
        assert_eq!(&data[44..], &[0x01, 0x00, 0xFF, 0xFF, 0x34, 0x12]);
    }

    #[test]
    fn test_无效参数() {
        assert!(matches!(
            WavWriter::new(Cursor::new(Vec::new()), 44100, 0),
            Err(PdxError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_写入文件() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track00.wav");
        write_mono_s16(&path, &[0; 100], 44100).unwrap();
        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 44 + 200);
    }
}
