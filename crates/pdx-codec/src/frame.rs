//! 解码后的帧数据 (Frame).

use pdx_core::{PixelFormat, SampleFormat};

/// 视频帧
///
/// 打包像素数据, 单平面.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// 像素数据
    pub data: Vec<u8>,
    /// 每行的字节数
    pub linesize: usize,
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 显示时间戳 (帧序号)
    pub pts: i64,
}

impl VideoFrame {
    /// 创建全零的视频帧
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            data: vec![0; pixel_format.frame_size(width, height)],
            linesize: width as usize * pixel_format.bytes_per_pixel(),
            width,
            height,
            pixel_format,
            pts: -1,
        }
    }

    /// 获取 (x, y) 处的像素字节
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.pixel_format.bytes_per_pixel();
        let offset = y as usize * self.linesize + x as usize * bpp;
        &self.data[offset..offset + bpp]
    }
}

/// 音频帧
///
/// 交错排列的小端 PCM 字节.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// 音频采样数据
    pub data: Vec<u8>,
    /// 本帧包含的采样数 (每声道)
    pub nb_samples: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u16,
    /// 采样格式
    pub sample_format: SampleFormat,
    /// 显示时间戳 (以采样为单位)
    pub pts: i64,
}

impl AudioFrame {
    /// 由 S16 采样创建音频帧
    pub fn from_s16(samples: &[i16], sample_rate: u32, channels: u16) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        Self {
            data,
            nb_samples: (samples.len() / channels.max(1) as usize) as u32,
            sample_rate,
            channels,
            sample_format: SampleFormat::S16,
            pts: -1,
        }
    }

    /// 以 i16 读出全部采样
    pub fn samples_s16(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }
}

/// 帧 (视频帧或音频帧的统一包装)
#[derive(Debug, Clone)]
pub enum Frame {
    /// 视频帧
    Video(VideoFrame),
    /// 音频帧
    Audio(AudioFrame),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_音频帧_s16_往返() {
        let frame = AudioFrame::from_s16(&[0, -1, 32767, -32768], 44100, 1);
        assert_eq!(frame.nb_samples, 4);
        assert_eq!(frame.data.len(), 8);
        assert_eq!(frame.samples_s16(), vec![0, -1, 32767, -32768]);
    }

    #[test]
    fn test_视频帧像素访问() {
        let mut frame = VideoFrame::new(4, 2, PixelFormat::Rgb24);
        assert_eq!(frame.linesize, 12);
        frame.data[12 + 3..12 + 6].copy_from_slice(&[1, 2, 3]);
        assert_eq!(frame.pixel(1, 1), &[1, 2, 3]);
    }
}
