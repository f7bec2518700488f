//! 音频采样格式定义.
//!
//! XA-ADPCM 解码输出有符号 16 位 PCM.

use std::fmt;

/// 音频采样格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum SampleFormat {
    /// 未指定
    #[default]
    None,
    /// 有符号 16 位整数, 交错
    S16,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::S16 => 2,
        }
    }

    /// 每个采样点的位深
    pub const fn bits_per_sample(&self) -> u16 {
        (self.bytes_per_sample() * 8) as u16
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::S16 => "s16",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s16_位深() {
        assert_eq!(SampleFormat::S16.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::S16.bits_per_sample(), 16);
        assert_eq!(SampleFormat::default(), SampleFormat::None);
        assert_eq!(SampleFormat::S16.to_string(), "s16");
    }
}
