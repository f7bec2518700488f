//! 编解码器标识符.

use std::fmt;

/// 编解码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知编解码器
    None,
    /// CD-ROM XA ADPCM (4 位预测编码音频)
    XaAdpcm,
    /// JPEG (基线 Huffman)
    Jpeg,
}

impl CodecId {
    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::XaAdpcm => "adpcm_xa",
            Self::Jpeg => "jpeg",
        }
    }

    /// 是否为音频编解码器
    pub const fn is_audio(&self) -> bool {
        matches!(self, Self::XaAdpcm)
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
