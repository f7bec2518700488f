//! 像素格式定义.
//!
//! JPEG 扫描解码输出打包 RGB, 单分量灰度图同样展开为 RGB.

use std::fmt;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定
    #[default]
    None,
    /// RGB 各 8 位, 打包
    Rgb24,
}

impl PixelFormat {
    /// 每个像素占用的字节数
    pub const fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Rgb24 => 3,
        }
    }

    /// 计算指定尺寸的帧数据大小 (字节)
    pub const fn frame_size(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Rgb24 => "rgb24",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_帧大小() {
        assert_eq!(PixelFormat::Rgb24.frame_size(16, 8), 16 * 8 * 3);
        assert_eq!(PixelFormat::Rgb24.to_string(), "rgb24");
        assert_eq!(PixelFormat::None.frame_size(16, 8), 0);
    }
}
