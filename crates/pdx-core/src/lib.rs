//! # pdx-core
//!
//! pdx 核心库, 提供基础类型定义、错误处理和比特流工具.
//!
//! 比特流读写器实现了 JPEG 的 0xFF 字节填充约定, 供 Huffman 熵编码与扫描解码共用.

pub mod bitreader;
pub mod bitwriter;
pub mod error;
pub mod pixel_format;
pub mod sample_format;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{PdxError, PdxResult};
pub use pixel_format::PixelFormat;
pub use sample_format::SampleFormat;
