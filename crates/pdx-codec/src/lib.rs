//! # pdx-codec
//!
//! pdx 编解码器库, 提供 Packet/Frame 抽象与解码器框架.
//!
//! ## 支持的解码器
//!
//! - **XA-ADPCM**: CD-XA 音频扇区 (18 个 128 字节声音组), 输出 44100 Hz 单声道 S16
//! - **JPEG**: 基线 Huffman 编码 JPEG 以及 Playdia 视频帧的裸扫描数据
//!
//! ## 使用示例
//!
//! ```rust
//! use pdx_codec::{CodecId, CodecRegistry};
//!
//! let mut reg = CodecRegistry::new();
//! pdx_codec::register_all(&mut reg);
//!
//! let decoder = reg.create_decoder(CodecId::XaAdpcm).unwrap();
//! assert_eq!(decoder.codec_id(), CodecId::XaAdpcm);
//! ```

pub mod codec_id;
pub mod decoder;
pub mod decoders;
pub mod frame;
pub mod huffman;
pub mod packet;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use decoder::Decoder;
pub use frame::{AudioFrame, Frame, VideoFrame};
pub use huffman::HuffmanCoder;
pub use packet::Packet;
pub use registry::CodecRegistry;

/// 注册所有内置解码器
pub fn register_all(registry: &mut CodecRegistry) {
    decoders::register_all_decoders(registry);
}
