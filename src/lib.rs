//! # pdx
//!
//! 纯 Rust 实现的 Playdia / CD-XA 光盘流提取与解码工具库.
//!
//! - **光盘镜像**: CUE + MODE2/2352 轨道, 按 LBA 访问原始扇区
//! - **文件系统**: ISO9660 卷描述符与根目录, XA 扩展属性
//! - **音频**: XA-ADPCM 解码为 44100 Hz 单声道 PCM, 写出 WAV
//! - **视频**: 基线 JPEG 解码, 支持用头信息快照解码裸扫描数据
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use pdx::format::IsoImage;
//!
//! let mut image = IsoImage::open_cue("disc.cue".as_ref()).unwrap();
//! for record in image.files() {
//!     let data = image.read_file(&record).unwrap();
//!     println!("{}: {} 字节", record.identifier, data.len());
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `pdx-core` | 错误类型, 比特流读写 |
//! | `pdx-codec` | Huffman, XA-ADPCM, JPEG |
//! | `pdx-format` | 扇区, CUE, ISO9660, 流提取, WAV |

/// 核心类型与工具
pub use pdx_core as core;

/// 编解码器
pub use pdx_codec as codec;

/// 光盘格式与流提取
pub use pdx_format as format;

/// 获取 pdx 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置解码器的注册表
pub fn default_codec_registry() -> pdx_codec::CodecRegistry {
    let mut registry = pdx_codec::CodecRegistry::new();
    pdx_codec::register_all(&mut registry);
    registry
}
