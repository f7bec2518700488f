//! # pdx-format
//!
//! pdx 光盘格式库, 负责从 Playdia / CD-XA 光盘镜像中定位并读取数据.
//!
//! 层次结构 (自底向上):
//! - `io`: 轨道字节流后端 (文件 / 内存);
//! - `disc`: 2352 字节原始扇区、按 LBA 索引的扇区存储、CUE 表;
//! - `iso9660`: 卷描述符与根目录解析;
//! - `extract`: 音频 (XA-ADPCM) 与视频帧提取;
//! - `wav`: 单声道 16 位 PCM WAV 写入.

pub mod disc;
pub mod extract;
pub mod io;
pub mod iso9660;
pub mod wav;

pub use disc::cue::{CueSheet, CueTrack};
pub use disc::sector::{Coding, Sector, SectorHeader, Submode};
pub use disc::store::SectorStore;
pub use io::{FileBackend, IoBackend, MemoryBackend, TrackStream};
pub use iso9660::{DirectoryRecord, IsoImage};
pub use wav::WavWriter;
