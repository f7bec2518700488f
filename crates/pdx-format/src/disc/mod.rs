//! CD-XA 光盘镜像: 原始扇区、扇区存储与 CUE 表.

pub mod cue;
pub mod sector;
pub mod store;

/// 原始扇区大小 (字节)
pub const RAW_SECTOR_SIZE: usize = 2352;
/// 扇区头大小: 同步码 12 + 地址/模式 4 + XA 子头 8
pub const SECTOR_HEADER_SIZE: usize = 24;
/// Form 1 负载大小
pub const FORM1_PAYLOAD_SIZE: usize = 2048;
/// Form 2 负载大小
pub const FORM2_PAYLOAD_SIZE: usize = 2324;

/// 标准同步码
pub const SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];
