//! CD-XA 原始扇区.
//!
//! 2352 字节布局:
//! - 同步码 12 字节;
//! - 分/秒/块 (BCD) 与模式字节;
//! - XA 子头: 文件号、通道、子模式、编码信息, 后跟 4 字节副本;
//! - 负载 2048 (Form 1) 或 2324 (Form 2) 字节;
//! - 剩余的 EDC/ECC 字节, 原样保存.

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use pdx_core::{PdxError, PdxResult};

use super::{
    FORM1_PAYLOAD_SIZE, FORM2_PAYLOAD_SIZE, RAW_SECTOR_SIZE, SECTOR_HEADER_SIZE,
};

bitflags! {
    /// XA 子模式标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Submode: u8 {
        /// 记录结束
        const EOR     = 0x01;
        /// 视频扇区
        const VIDEO   = 0x02;
        /// 音频扇区
        const AUDIO   = 0x04;
        /// 数据扇区
        const DATA    = 0x08;
        /// 触发
        const TRIGGER = 0x10;
        /// Form 2 负载 (未置位为 Form 1)
        const FORM    = 0x20;
        /// 实时扇区
        const RTS     = 0x40;
        /// 文件结束
        const EOF     = 0x80;
    }
}

bitflags! {
    /// XA 编码信息 (音频扇区)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Coding: u8 {
        /// 立体声
        const STEREO          = 0x01;
        /// 18900 Hz 采样率 (未置位为 37800 Hz)
        const LOW_SAMPLE_RATE = 0x04;
        /// 8 位采样 (未置位为 4 位)
        const EIGHT_BIT       = 0x10;
    }
}

fn bcd(value: u8) -> u8 {
    (value & 0x0F) + 10 * (value >> 4)
}

/// 扇区头 (24 字节) 及其在轨道中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorHeader {
    /// 同步码
    pub sync: [u8; 12],
    /// 分 (BCD)
    pub minute: u8,
    /// 秒 (BCD)
    pub second: u8,
    /// 块 (BCD)
    pub block: u8,
    /// 模式
    pub mode: u8,
    /// 文件号
    pub file_number: u8,
    /// 通道号
    pub channel: u8,
    /// 子模式
    pub submode: Submode,
    /// 编码信息
    pub coding: Coding,
    /// 子头副本 (原样保存)
    pub subheader_copy: u32,
    /// 所属轨道序号
    pub track: usize,
    /// 在轨道中的字节偏移
    pub offset: u64,
}

impl SectorHeader {
    /// 解析 24 字节扇区头
    pub fn parse(data: &[u8], track: usize, offset: u64) -> PdxResult<Self> {
        if data.len() < SECTOR_HEADER_SIZE {
            return Err(PdxError::InvalidData(format!(
                "扇区头需要 {} 字节, 实际 {} 字节",
                SECTOR_HEADER_SIZE,
                data.len()
            )));
        }
        let mut sync = [0u8; 12];
        sync.copy_from_slice(&data[..12]);
        Ok(Self {
            sync,
            minute: data[12],
            second: data[13],
            block: data[14],
            mode: data[15],
            file_number: data[16],
            channel: data[17],
            submode: Submode::from_bits_retain(data[18]),
            coding: Coding::from_bits_retain(data[19]),
            subheader_copy: LittleEndian::read_u32(&data[20..24]),
            track,
            offset,
        })
    }

    /// 解码后的 (分, 秒, 块) 地址
    pub fn msf(&self) -> (u8, u8, u8) {
        (bcd(self.minute), bcd(self.second), bcd(self.block))
    }

    /// 是否为 Form 2 扇区
    pub fn is_form2(&self) -> bool {
        self.submode.contains(Submode::FORM)
    }

    /// 负载长度
    pub fn payload_len(&self) -> usize {
        if self.is_form2() {
            FORM2_PAYLOAD_SIZE
        } else {
            FORM1_PAYLOAD_SIZE
        }
    }

    /// EDC/ECC 长度
    pub fn ecc_len(&self) -> usize {
        RAW_SECTOR_SIZE - SECTOR_HEADER_SIZE - self.payload_len()
    }

    /// 序列化为 24 字节
    pub fn to_bytes(&self) -> [u8; SECTOR_HEADER_SIZE] {
        let mut out = [0u8; SECTOR_HEADER_SIZE];
        out[..12].copy_from_slice(&self.sync);
        out[12..20].copy_from_slice(&[
            self.minute,
            self.second,
            self.block,
            self.mode,
            self.file_number,
            self.channel,
            self.submode.bits(),
            self.coding.bits(),
        ]);
        LittleEndian::write_u32(&mut out[20..24], self.subheader_copy);
        out
    }
}

impl std::fmt::Display for SectorHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Sector Mode {} File {} Channel {} {:?} {:?}>",
            self.mode, self.file_number, self.channel, self.submode, self.coding
        )
    }
}

/// 扇区: 头 + 按需读取的负载与 EDC/ECC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    /// 扇区头
    pub header: SectorHeader,
    /// 负载 (未读取时为 None)
    pub data: Option<Bytes>,
    /// EDC/ECC (未读取时为 None)
    pub ecc: Option<Bytes>,
}

impl Sector {
    /// 只含扇区头的扇区
    pub fn from_header(header: SectorHeader) -> Self {
        Self {
            header,
            data: None,
            ecc: None,
        }
    }

    /// 负载是否已读取
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// 负载数据 (未读取时为空)
    pub fn payload(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// 重新序列化为 2352 字节原始扇区
    pub fn to_bytes(&self) -> PdxResult<Vec<u8>> {
        let (Some(data), Some(ecc)) = (&self.data, &self.ecc) else {
            return Err(PdxError::InvalidData("扇区负载尚未读取".into()));
        };
        let mut out = Vec::with_capacity(RAW_SECTOR_SIZE);
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(ecc);
        Ok(out)
    }
}
