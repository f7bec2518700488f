//! 压缩数据包 (Packet).
//!
//! 表示从光盘扇区中取出的一段压缩数据: 一个音频扇区负载或一帧视频数据.

use bytes::Bytes;

/// 压缩数据包
#[derive(Debug, Clone)]
pub struct Packet {
    /// 压缩数据
    pub data: Bytes,
    /// 显示时间戳 (采样数或帧序号, -1 表示未知)
    pub pts: i64,
    /// 数据在镜像中的起始 LBA (-1 表示未知)
    pub pos: i64,
    /// 是否为记录结尾 (扇区子模式 EOR)
    pub end_of_record: bool,
}

impl Packet {
    /// 创建空数据包
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: -1,
            pos: -1,
            end_of_record: false,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包 (flush packet)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
