//! ISO9660 目录记录与 XA 系统使用区扩展.

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{DateTime, FixedOffset, NaiveDate};
use pdx_core::{PdxError, PdxResult};

/// 目录记录固定部分长度 (不含文件标识)
pub const DIRECTORY_RECORD_MIN_SIZE: usize = 33;

bitflags! {
    /// 文件标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileFlags: u8 {
        /// 隐藏 (存在位)
        const EXISTENCE   = 0x01;
        /// 目录
        const DIRECTORY   = 0x02;
        /// 关联文件
        const ASSOCIATED  = 0x04;
        /// 记录格式
        const RECORD      = 0x08;
        /// 权限保护
        const PROTECTION  = 0x10;
        const RESERVED1   = 0x20;
        const RESERVED2   = 0x40;
        /// 多区段
        const MULTI_EXTENT = 0x80;
    }
}

bitflags! {
    /// XA 属性 (权限与文件类型)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct XaAttributes: u16 {
        const OWNER_READ    = 0x0001;
        const OWNER_EXECUTE = 0x0004;
        const GROUP_READ    = 0x0010;
        const GROUP_EXECUTE = 0x0040;
        const WORLD_READ    = 0x0100;
        const WORLD_EXECUTE = 0x0400;
        /// 包含 Form 1 扇区
        const FORM1         = 0x0800;
        /// 包含 Form 2 扇区
        const FORM2         = 0x1000;
        /// 交错存放 (音视频流)
        const INTERLEAVED   = 0x2000;
        /// CD-DA 音轨
        const CDDA          = 0x4000;
        /// 目录
        const DIRECTORY     = 0x8000;
    }
}

/// XA 系统使用区扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XaExtension {
    /// 所有者/组 ID
    pub group_id: u32,
    /// XA 属性
    pub attributes: XaAttributes,
    /// 文件号 (与扇区子头中的文件号对应)
    pub file_number: u8,
}

/// 解析 7 字节二进制时间 (年份自 1900 起, 时区以 15 分钟为单位)
///
/// 年份字节为 0 表示未记录.
pub fn parse_binary_date(data: &[u8]) -> Option<DateTime<FixedOffset>> {
    if data.len() < 7 || data[0] == 0 {
        return None;
    }
    let offset = FixedOffset::east_opt(i32::from(data[6] as i8) * 15 * 60)?;
    NaiveDate::from_ymd_opt(1900 + i32::from(data[0]), u32::from(data[1]), u32::from(data[2]))?
        .and_hms_opt(u32::from(data[3]), u32::from(data[4]), u32::from(data[5]))?
        .and_local_timezone(offset)
        .single()
}

/// 目录记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// 记录长度
    pub length: u8,
    /// 扩展属性记录长度
    pub ext_attr_length: u8,
    /// 数据区起始 LBA
    pub extent: u32,
    /// 数据长度 (字节)
    pub data_length: u32,
    /// 记录时间
    pub recorded: Option<DateTime<FixedOffset>>,
    /// 文件标志
    pub flags: FileFlags,
    /// 交错文件单元大小
    pub file_unit_size: u8,
    /// 交错间隔大小
    pub interleave_gap: u8,
    /// 卷序号
    pub volume_sequence: u16,
    /// 文件标识 (已去掉 `;1` 版本号, `.` / `..` 表示当前/上级目录)
    pub identifier: String,
    /// XA 扩展
    pub xa: Option<XaExtension>,
    /// 子记录 (仅根目录填充)
    pub children: Vec<DirectoryRecord>,
}

impl DirectoryRecord {
    /// 解析一条目录记录
    pub fn parse(data: &[u8]) -> PdxResult<Self> {
        if data.len() < DIRECTORY_RECORD_MIN_SIZE {
            return Err(PdxError::Format(format!(
                "目录记录过短: {} 字节",
                data.len()
            )));
        }
        let id_len = data[32] as usize;
        let id_end = DIRECTORY_RECORD_MIN_SIZE + id_len;
        let Some(raw_id) = data.get(DIRECTORY_RECORD_MIN_SIZE..id_end) else {
            return Err(PdxError::Format(format!(
                "文件标识越界: 长度 {}, 记录 {} 字节",
                id_len,
                data.len()
            )));
        };

        let identifier = match raw_id {
            [0x00] => ".".to_string(),
            [0x01] => "..".to_string(),
            _ => {
                let text = String::from_utf8_lossy(raw_id);
                let name = text.split(';').next().unwrap_or_default();
                name.trim_end().to_string()
            }
        };

        // 文件标识长度为偶数时后跟一个填充字节
        let su_start = id_end + usize::from(id_len % 2 == 0);
        let xa = data.get(su_start..su_start + 9).and_then(|su| {
            (&su[6..8] == b"XA").then(|| XaExtension {
                group_id: BigEndian::read_u32(&su[0..4]),
                attributes: XaAttributes::from_bits_retain(BigEndian::read_u16(&su[4..6])),
                file_number: su[8],
            })
        });

        Ok(Self {
            length: data[0],
            ext_attr_length: data[1],
            extent: LittleEndian::read_u32(&data[2..6]),
            data_length: LittleEndian::read_u32(&data[10..14]),
            recorded: parse_binary_date(&data[18..25]),
            flags: FileFlags::from_bits_retain(data[25]),
            file_unit_size: data[26],
            interleave_gap: data[27],
            volume_sequence: LittleEndian::read_u16(&data[28..30]),
            identifier,
            xa,
            children: Vec::new(),
        })
    }

    /// 是否为目录
    pub fn is_directory(&self) -> bool {
        self.flags.contains(FileFlags::DIRECTORY)
    }

    /// 是否为交错存放的 XA 流 (音视频)
    pub fn is_interleaved(&self) -> bool {
        self.xa
            .is_some_and(|xa| xa.attributes.contains(XaAttributes::INTERLEAVED))
    }
}

impl std::fmt::Display for DirectoryRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<File {} Size {:04X} Date ", self.identifier, self.data_length)?;
        match &self.recorded {
            Some(date) => write!(f, "{}", date)?,
            None => write!(f, "-")?,
        }
        write!(f, " {:?}", self.flags)?;
        match &self.xa {
            Some(xa) => write!(f, " {:?} XAFileId {}>", xa.attributes, xa.file_number),
            None => write!(f, ">"),
        }
    }
}
