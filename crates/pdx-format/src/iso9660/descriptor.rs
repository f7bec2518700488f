//! ISO9660 卷描述符.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use pdx_core::{PdxError, PdxResult};

use super::directory::DirectoryRecord;

/// 标准标识
pub const STANDARD_IDENTIFIER: &[u8; 5] = b"CD001";

/// 卷描述符类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDescriptorType {
    /// 引导记录
    Boot,
    /// 主卷描述符
    Primary,
    /// 补充卷描述符
    Supplementary,
    /// 卷分区描述符
    Partition,
    /// 描述符集终止符
    SetTerminator,
    /// 未知类型
    Other(u8),
}

impl VolumeDescriptorType {
    /// 从类型字节解析
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => Self::Boot,
            1 => Self::Primary,
            2 => Self::Supplementary,
            3 => Self::Partition,
            255 => Self::SetTerminator,
            other => Self::Other(other),
        }
    }
}

/// 卷描述符公共头 (7 字节)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeDescriptor {
    /// 类型
    pub kind: VolumeDescriptorType,
    /// 标准标识 (应为 "CD001")
    pub identifier: [u8; 5],
    /// 版本
    pub version: u8,
}

impl VolumeDescriptor {
    /// 解析描述符公共头
    pub fn parse(data: &[u8]) -> PdxResult<Self> {
        if data.len() < 7 {
            return Err(PdxError::Format("卷描述符过短".into()));
        }
        let mut identifier = [0u8; 5];
        identifier.copy_from_slice(&data[1..6]);
        Ok(Self {
            kind: VolumeDescriptorType::from_byte(data[0]),
            identifier,
            version: data[6],
        })
    }

    /// 标准标识是否为 "CD001"
    pub fn is_standard(&self) -> bool {
        &self.identifier == STANDARD_IDENTIFIER
    }
}

/// 解析 17 字节文本时间 "YYYYMMDDHHMMSScc" + 时区字节
///
/// 年份为 0 或字段不是数字时视为未记录.
pub fn parse_text_date(data: &[u8]) -> Option<DateTime<FixedOffset>> {
    if data.len() < 17 {
        return None;
    }
    let field = |range: std::ops::Range<usize>| -> Option<u32> {
        std::str::from_utf8(&data[range]).ok()?.parse().ok()
    };
    let year = field(0..4)?;
    if year == 0 {
        return None;
    }
    let offset = FixedOffset::east_opt(i32::from(data[16] as i8) * 15 * 60)?;
    let time = NaiveDate::from_ymd_opt(year as i32, field(4..6)?, field(6..8)?)?
        .and_hms_opt(field(8..10)?, field(10..12)?, field(12..14)?)?
        + Duration::milliseconds(i64::from(field(14..16)?) * 10);
    time.and_local_timezone(offset).single()
}

fn text_field(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim_end().to_string()
}

/// 主卷描述符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryVolumeDescriptor {
    /// 公共头
    pub header: VolumeDescriptor,
    /// 系统标识
    pub system_id: String,
    /// 卷标识
    pub volume_id: String,
    /// 卷空间大小 (逻辑块数)
    pub space_size: u32,
    /// 卷集大小
    pub set_size: u16,
    /// 卷序号
    pub sequence_number: u16,
    /// 逻辑块大小
    pub block_size: u16,
    /// 路径表大小
    pub path_table_size: u32,
    /// L 型路径表 LBA
    pub path_table_lba: u32,
    /// 可选 L 型路径表 LBA
    pub optional_path_table_lba: u32,
    /// 根目录记录
    pub root: DirectoryRecord,
    /// 卷集标识
    pub volume_set_id: String,
    /// 发行者标识
    pub publisher_id: String,
    /// 数据准备者标识
    pub preparer_id: String,
    /// 应用程序标识
    pub application_id: String,
    /// 版权文件标识
    pub copyright_file_id: String,
    /// 摘要文件标识
    pub abstract_file_id: String,
    /// 书目文件标识
    pub bibliographic_file_id: String,
    /// 创建时间
    pub creation: Option<DateTime<FixedOffset>>,
    /// 修改时间
    pub modification: Option<DateTime<FixedOffset>>,
    /// 过期时间
    pub expiration: Option<DateTime<FixedOffset>>,
    /// 生效时间
    pub effective: Option<DateTime<FixedOffset>>,
    /// 文件结构版本
    pub file_structure_version: u8,
    /// 应用程序使用区 (512 字节)
    pub application_use: Vec<u8>,
}

/// 主卷描述符最小长度
const PVD_SIZE: usize = 1395;

impl PrimaryVolumeDescriptor {
    /// 解析主卷描述符 (2048 字节扇区负载)
    pub fn parse(data: &[u8]) -> PdxResult<Self> {
        if data.len() < PVD_SIZE {
            return Err(PdxError::Format(format!(
                "主卷描述符过短: {} 字节",
                data.len()
            )));
        }
        Ok(Self {
            header: VolumeDescriptor::parse(data)?,
            system_id: text_field(&data[8..40]),
            volume_id: text_field(&data[40..72]),
            space_size: LittleEndian::read_u32(&data[80..84]),
            set_size: LittleEndian::read_u16(&data[120..122]),
            sequence_number: LittleEndian::read_u16(&data[124..126]),
            block_size: LittleEndian::read_u16(&data[128..130]),
            path_table_size: LittleEndian::read_u32(&data[132..136]),
            path_table_lba: LittleEndian::read_u32(&data[140..144]),
            optional_path_table_lba: LittleEndian::read_u32(&data[144..148]),
            root: DirectoryRecord::parse(&data[156..190])?,
            volume_set_id: text_field(&data[190..318]),
            publisher_id: text_field(&data[318..446]),
            preparer_id: text_field(&data[446..574]),
            application_id: text_field(&data[574..702]),
            copyright_file_id: text_field(&data[702..739]),
            abstract_file_id: text_field(&data[739..776]),
            bibliographic_file_id: text_field(&data[776..813]),
            creation: parse_text_date(&data[813..830]),
            modification: parse_text_date(&data[830..847]),
            expiration: parse_text_date(&data[847..864]),
            effective: parse_text_date(&data[864..881]),
            file_structure_version: data[881],
            application_use: data[883..1395].to_vec(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::iso9660::directory::tests::record;
    use chrono::Timelike;

    /// 构造 2048 字节的主卷描述符
    pub(crate) fn pvd(volume_id: &str, space_size: u32, root_extent: u32) -> Vec<u8> {
        let mut d = vec![0u8; 2048];
        d[0] = 1;
        d[1..6].copy_from_slice(STANDARD_IDENTIFIER);
        d[6] = 1;
        d[8..40].fill(b' ');
        d[8..16].copy_from_slice(b"PLAYDIA ");
        d[40..72].fill(b' ');
        d[40..40 + volume_id.len()].copy_from_slice(volume_id.as_bytes());
        d[80..84].copy_from_slice(&space_size.to_le_bytes());
        d[84..88].copy_from_slice(&space_size.to_be_bytes());
        d[120..122].copy_from_slice(&1u16.to_le_bytes());
        d[124..126].copy_from_slice(&1u16.to_le_bytes());
        d[128..130].copy_from_slice(&2048u16.to_le_bytes());
        d[140..144].copy_from_slice(&18u32.to_le_bytes());
        let root = record(&[0x00], root_extent, 2048, 0x02, None);
        d[156..156 + root.len()].copy_from_slice(&root);
        d[813..830].copy_from_slice(b"1995061512304500\x24");
        d[830..847].copy_from_slice(b"0000000000000000\x00");
        d[881] = 1;
        d
    }

    /// 构造只有公共头的描述符
    pub(crate) fn descriptor(kind: u8) -> Vec<u8> {
        let mut d = vec![0u8; 2048];
        d[0] = kind;
        d[1..6].copy_from_slice(STANDARD_IDENTIFIER);
        d[6] = 1;
        d
    }

    #[test]
    fn test_描述符类型() {
        assert_eq!(VolumeDescriptorType::from_byte(1), VolumeDescriptorType::Primary);
        assert_eq!(VolumeDescriptorType::from_byte(255), VolumeDescriptorType::SetTerminator);
        assert_eq!(VolumeDescriptorType::from_byte(9), VolumeDescriptorType::Other(9));
        let vd = VolumeDescriptor::parse(&descriptor(255)).unwrap();
        assert!(vd.is_standard());
        assert_eq!(vd.kind, VolumeDescriptorType::SetTerminator);
    }

    #[test]
    fn test_解析主卷描述符() {
        let p = PrimaryVolumeDescriptor::parse(&pvd("DBZ", 1000, 22)).unwrap();
        assert_eq!(p.system_id, "PLAYDIA");
        assert_eq!(p.volume_id, "DBZ");
        assert_eq!(p.space_size, 1000);
        assert_eq!(p.block_size, 2048);
        assert_eq!(p.path_table_lba, 18);
        assert_eq!(p.root.extent, 22);
        assert_eq!(p.root.identifier, ".");
        assert!(p.root.is_directory());
        assert_eq!(p.application_use.len(), 512);
        assert!(p.modification.is_none());

        let created = p.creation.unwrap();
        assert_eq!((created.hour(), created.minute(), created.second()), (12, 30, 45));
        assert_eq!(created.offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_文本时间百分秒() {
        let date = parse_text_date(b"2001020304050699\x00").unwrap();
        assert_eq!(date.timestamp_subsec_millis(), 990);
        assert!(parse_text_date(b"    0102030405060\x00").is_none());
    }

    #[test]
    fn test_主卷描述符过短() {
        assert!(matches!(
            PrimaryVolumeDescriptor::parse(&[0u8; 100]),
            Err(PdxError::Format(_))
        ));
    }
}
