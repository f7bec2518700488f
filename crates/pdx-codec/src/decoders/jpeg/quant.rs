//! 量化表 (DQT) 与之字形 (zig-zag) 顺序.

use std::sync::OnceLock;

use byteorder::{BigEndian, ByteOrder};
use pdx_core::{PdxError, PdxResult};

use super::idct::FixedIdct;

/// 之字形序号 -> 自然顺序 (行优先) 下标
pub const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// 将之字形顺序的 64 个值还原为自然顺序
pub fn unzigzag<T: Copy + Default>(input: &[T; 64]) -> [T; 64] {
    let mut out = [T::default(); 64];
    for (i, &v) in input.iter().enumerate() {
        out[ZIGZAG[i]] = v;
    }
    out
}

/// 量化表精度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantPrecision {
    /// 8 位
    Bits8,
    /// 16 位
    Bits16,
}

impl QuantPrecision {
    /// 由 DQT 中的 Pq 字段构造
    pub fn from_pq(pq: u8) -> PdxResult<Self> {
        match pq {
            0 => Ok(Self::Bits8),
            1 => Ok(Self::Bits16),
            _ => Err(PdxError::InvalidData(format!("无效的量化表精度: {}", pq))),
        }
    }

    /// DQT 中的 Pq 字段
    pub fn pq(&self) -> u8 {
        match self {
            Self::Bits8 => 0,
            Self::Bits16 => 1,
        }
    }
}

/// 量化表
///
/// 值按自然顺序存放; 对应的 IDCT 缩放表在首次使用时构建.
#[derive(Debug, Clone)]
pub struct QuantizationTable {
    /// 表编号 (0-3)
    pub id: u8,
    /// 精度
    pub precision: QuantPrecision,
    /// 自然顺序的 64 个量化值
    pub values: [u16; 64],
    idct: OnceLock<FixedIdct>,
}

impl QuantizationTable {
    /// 由自然顺序的值构造
    pub fn new(id: u8, precision: QuantPrecision, values: [u16; 64]) -> PdxResult<Self> {
        if id > 3 {
            return Err(PdxError::InvalidData(format!("量化表编号 {} 超出 0..=3", id)));
        }
        Ok(Self {
            id,
            precision,
            values,
            idct: OnceLock::new(),
        })
    }

    /// 绑定的定点 IDCT
    pub fn idct(&self) -> &FixedIdct {
        self.idct.get_or_init(|| FixedIdct::new(&self.values))
    }
}

/// 解析 DQT 段负载, 一个段可包含多张表
pub fn parse_dqt(data: &[u8]) -> PdxResult<Vec<QuantizationTable>> {
    let mut tables = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let precision = QuantPrecision::from_pq(data[pos] >> 4)?;
        let id = data[pos] & 0x0F;
        pos += 1;

        let mut zz = [0u16; 64];
        let size = match precision {
            QuantPrecision::Bits8 => 64,
            QuantPrecision::Bits16 => 128,
        };
        let body = data.get(pos..pos + size).ok_or_else(|| {
            PdxError::InvalidData(format!("DQT 表 {} 数据被截断", id))
        })?;
        match precision {
            QuantPrecision::Bits8 => {
                for (dst, &b) in zz.iter_mut().zip(body) {
                    *dst = u16::from(b);
                }
            }
            QuantPrecision::Bits16 => BigEndian::read_u16_into(body, &mut zz),
        }
        pos += size;

        tables.push(QuantizationTable::new(id, precision, unzigzag(&zz))?);
    }
    Ok(tables)
}
