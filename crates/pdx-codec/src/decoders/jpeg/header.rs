//! JPEG 段头解析: 标记, JFIF (APP0), SOF, SOS.
//!
//! 帧头中的派生几何量 (最大采样因子, MCU 尺寸, 对齐尺寸, MCU 行列数)
//! 每次按存储字段重新计算, 修改采样因子后无需额外失效处理.

use byteorder::{BigEndian, ByteOrder};
use pdx_core::{PdxError, PdxResult};
use serde::{Deserialize, Serialize};

/// JPEG 标记 (0xFF 之后的字节)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// 图像开始
    Soi,
    /// 图像结束
    Eoi,
    /// 帧开始, 参数为 SOF 编号 (0-15, 不含 DHT/JPG/DAC)
    Sof(u8),
    /// Huffman 表定义
    Dht,
    /// 量化表定义
    Dqt,
    /// 复位间隔定义
    Dri,
    /// 扫描开始
    Sos,
    /// 复位标记 RST0-RST7
    Rst(u8),
    /// 应用段 APP0-APP15
    App(u8),
    /// 注释
    Com,
    /// 行数定义
    Dnl,
    /// 其他标记
    Other(u8),
}

impl Marker {
    /// 由标记字节构造
    pub fn from_byte(b: u8) -> Self {
        match b {
            0xD8 => Self::Soi,
            0xD9 => Self::Eoi,
            0xC4 => Self::Dht,
            0xDB => Self::Dqt,
            0xDD => Self::Dri,
            0xDA => Self::Sos,
            0xDC => Self::Dnl,
            0xFE => Self::Com,
            0xD0..=0xD7 => Self::Rst(b - 0xD0),
            0xE0..=0xEF => Self::App(b - 0xE0),
            // 0xC8 (JPG) 与 0xCC (DAC) 不是帧开始
            0xC0..=0xCF if b != 0xC8 && b != 0xCC => Self::Sof(b - 0xC0),
            _ => Self::Other(b),
        }
    }

    /// 该标记后是否跟随长度字段
    pub fn has_length(&self) -> bool {
        !matches!(self, Self::Soi | Self::Eoi | Self::Rst(_) | Self::Other(0x01))
    }
}

/// 读取段长度 (含长度字段自身) 并返回段负载
pub(crate) fn read_segment(data: &[u8], pos: usize) -> PdxResult<&[u8]> {
    let header = data
        .get(pos..pos + 2)
        .ok_or_else(|| PdxError::InvalidData(format!("偏移 {} 处段长度被截断", pos)))?;
    let len = BigEndian::read_u16(header) as usize;
    if len < 2 {
        return Err(PdxError::InvalidData(format!("段长度 {} 过小", len)));
    }
    data.get(pos + 2..pos + len).ok_or_else(|| {
        PdxError::InvalidData(format!(
            "偏移 {} 处段长度 {} 超出数据 ({} 字节)",
            pos,
            len,
            data.len()
        ))
    })
}

/// JFIF 密度单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DensityUnit {
    /// 无单位 (仅宽高比)
    #[default]
    None,
    /// 每英寸点数
    Inch,
    /// 每厘米点数
    Cm,
}

impl TryFrom<u8> for DensityUnit {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::None),
            1 => Ok(Self::Inch),
            2 => Ok(Self::Cm),
            _ => Err(format!("无效的 JFIF 密度单位: {}", v)),
        }
    }
}

impl From<DensityUnit> for u8 {
    fn from(u: DensityUnit) -> u8 {
        match u {
            DensityUnit::None => 0,
            DensityUnit::Inch => 1,
            DensityUnit::Cm => 2,
        }
    }
}

/// JFIF 头 (APP0)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JfifHeader {
    /// 标识与版本, 如 "JFIF v1.2"
    #[serde(rename = "Version")]
    pub version: String,
    /// 密度单位
    #[serde(rename = "Unit")]
    pub unit: DensityUnit,
    /// 水平密度
    #[serde(rename = "DensityH")]
    pub density_h: u16,
    /// 垂直密度
    #[serde(rename = "DensityV")]
    pub density_v: u16,
    /// 缩略图宽度
    #[serde(rename = "ThumbW")]
    pub thumb_w: u8,
    /// 缩略图高度
    #[serde(rename = "ThumbH")]
    pub thumb_h: u8,
    /// 缩略图 RGB 数据
    #[serde(
        rename = "ThumbData",
        alias = "Thumbdata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thumb_data: Option<Vec<u8>>,
}

impl JfifHeader {
    /// 解析 APP0 段负载
    pub fn parse(data: &[u8]) -> PdxResult<Self> {
        if data.len() < 14 {
            return Err(PdxError::InvalidData(format!(
                "JFIF 头过短: {} 字节",
                data.len()
            )));
        }
        let ident = String::from_utf8_lossy(&data[0..4]).into_owned();
        let unit = DensityUnit::try_from(data[7]).map_err(PdxError::InvalidData)?;
        let thumb_w = data[12];
        let thumb_h = data[13];
        let thumb_len = 3 * thumb_w as usize * thumb_h as usize;
        let thumb_data = if thumb_len > 0 {
            let bytes = data.get(14..14 + thumb_len).ok_or_else(|| {
                PdxError::InvalidData(format!("JFIF 缩略图数据不足 {} 字节", thumb_len))
            })?;
            Some(bytes.to_vec())
        } else {
            None
        };

        Ok(Self {
            version: format!("{} v{}.{}", ident, data[5], data[6]),
            unit,
            density_h: BigEndian::read_u16(&data[8..10]),
            density_v: BigEndian::read_u16(&data[10..12]),
            thumb_w,
            thumb_h,
            thumb_data,
        })
    }
}

/// 帧分量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameComponent {
    /// 分量名 ("Y", "Cb", "Cr"), 仅用于显示
    #[serde(rename = "Name", default)]
    pub name: String,
    /// 分量标识
    #[serde(rename = "Id")]
    pub id: u8,
    /// 水平采样因子 (1-4)
    #[serde(rename = "SamplingFactorH")]
    pub h: u8,
    /// 垂直采样因子 (1-4)
    #[serde(rename = "SamplingFactorV")]
    pub v: u8,
    /// 量化表编号
    #[serde(rename = "QuantizationId")]
    pub quant_id: u8,
}

/// 按位置给分量命名
fn component_name(index: usize) -> String {
    match index {
        0 => "Y".into(),
        1 => "Cb".into(),
        2 => "Cr".into(),
        n => format!("C{}", n),
    }
}

fn check_sampling_factor(value: u8, what: &str) -> PdxResult<()> {
    if (1..=4).contains(&value) {
        Ok(())
    } else {
        Err(PdxError::InvalidData(format!(
            "{} 采样因子 {} 超出 1..=4",
            what, value
        )))
    }
}

/// 帧头 (SOF0/SOF1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOfFrame {
    /// 采样精度 (位)
    #[serde(rename = "Precision")]
    pub precision: u8,
    /// 图像高度
    #[serde(rename = "Height")]
    pub height: u16,
    /// 图像宽度
    #[serde(rename = "Width")]
    pub width: u16,
    /// 分量列表, 按帧头中的顺序
    #[serde(rename = "Components")]
    pub components: Vec<FrameComponent>,
}

impl StartOfFrame {
    /// 解析 SOF 段负载
    pub fn parse(data: &[u8]) -> PdxResult<Self> {
        if data.len() < 6 {
            return Err(PdxError::InvalidData(format!(
                "SOF 段过短: {} 字节",
                data.len()
            )));
        }
        let count = data[5] as usize;
        let body = data.get(6..6 + count * 3).ok_or_else(|| {
            PdxError::InvalidData(format!("SOF 段声明 {} 个分量但数据不足", count))
        })?;
        let components = body
            .chunks_exact(3)
            .enumerate()
            .map(|(i, c)| FrameComponent {
                name: component_name(i),
                id: c[0],
                h: c[1] >> 4,
                v: c[1] & 0x0F,
                quant_id: c[2],
            })
            .collect();

        let sof = Self {
            precision: data[0],
            height: BigEndian::read_u16(&data[1..3]),
            width: BigEndian::read_u16(&data[3..5]),
            components,
        };
        sof.validate()?;
        Ok(sof)
    }

    /// 检查尺寸与采样因子
    pub fn validate(&self) -> PdxResult<()> {
        if self.components.is_empty() {
            return Err(PdxError::InvalidData("SOF 没有任何分量".into()));
        }
        if self.width == 0 {
            return Err(PdxError::InvalidData("SOF 宽度为 0".into()));
        }
        if self.height == 0 {
            return Err(PdxError::Unsupported("高度由 DNL 段给出的帧".into()));
        }
        for c in &self.components {
            check_sampling_factor(c.h, "水平")?;
            check_sampling_factor(c.v, "垂直")?;
        }
        Ok(())
    }

    /// 修改指定分量的采样因子 (诊断用)
    pub fn set_sampling_factors(&mut self, index: usize, h: u8, v: u8) -> PdxResult<()> {
        check_sampling_factor(h, "水平")?;
        check_sampling_factor(v, "垂直")?;
        let len = self.components.len();
        let component = self
            .components
            .get_mut(index)
            .ok_or(PdxError::OutOfRange {
                what: "帧分量",
                index,
                len,
            })?;
        component.h = h;
        component.v = v;
        Ok(())
    }

    /// 最大水平采样因子
    pub fn max_h(&self) -> u8 {
        self.components.iter().map(|c| c.h).max().unwrap_or(1)
    }

    /// 最大垂直采样因子
    pub fn max_v(&self) -> u8 {
        self.components.iter().map(|c| c.v).max().unwrap_or(1)
    }

    /// MCU 像素宽度
    pub fn mcu_width(&self) -> usize {
        self.max_h() as usize * 8
    }

    /// MCU 像素高度
    pub fn mcu_height(&self) -> usize {
        self.max_v() as usize * 8
    }

    /// 向上对齐到 MCU 宽度的图像宽度
    pub fn aligned_width(&self) -> usize {
        (self.width as usize).div_ceil(self.mcu_width()) * self.mcu_width()
    }

    /// 向上对齐到 MCU 高度的图像高度
    pub fn aligned_height(&self) -> usize {
        (self.height as usize).div_ceil(self.mcu_height()) * self.mcu_height()
    }

    /// MCU 列数
    pub fn mcu_columns(&self) -> usize {
        self.aligned_width() / self.mcu_width()
    }

    /// MCU 行数
    pub fn mcu_rows(&self) -> usize {
        self.aligned_height() / self.mcu_height()
    }

    /// MCU 总数
    pub fn mcu_count(&self) -> usize {
        self.mcu_columns() * self.mcu_rows()
    }
}

/// 扫描分量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanComponent {
    /// 分量标识 (对应帧分量的 Id)
    #[serde(rename = "Id")]
    pub id: u8,
    /// DC Huffman 表编号
    #[serde(rename = "HuffmanDCTable")]
    pub dc_table: u8,
    /// AC Huffman 表编号
    #[serde(rename = "HuffmanACTable")]
    pub ac_table: u8,
}

/// 扫描头 (SOS)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOfScan {
    /// 本次扫描包含的分量
    #[serde(rename = "Components")]
    pub components: Vec<ScanComponent>,
}

impl StartOfScan {
    /// 解析 SOS 段负载 (谱选择与逐次逼近字段对基线扫描无意义, 忽略)
    pub fn parse(data: &[u8]) -> PdxResult<Self> {
        let count = *data
            .first()
            .ok_or_else(|| PdxError::InvalidData("SOS 段为空".into()))? as usize;
        if count == 0 || count > 4 {
            return Err(PdxError::InvalidData(format!(
                "SOS 分量数 {} 超出 1..=4",
                count
            )));
        }
        let body = data.get(1..1 + count * 2).ok_or_else(|| {
            PdxError::InvalidData(format!("SOS 段声明 {} 个分量但数据不足", count))
        })?;
        let components = body
            .chunks_exact(2)
            .map(|c| ScanComponent {
                id: c[0],
                dc_table: c[1] >> 4,
                ac_table: c[1] & 0x0F,
            })
            .collect();
        Ok(Self { components })
    }

    /// 找到每个扫描分量对应的帧分量下标
    ///
    /// 优先按 Id 匹配, 找不到时按位置对应.
    pub fn frame_indices(&self, sof: &StartOfFrame) -> PdxResult<Vec<usize>> {
        self.components
            .iter()
            .enumerate()
            .map(|(pos, sc)| {
                sof.components
                    .iter()
                    .position(|fc| fc.id == sc.id)
                    .or_else(|| (pos < sof.components.len()).then_some(pos))
                    .ok_or(PdxError::OutOfRange {
                        what: "帧分量",
                        index: pos,
                        len: sof.components.len(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sof_420() -> StartOfFrame {
        // 精度 8, 高 100, 宽 50, 3 分量: Y 2x2, Cb 1x1, Cr 1x1
        let data = [
            8, 0, 100, 0, 50, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1,
        ];
        StartOfFrame::parse(&data).unwrap()
    }

    #[test]
    fn test_标记分类() {
        assert_eq!(Marker::from_byte(0xD8), Marker::Soi);
        assert_eq!(Marker::from_byte(0xC0), Marker::Sof(0));
        assert_eq!(Marker::from_byte(0xC2), Marker::Sof(2));
        assert_eq!(Marker::from_byte(0xC4), Marker::Dht);
        assert_eq!(Marker::from_byte(0xCC), Marker::Other(0xCC));
        assert_eq!(Marker::from_byte(0xD5), Marker::Rst(5));
        assert_eq!(Marker::from_byte(0xE1), Marker::App(1));
        assert!(!Marker::Rst(0).has_length());
        assert!(Marker::Dqt.has_length());
    }

    #[test]
    fn test_帧头几何() {
        let sof = sof_420();
        assert_eq!(sof.components.len(), 3);
        assert_eq!(sof.components[0].name, "Y");
        assert_eq!(sof.components[2].name, "Cr");
        assert_eq!(sof.max_h(), 2);
        assert_eq!(sof.mcu_width(), 16);
        assert_eq!(sof.mcu_height(), 16);
        assert_eq!(sof.aligned_width(), 64);
        assert_eq!(sof.aligned_height(), 112);
        assert_eq!(sof.mcu_columns(), 4);
        assert_eq!(sof.mcu_rows(), 7);
        assert_eq!(sof.mcu_count(), 28);
    }

    #[test]
    fn test_修改采样因子后几何量随之变化() {
        let mut sof = sof_420();
        sof.set_sampling_factors(0, 1, 1).unwrap();
        assert_eq!(sof.mcu_width(), 8);
        assert_eq!(sof.aligned_width(), 56);
        assert_eq!(sof.mcu_count(), 7 * 13);

        assert!(sof.set_sampling_factors(0, 5, 1).is_err());
        assert!(matches!(
            sof.set_sampling_factors(3, 1, 1),
            Err(PdxError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_非法采样因子() {
        let data = [8, 0, 8, 0, 8, 1, 1, 0x05, 0];
        assert!(StartOfFrame::parse(&data).is_err());
    }

    #[test]
    fn test_解析_jfif() {
        let data = [
            b'J', b'F', b'I', b'F', 0, 1, 2, 1, 0, 72, 0, 72, 1, 1, 10, 20, 30,
        ];
        let jfif = JfifHeader::parse(&data).unwrap();
        assert_eq!(jfif.version, "JFIF v1.2");
        assert_eq!(jfif.unit, DensityUnit::Inch);
        assert_eq!(jfif.density_h, 72);
        assert_eq!(jfif.thumb_data, Some(vec![10, 20, 30]));
    }

    #[test]
    fn test_扫描分量匹配() {
        let sof = sof_420();
        let sos = StartOfScan::parse(&[3, 1, 0x00, 2, 0x11, 9, 0x11]).unwrap();
        assert_eq!(sos.components[1].dc_table, 1);
        assert_eq!(sos.components[1].ac_table, 1);
        // Id 9 不存在, 按位置对应到第 3 个分量
        assert_eq!(sos.frame_indices(&sof).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_段长度越界() {
        let data = [0x00, 0x10, 1, 2];
        assert!(read_segment(&data, 0).is_err());
        let data = [0x00, 0x04, 1, 2];
        assert_eq!(read_segment(&data, 0).unwrap(), &[1, 2]);
    }
}
