//! JPEG 头信息快照 (JSON).
//!
//! 保存 APP0/DQT/DHT/DRI/SOF/SOS, 使裸扫描数据 (Playdia 视频帧) 可以反复
//! 用同一组头信息解码, 而无需重新解析 JPEG 段流.

use pdx_core::{PdxError, PdxResult};
use serde::{Deserialize, Serialize};

use super::header::{JfifHeader, StartOfFrame, StartOfScan};
use super::quant::{QuantPrecision, QuantizationTable};
use super::tables::{HuffmanClass, HuffmanTable, JpegTables};

/// Huffman 表快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuffmanTableConfig {
    /// 表编号
    #[serde(rename = "Id")]
    pub id: u8,
    /// 码长 1-16 的码字个数
    #[serde(rename = "Counts")]
    pub counts: [u8; 16],
    /// 按码长升序排列的符号
    #[serde(rename = "Symbols")]
    pub symbols: Vec<u8>,
}

impl From<&HuffmanTable> for HuffmanTableConfig {
    fn from(t: &HuffmanTable) -> Self {
        Self {
            id: t.id,
            counts: t.counts,
            symbols: t.symbols.clone(),
        }
    }
}

/// DC/AC 两类 Huffman 表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuffmanTablesConfig {
    /// 直流表
    #[serde(rename = "DC")]
    pub dc: Vec<HuffmanTableConfig>,
    /// 交流表
    #[serde(rename = "AC")]
    pub ac: Vec<HuffmanTableConfig>,
}

/// 量化表快照 (自然顺序)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizationTableConfig {
    /// 表编号
    #[serde(rename = "Id")]
    pub id: u8,
    /// 精度 (0 = 8 位, 1 = 16 位)
    #[serde(rename = "TableType")]
    pub table_type: u8,
    /// 64 个量化值, 自然顺序
    #[serde(rename = "Table")]
    pub table: Vec<u16>,
}

impl From<&QuantizationTable> for QuantizationTableConfig {
    fn from(q: &QuantizationTable) -> Self {
        Self {
            id: q.id,
            table_type: q.precision.pq(),
            table: q.values.to_vec(),
        }
    }
}

/// 完整的 JPEG 头信息快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JpegHeaderConfig {
    /// JFIF 头
    #[serde(rename = "APP0", default, skip_serializing_if = "Option::is_none")]
    pub app0: Option<JfifHeader>,
    /// Huffman 表
    #[serde(rename = "DHT")]
    pub dht: HuffmanTablesConfig,
    /// 量化表
    #[serde(rename = "DQT")]
    pub dqt: Vec<QuantizationTableConfig>,
    /// 复位间隔 (MCU 数, 0 表示不使用)
    #[serde(rename = "DRI", default)]
    pub dri: u16,
    /// 帧头
    #[serde(rename = "SOF")]
    pub sof: StartOfFrame,
    /// 扫描头
    #[serde(rename = "SOS")]
    pub sos: StartOfScan,
}

impl JpegHeaderConfig {
    /// 从已解析的头信息生成快照
    pub fn capture(
        app0: Option<&JfifHeader>,
        tables: &JpegTables,
        dri: u16,
        sof: &StartOfFrame,
        sos: &StartOfScan,
    ) -> Self {
        Self {
            app0: app0.cloned(),
            dht: HuffmanTablesConfig {
                dc: tables
                    .huffman_tables(HuffmanClass::Dc)
                    .map(HuffmanTableConfig::from)
                    .collect(),
                ac: tables
                    .huffman_tables(HuffmanClass::Ac)
                    .map(HuffmanTableConfig::from)
                    .collect(),
            },
            dqt: tables.quant_tables().map(QuantizationTableConfig::from).collect(),
            dri,
            sof: sof.clone(),
            sos: sos.clone(),
        }
    }

    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> PdxResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| PdxError::InvalidData(format!("JPEG 头信息 JSON 无效: {}", e)))?;
        config.sof.validate()?;
        Ok(config)
    }

    /// 序列化为格式化的 JSON 文本
    pub fn to_json(&self) -> PdxResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PdxError::Internal(format!("JPEG 头信息序列化失败: {}", e)))
    }

    /// 构建量化表与 Huffman 表
    pub fn build_tables(&self) -> PdxResult<JpegTables> {
        let mut tables = JpegTables::new();
        for q in &self.dqt {
            let values: [u16; 64] = q.table.as_slice().try_into().map_err(|_| {
                PdxError::InvalidData(format!(
                    "量化表 {} 应有 64 个值, 实际 {} 个",
                    q.id,
                    q.table.len()
                ))
            })?;
            let precision = QuantPrecision::from_pq(q.table_type)?;
            tables.set_quant(QuantizationTable::new(q.id, precision, values)?);
        }
        for (class, list) in [
            (HuffmanClass::Dc, &self.dht.dc),
            (HuffmanClass::Ac, &self.dht.ac),
        ] {
            for h in list {
                tables.set_huffman(HuffmanTable::new(class, h.id, h.counts, h.symbols.clone())?);
            }
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "DHT": {
            "DC": [{"Id": 0, "Counts": [0,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0], "Symbols": [0]}],
            "AC": [{"Id": 0, "Counts": [0,0,0,1,0,0,0,0,0,0,0,0,0,0,0,0], "Symbols": [0]}]
        },
        "DQT": [{"Id": 0, "TableType": 0, "Table": [16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16,16]}],
        "DRI": 0,
        "SOF": {"Precision": 8, "Height": 8, "Width": 8, "Components": [
            {"Name": "Y", "Id": 1, "SamplingFactorH": 1, "SamplingFactorV": 1, "QuantizationId": 0}
        ]},
        "SOS": {"Components": [{"Id": 1, "HuffmanDCTable": 0, "HuffmanACTable": 0}]}
    }"#;

    #[test]
    fn test_解析_json_快照() {
        let config = JpegHeaderConfig::from_json(SAMPLE).unwrap();
        assert!(config.app0.is_none());
        assert_eq!(config.sof.width, 8);
        assert_eq!(config.sos.components[0].id, 1);

        let tables = config.build_tables().unwrap();
        assert_eq!(tables.quant(0).unwrap().values[63], 16);
        assert_eq!(
            tables.dc(0).unwrap().coder.codes(),
            vec![("00".to_string(), 0)]
        );
    }

    #[test]
    fn test_快照往返() {
        let config = JpegHeaderConfig::from_json(SAMPLE).unwrap();
        let text = config.to_json().unwrap();
        assert!(text.contains("\"SamplingFactorH\""));
        assert_eq!(JpegHeaderConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_量化表长度错误() {
        let mut config = JpegHeaderConfig::from_json(SAMPLE).unwrap();
        config.dqt[0].table.pop();
        assert!(matches!(
            config.build_tables(),
            Err(PdxError::InvalidData(_))
        ));
    }

    #[test]
    fn test_无效_json() {
        assert!(matches!(
            JpegHeaderConfig::from_json("{\"DQT\": 5}"),
            Err(PdxError::InvalidData(_))
        ));
    }
}
