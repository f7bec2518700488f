//! Huffman 表 (DHT) 与按编号索引的表集合.

use pdx_core::{PdxError, PdxResult};

use super::quant::QuantizationTable;
use crate::huffman::HuffmanCoder;

/// Huffman 表类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanClass {
    /// 直流
    Dc,
    /// 交流
    Ac,
}

/// 一张 DHT Huffman 表, 保留原始码长计数以便导出
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// 类别
    pub class: HuffmanClass,
    /// 表编号 (0-3)
    pub id: u8,
    /// 码长 1-16 的码字个数
    pub counts: [u8; 16],
    /// 按码长升序排列的符号
    pub symbols: Vec<u8>,
    /// 构建好的码树
    pub coder: HuffmanCoder,
}

impl HuffmanTable {
    /// 由码长计数与符号构建
    pub fn new(class: HuffmanClass, id: u8, counts: [u8; 16], symbols: Vec<u8>) -> PdxResult<Self> {
        if id > 3 {
            return Err(PdxError::InvalidData(format!(
                "Huffman 表编号 {} 超出 0..=3",
                id
            )));
        }
        let coder = HuffmanCoder::from_dht_counts(&counts, &symbols)?;
        Ok(Self {
            class,
            id,
            counts,
            symbols,
            coder,
        })
    }
}

/// 解析 DHT 段负载, 一个段可包含多张表
pub fn parse_dht(data: &[u8]) -> PdxResult<Vec<HuffmanTable>> {
    let mut tables = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let tc = data[pos] >> 4;
        let id = data[pos] & 0x0F;
        let class = match tc {
            0 => HuffmanClass::Dc,
            1 => HuffmanClass::Ac,
            _ => {
                return Err(PdxError::InvalidData(format!(
                    "无效的 Huffman 表类别: {}",
                    tc
                )));
            }
        };
        let mut counts = [0u8; 16];
        counts.copy_from_slice(
            data.get(pos + 1..pos + 17)
                .ok_or_else(|| PdxError::InvalidData("DHT 码长计数被截断".into()))?,
        );
        pos += 17;
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        let symbols = data
            .get(pos..pos + total)
            .ok_or_else(|| PdxError::InvalidData(format!("DHT 表 {} 符号被截断", id)))?
            .to_vec();
        pos += total;

        tables.push(HuffmanTable::new(class, id, counts, symbols)?);
    }
    Ok(tables)
}

/// 按编号存放的量化表与 Huffman 表
///
/// 后出现的同编号表覆盖先前的表.
#[derive(Debug, Clone, Default)]
pub struct JpegTables {
    quant: [Option<QuantizationTable>; 4],
    dc: [Option<HuffmanTable>; 4],
    ac: [Option<HuffmanTable>; 4],
}

impl JpegTables {
    /// 创建空表集
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入量化表
    pub fn set_quant(&mut self, table: QuantizationTable) {
        let id = table.id as usize;
        self.quant[id] = Some(table);
    }

    /// 放入 Huffman 表
    pub fn set_huffman(&mut self, table: HuffmanTable) {
        let id = table.id as usize;
        match table.class {
            HuffmanClass::Dc => self.dc[id] = Some(table),
            HuffmanClass::Ac => self.ac[id] = Some(table),
        }
    }

    /// 按编号取量化表
    pub fn quant(&self, id: u8) -> PdxResult<&QuantizationTable> {
        lookup(&self.quant, id, "量化表")
    }

    /// 按编号取 DC 表
    pub fn dc(&self, id: u8) -> PdxResult<&HuffmanTable> {
        lookup(&self.dc, id, "DC Huffman 表")
    }

    /// 按编号取 AC 表
    pub fn ac(&self, id: u8) -> PdxResult<&HuffmanTable> {
        lookup(&self.ac, id, "AC Huffman 表")
    }

    /// 已定义的量化表
    pub fn quant_tables(&self) -> impl Iterator<Item = &QuantizationTable> {
        self.quant.iter().flatten()
    }

    /// 已定义的 Huffman 表
    pub fn huffman_tables(&self, class: HuffmanClass) -> impl Iterator<Item = &HuffmanTable> {
        match class {
            HuffmanClass::Dc => self.dc.iter().flatten(),
            HuffmanClass::Ac => self.ac.iter().flatten(),
        }
    }
}

fn lookup<'a, T>(slots: &'a [Option<T>; 4], id: u8, what: &'static str) -> PdxResult<&'a T> {
    slots
        .get(id as usize)
        .and_then(Option::as_ref)
        .ok_or(PdxError::OutOfRange {
            what,
            index: id as usize,
            len: slots.iter().flatten().count(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::jpeg::quant::QuantPrecision;

    #[test]
    fn test_解析_dht_段() {
        // DC 表 0: 一个 2 位码 -> 0; AC 表 1: 两个 1 位码 -> 0x00, 0x11
        let mut data = vec![0x00, 0, 1];
        data.extend([0u8; 14]);
        data.push(0x00);
        data.extend([0x11, 2]);
        data.extend([0u8; 15]);
        data.extend([0x00, 0x11]);

        let tables = parse_dht(&data).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].class, HuffmanClass::Dc);
        assert_eq!(tables[0].coder.codes(), vec![("00".to_string(), 0)]);
        assert_eq!(tables[1].class, HuffmanClass::Ac);
        assert_eq!(tables[1].id, 1);
        assert_eq!(tables[1].symbols, vec![0x00, 0x11]);
    }

    #[test]
    fn test_dht_非法类别() {
        let mut data = vec![0x20];
        data.extend([0u8; 16]);
        assert!(parse_dht(&data).is_err());
    }

    #[test]
    fn test_按编号查找() {
        let mut tables = JpegTables::new();
        let q = QuantizationTable::new(2, QuantPrecision::Bits8, [1; 64]).unwrap();
        tables.set_quant(q);
        assert_eq!(tables.quant(2).unwrap().id, 2);
        assert!(matches!(
            tables.quant(0),
            Err(PdxError::OutOfRange { index: 0, .. })
        ));
        assert!(tables.dc(7).is_err());
        assert_eq!(tables.quant_tables().count(), 1);
    }
}
