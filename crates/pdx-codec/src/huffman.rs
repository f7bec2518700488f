//! 规范 Huffman 编解码器.
//!
//! 码树以节点数组 (arena) 存储, 节点之间以下标引用, 根节点固定为下标 0.
//! 支持三种构建方式:
//! - 显式 (码长, 码值, 符号) 三元组, 对应 JPEG DHT 段中已展开的码表;
//! - DHT 段原始格式 (16 个码长计数 + 符号列表), 按规范 Huffman 规则分配码值;
//! - 按字节频率统计构建, 附带结束哨兵符号, 用于通用的编码/解码往返.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use pdx_core::{BitReader, BitWriter, PdxError, PdxResult};

/// 频率构建方式中使用的结束哨兵符号
pub const END_SENTINEL: u8 = 0xFF;

/// DHT 码表允许的最大码长
pub const MAX_CODE_LEN: u8 = 16;

#[derive(Debug, Clone)]
struct HuffNode {
    left: Option<usize>,
    right: Option<usize>,
    sym: Option<u8>,
}

impl HuffNode {
    fn new() -> Self {
        Self {
            left: None,
            right: None,
            sym: None,
        }
    }

    fn leaf(sym: u8) -> Self {
        Self {
            sym: Some(sym),
            ..Self::new()
        }
    }

    fn is_leaf(&self) -> bool {
        self.sym.is_some()
    }
}

/// 规范 Huffman 编解码器
///
/// 构建完成后只读, 可在多个解码器之间共享.
#[derive(Debug, Clone)]
pub struct HuffmanCoder {
    /// 码树节点, 下标 0 为根
    nodes: Vec<HuffNode>,
    /// 每个符号的比特路径 (0 = 左, 1 = 右), 构建后一次性遍历得到
    paths: Vec<Option<Vec<u8>>>,
}

impl HuffmanCoder {
    fn empty() -> Self {
        Self {
            nodes: vec![HuffNode::new()],
            paths: vec![None; 256],
        }
    }

    /// 从显式码表构建 (码长, 码值, 符号)
    ///
    /// 码长必须在 1..=16 之间; 与已有码字构成前缀冲突的条目视为无效数据.
    pub fn from_table(entries: &[(u8, u16, u8)]) -> PdxResult<Self> {
        let mut coder = Self::empty();
        for &(len, code, sym) in entries {
            coder.insert(len, code, sym)?;
        }
        coder.rebuild_paths();
        Ok(coder)
    }

    /// 从 DHT 段格式构建: `counts[i]` 为码长 i+1 的码字个数, 符号按码长升序排列
    pub fn from_dht_counts(counts: &[u8; 16], symbols: &[u8]) -> PdxResult<Self> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total != symbols.len() {
            return Err(PdxError::InvalidData(format!(
                "DHT 码长计数之和 {} 与符号数 {} 不一致",
                total,
                symbols.len()
            )));
        }

        let mut entries = Vec::with_capacity(total);
        let mut code: u32 = 0;
        let mut next = symbols.iter();
        for (i, &count) in counts.iter().enumerate() {
            let len = (i + 1) as u8;
            for _ in 0..count {
                if code >= (1u32 << len) {
                    return Err(PdxError::InvalidData(format!(
                        "DHT 码长 {} 的码字溢出",
                        len
                    )));
                }
                // total == symbols.len(), 迭代器不会提前耗尽
                if let Some(&sym) = next.next() {
                    entries.push((len, code as u16, sym));
                }
                code += 1;
            }
            code <<= 1;
        }
        Self::from_table(&entries)
    }

    /// 按字节频率构建
    ///
    /// 哨兵符号 `END_SENTINEL` 以频率 0 预先加入, 因此总是叶子.
    /// 每次合并频率最低的两个节点, 频率相同时按加入顺序, 结果确定.
    pub fn from_frequencies(stream: &[u8]) -> Self {
        let mut freqs = [0u64; 256];
        let mut order: Vec<u8> = vec![END_SENTINEL];
        for &b in stream {
            if freqs[b as usize] == 0 && b != END_SENTINEL {
                order.push(b);
            }
            freqs[b as usize] += 1;
        }

        // 节点先按叶子构建, 合并节点依次追加, 最后把根换到下标 0
        let mut nodes: Vec<HuffNode> = Vec::with_capacity(order.len() * 2);
        let mut heap = BinaryHeap::new();
        for &sym in &order {
            let idx = nodes.len();
            nodes.push(HuffNode::leaf(sym));
            heap.push(Reverse((freqs[sym as usize], idx)));
        }

        while heap.len() > 1 {
            let (Some(Reverse((f0, a))), Some(Reverse((f1, b)))) = (heap.pop(), heap.pop()) else {
                break;
            };
            let idx = nodes.len();
            nodes.push(HuffNode {
                left: Some(a),
                right: Some(b),
                sym: None,
            });
            heap.push(Reverse((f0 + f1, idx)));
        }

        let root = heap.pop().map_or(0, |Reverse((_, idx))| idx);
        nodes.swap(0, root);
        for node in &mut nodes {
            for child in [&mut node.left, &mut node.right].into_iter().flatten() {
                if *child == root {
                    *child = 0;
                } else if *child == 0 {
                    *child = root;
                }
            }
        }

        let mut coder = Self {
            nodes,
            paths: vec![None; 256],
        };
        coder.rebuild_paths();
        coder
    }

    fn insert(&mut self, len: u8, code: u16, sym: u8) -> PdxResult<()> {
        if len == 0 || len > MAX_CODE_LEN {
            return Err(PdxError::InvalidArgument(format!(
                "Huffman 码长 {} 超出 1..={} (符号 0x{:02X})",
                len, MAX_CODE_LEN, sym
            )));
        }
        if u32::from(code) >> len != 0 {
            return Err(PdxError::InvalidArgument(format!(
                "Huffman 码值 {:#b} 超出码长 {}",
                code, len
            )));
        }

        let mut idx = 0;
        for shift in (0..len).rev() {
            if self.nodes[idx].is_leaf() {
                return Err(PdxError::InvalidData(format!(
                    "Huffman 码字 {:0width$b} 与已有码字构成前缀冲突",
                    code,
                    width = len as usize
                )));
            }
            let bit = (code >> shift) & 1;
            let child = if bit == 0 {
                self.nodes[idx].left
            } else {
                self.nodes[idx].right
            };
            idx = match child {
                Some(next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(HuffNode::new());
                    if bit == 0 {
                        self.nodes[idx].left = Some(next);
                    } else {
                        self.nodes[idx].right = Some(next);
                    }
                    next
                }
            };
        }

        let node = &mut self.nodes[idx];
        if node.is_leaf() || node.left.is_some() || node.right.is_some() {
            return Err(PdxError::InvalidData(format!(
                "Huffman 码字 {:0width$b} 重复或是已有码字的前缀",
                code,
                width = len as usize
            )));
        }
        node.sym = Some(sym);
        Ok(())
    }

    /// 深度优先遍历整棵树, 记录每个叶子的比特路径
    fn rebuild_paths(&mut self) {
        self.paths = vec![None; 256];
        let mut stack: Vec<(usize, Vec<u8>)> = vec![(0, Vec::new())];
        while let Some((idx, path)) = stack.pop() {
            let node = &self.nodes[idx];
            if let Some(sym) = node.sym {
                self.paths[sym as usize] = Some(path);
                continue;
            }
            if let Some(right) = node.right {
                let mut p = path.clone();
                p.push(1);
                stack.push((right, p));
            }
            if let Some(left) = node.left {
                let mut p = path;
                p.push(0);
                stack.push((left, p));
            }
        }
    }

    /// 解码一个符号
    ///
    /// 流在到达叶子之前结束 (或遇到码表中不存在的分支) 时返回 `None`.
    pub fn decode_symbol(&self, reader: &mut BitReader<'_>) -> Option<u8> {
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            if let Some(sym) = node.sym {
                return Some(sym);
            }
            idx = if reader.pop_bit()? == 0 {
                node.left?
            } else {
                node.right?
            };
        }
    }

    /// 编码一个符号
    pub fn encode_symbol(&self, writer: &mut BitWriter, sym: u8) -> PdxResult<()> {
        let path = self.paths[sym as usize]
            .as_ref()
            .ok_or(PdxError::UnknownSymbol(sym))?;
        for &bit in path {
            writer.push_bit(u32::from(bit));
        }
        Ok(())
    }

    /// 编码整条消息, 末尾追加结束哨兵
    pub fn encode_message(&self, symbols: &[u8]) -> PdxResult<Vec<u8>> {
        if symbols.contains(&END_SENTINEL) {
            return Err(PdxError::InvalidArgument(format!(
                "消息中包含保留的结束哨兵 0x{:02X}",
                END_SENTINEL
            )));
        }
        let mut writer = BitWriter::new();
        for &sym in symbols {
            self.encode_symbol(&mut writer, sym)?;
        }
        self.encode_symbol(&mut writer, END_SENTINEL)?;
        Ok(writer.finish())
    }

    /// 解码整条消息, 遇到结束哨兵或流结束时停止
    pub fn decode_message(&self, data: &[u8]) -> Vec<u8> {
        let mut reader = BitReader::new(data);
        let mut out = Vec::new();
        while let Some(sym) = self.decode_symbol(&mut reader) {
            if sym == END_SENTINEL {
                break;
            }
            out.push(sym);
        }
        out
    }

    /// 导出所有码字 (比特串, 符号), 按码字字典序排列
    pub fn codes(&self) -> Vec<(String, u8)> {
        let mut result: Vec<(String, u8)> = self
            .paths
            .iter()
            .enumerate()
            .filter_map(|(sym, path)| {
                path.as_ref().map(|p| {
                    let bits: String = p.iter().map(|&b| if b == 0 { '0' } else { '1' }).collect();
                    (bits, sym as u8)
                })
            })
            .collect();
        result.sort();
        result
    }

    /// 指定符号的码长, 不存在时返回 `None`
    pub fn code_len(&self, sym: u8) -> Option<usize> {
        self.paths[sym as usize].as_ref().map(Vec::len)
    }

    /// 码表中的符号个数
    pub fn symbol_count(&self) -> usize {
        self.paths.iter().filter(|p| p.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// JPEG 标准亮度 DC 表 (ITU T.81 K.3)
    const LUMA_DC_COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn test_显式码表逐码往返() {
        let entries = [
            (2, 0b00, 0x01),
            (2, 0b01, 0x02),
            (3, 0b100, 0x03),
            (3, 0b101, 0x04),
            (4, 0b1100, 0x11),
            (5, 0b11010, 0xF0),
        ];
        let coder = HuffmanCoder::from_table(&entries).unwrap();

        let mut bw = BitWriter::new();
        for &(len, code, _) in &entries {
            bw.write_bits(u32::from(code), u32::from(len));
        }
        let data = bw.finish();

        let mut br = BitReader::new(&data);
        for &(_, _, sym) in &entries {
            assert_eq!(coder.decode_symbol(&mut br), Some(sym));
        }
    }

    #[test]
    fn test_码长为零被拒绝() {
        let err = HuffmanCoder::from_table(&[(0, 0, 0x05)]).unwrap_err();
        assert!(matches!(err, PdxError::InvalidArgument(_)));
    }

    #[test]
    fn test_前缀冲突被拒绝() {
        let err = HuffmanCoder::from_table(&[(2, 0b00, 1), (3, 0b001, 2)]).unwrap_err();
        assert!(matches!(err, PdxError::InvalidData(_)));

        let err = HuffmanCoder::from_table(&[(3, 0b001, 2), (2, 0b00, 1)]).unwrap_err();
        assert!(matches!(err, PdxError::InvalidData(_)));

        let err = HuffmanCoder::from_table(&[(2, 0b10, 1), (2, 0b10, 2)]).unwrap_err();
        assert!(matches!(err, PdxError::InvalidData(_)));
    }

    #[test]
    fn test_码值超出码长被拒绝() {
        let err = HuffmanCoder::from_table(&[(2, 0b100, 1)]).unwrap_err();
        assert!(matches!(err, PdxError::InvalidArgument(_)));
    }

    #[test]
    fn test_dht_规范码分配() {
        let symbols: Vec<u8> = (0..12).collect();
        let coder = HuffmanCoder::from_dht_counts(&LUMA_DC_COUNTS, &symbols).unwrap();
        let codes = coder.codes();

        assert_eq!(codes.len(), 12);
        assert!(codes.contains(&("00".to_string(), 0)));
        assert!(codes.contains(&("010".to_string(), 1)));
        assert!(codes.contains(&("110".to_string(), 5)));
        assert!(codes.contains(&("1110".to_string(), 6)));
        assert!(codes.contains(&("111111110".to_string(), 11)));
        assert_eq!(coder.code_len(11), Some(9));
        assert_eq!(coder.symbol_count(), 12);
    }

    #[test]
    fn test_dht_计数与符号数不一致() {
        let err = HuffmanCoder::from_dht_counts(&LUMA_DC_COUNTS, &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, PdxError::InvalidData(_)));
    }

    #[test]
    fn test_dht_码字溢出() {
        let mut counts = [0u8; 16];
        counts[0] = 3;
        let err = HuffmanCoder::from_dht_counts(&counts, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, PdxError::InvalidData(_)));
    }

    #[test]
    fn test_频率构建消息往返() {
        let message = b"ADA ATE AN APPLE";
        let coder = HuffmanCoder::from_frequencies(message);
        let encoded = coder.encode_message(message).unwrap();
        assert_eq!(coder.decode_message(&encoded), message.to_vec());

        // 出现次数最多的 'A' 不会比 'L' 更长
        assert!(coder.code_len(b'A').unwrap() <= coder.code_len(b'L').unwrap());
        assert!(coder.code_len(END_SENTINEL).is_some());
    }

    #[test]
    fn test_频率构建结果确定() {
        let message = b"abracadabra alakazam";
        let a = HuffmanCoder::from_frequencies(message);
        let b = HuffmanCoder::from_frequencies(message);
        assert_eq!(a.codes(), b.codes());
    }

    #[test]
    fn test_全字节消息往返() {
        let message: Vec<u8> = (0u8..=0xFE).chain((0u8..0x40).rev()).collect();
        let coder = HuffmanCoder::from_frequencies(&message);
        let encoded = coder.encode_message(&message).unwrap();
        assert_eq!(coder.decode_message(&encoded), message);
    }

    #[test]
    fn test_空消息往返() {
        let coder = HuffmanCoder::from_frequencies(&[]);
        let encoded = coder.encode_message(&[]).unwrap();
        assert!(coder.decode_message(&encoded).is_empty());
    }

    #[test]
    fn test_编码不存在的符号() {
        let coder = HuffmanCoder::from_frequencies(b"abc");
        let mut bw = BitWriter::new();
        let err = coder.encode_symbol(&mut bw, b'z').unwrap_err();
        assert!(matches!(err, PdxError::UnknownSymbol(b'z')));
    }

    #[test]
    fn test_消息中含哨兵被拒绝() {
        let coder = HuffmanCoder::from_frequencies(b"abc");
        assert!(coder.encode_message(&[b'a', END_SENTINEL]).is_err());
    }

    #[test]
    fn test_码字未读完时返回_none() {
        let coder = HuffmanCoder::from_table(&[(1, 0, 7), (4, 0b1000, 8)]).unwrap();
        // 只有 2 个有效比特 (1, 0) 可读, 随后是标记
        let data = [0b0000_0010, 0xFF, 0xD9];
        let mut br = BitReader::new(&data);
        br.set_position(0, 6);
        assert_eq!(coder.decode_symbol(&mut br), None);
    }
}
