//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从熵编码数据中读取比特, 并遵循 JPEG 的标记转义约定:
//! - 数据中的 `0xFF` 后紧跟填充字节 `0x00`, 读取时自动跳过;
//! - `0xFF` 后紧跟非零字节表示标记 (marker), 读取到此处视为流结束.
//!
//! 流结束不是错误: `pop_bit` / `read_bits` 返回 `None`, 由调用方按上下文解释.

/// 比特流读取器
///
/// # 示例
/// ```
/// use pdx_core::bitreader::BitReader;
///
/// // 0xFF 0x00 是转义后的 0xFF 数据字节
/// let data = [0xFF, 0x00, 0b1010_0000];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(8), Some(0xFF));
/// assert_eq!(br.read_bits(3), Some(0b101));
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 是否已到达末尾 (字节索引不小于数据长度)
    pub fn is_eof(&self) -> bool {
        self.byte_pos >= self.data.len()
    }

    /// 当前是否停在一个标记上 (字节对齐处的 0xFF + 非零字节)
    pub fn at_marker(&self) -> bool {
        self.bit_pos == 0
            && self.data.get(self.byte_pos) == Some(&0xFF)
            && self
                .data
                .get(self.byte_pos + 1)
                .is_some_and(|&next| next != 0x00)
    }

    /// 读取 1 个位
    ///
    /// 到达数据末尾或遇到标记时返回 `None`, 游标停留在标记起始处.
    pub fn pop_bit(&mut self) -> Option<u32> {
        if self.is_eof() || self.at_marker() {
            return None;
        }

        let byte = self.data[self.byte_pos];
        let bit = (byte >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos >= 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
            // 跳过 0xFF 之后的填充字节
            if byte == 0xFF && self.data.get(self.byte_pos) == Some(&0x00) {
                self.byte_pos += 1;
            }
        }

        Some(u32::from(bit))
    }

    /// 读取 N 个位 (最多 32 位), 高位在前
    ///
    /// 读取途中流结束时返回 `None`.
    pub fn read_bits(&mut self, n: u32) -> Option<u32> {
        debug_assert!(n <= 32, "read_bits: n={} 超过 32 位", n);
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.pop_bit()?;
        }
        Some(value)
    }

    /// 在当前字节索引处读取原始大端 u16, 不做去填充处理
    ///
    /// 用于读取复位标记 (RSTn), 调用前应先对齐到字节边界.
    pub fn read_u16_be(&mut self) -> Option<u16> {
        let bytes = self.data.get(self.byte_pos..self.byte_pos + 2)?;
        self.byte_pos += 2;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// 对齐到下一个字节边界
    ///
    /// 如果当前已在字节边界, 则不做任何事.
    pub fn skip_to_byte_boundary(&mut self) {
        if self.bit_pos > 0 {
            let byte = self.data[self.byte_pos];
            self.bit_pos = 0;
            self.byte_pos += 1;
            if byte == 0xFF && self.data.get(self.byte_pos) == Some(&0x00) {
                self.byte_pos += 1;
            }
        }
    }

    /// 获取当前字节位置
    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }

    /// 获取当前字节内的位位置
    pub fn bit_position(&self) -> u8 {
        self.bit_pos
    }

    /// 重新定位游标 (诊断时从任意偏移开始尝试解码)
    pub fn set_position(&mut self, byte_pos: usize, bit_pos: u8) {
        self.byte_pos = byte_pos;
        self.bit_pos = bit_pos & 7;
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}
