//! 比特流写入器.
//!
//! 按大端位序 (MSB first) 写入比特, 与 `BitReader` 对应.
//! 每写满一个 `0xFF` 字节即追加填充字节 `0x00`, 保证熵编码数据中不会出现伪标记.

/// 比特流写入器
///
/// # 示例
/// ```
/// use pdx_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0xFF, 8);
/// bw.write_bits(0b101, 3);
/// assert_eq!(bw.finish(), vec![0xFF, 0x00, 0b1010_0000]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已写入的有效位数 (不含填充字节)
    pub fn bits_written(&self) -> usize {
        let stuffed = self
            .data
            .windows(2)
            .filter(|w| w[0] == 0xFF && w[1] == 0x00)
            .count();
        (self.data.len() - stuffed) * 8 + self.bit_count as usize
    }

    /// 写入 1 个位
    pub fn push_bit(&mut self, bit: u32) {
        self.current_byte = (self.current_byte << 1) | (bit & 1) as u8;
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.emit_byte(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入 N 个位 (最多 32 位), 值的低 N 位被写入, 高位在前
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        for shift in (0..n).rev() {
            self.push_bit((value >> shift) & 1);
        }
    }

    fn emit_byte(&mut self, byte: u8) {
        self.data.push(byte);
        if byte == 0xFF {
            self.data.push(0x00);
        }
    }

    /// 获取当前已完成的字节数据引用 (不包括正在填充的字节)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 完成写入, 返回字节数据
    ///
    /// 末尾不足一个字节时左移补齐, 低位填 0.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            let padded = self.current_byte << (8 - self.bit_count);
            self.emit_byte(padded);
        }
        self.data
    }
}
