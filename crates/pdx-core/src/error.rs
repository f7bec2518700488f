//! 统一错误类型定义.
//!
//! 所有 pdx crate 共用的错误类型, 支持跨模块传播.
//!
//! 注意: 比特流/Huffman 解码中的 "流结束" 不是错误, 以 `Option::None` 表示.

use thiserror::Error;

/// pdx 统一错误类型
#[derive(Debug, Error)]
pub enum PdxError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 编解码器错误
    #[error("编解码器错误: {0}")]
    Codec(String),

    /// 光盘镜像 / 文件系统格式错误
    #[error("格式错误: {0}")]
    Format(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 越界访问 (LBA 超出扇区总数, 表编号不存在等)
    #[error("越界访问: {what} 索引 {index} 超出范围 (共 {len})")]
    OutOfRange {
        /// 被访问的对象
        what: &'static str,
        /// 请求的索引
        index: usize,
        /// 有效长度
        len: usize,
    },

    /// Huffman 表中不存在的符号
    #[error("Huffman 表中不存在符号 0x{0:02X}")]
    UnknownSymbol(u8),

    /// 未找到指定的编解码器
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// pdx 统一 Result 类型
pub type PdxResult<T> = Result<T, PdxError>;
