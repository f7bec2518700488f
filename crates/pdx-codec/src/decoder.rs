//! 解码器 trait 定义.

use pdx_core::PdxResult;

use crate::codec_id::CodecId;
use crate::frame::Frame;
use crate::packet::Packet;

/// 解码器 trait
///
/// 解码流程:
/// 1. 调用 `send_packet()` 送入压缩数据
/// 2. 调用 `receive_frame()` 取出解码后的帧
/// 3. 重复以上步骤直到所有数据处理完毕
/// 4. 送入空包 (flush) 表示输入结束
pub trait Decoder: Send {
    /// 获取解码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 送入一个压缩数据包进行解码
    ///
    /// # 返回
    /// - `Ok(())`: 数据包已接受
    /// - `Err(PdxError::NeedMoreData)`: 上一帧尚未取出
    fn send_packet(&mut self, packet: &Packet) -> PdxResult<()>;

    /// 从解码器取出一帧解码数据
    ///
    /// # 返回
    /// - `Ok(frame)`: 成功取出一帧
    /// - `Err(PdxError::NeedMoreData)`: 需要送入更多数据包
    /// - `Err(PdxError::Eof)`: 已 flush 且所有帧已取出
    fn receive_frame(&mut self) -> PdxResult<Frame>;

    /// 清空内部状态 (预测器, 缓存帧)
    fn flush(&mut self);
}
