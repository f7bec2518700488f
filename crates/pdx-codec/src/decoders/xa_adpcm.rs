//! CD-ROM XA ADPCM 音频解码器.
//!
//! 每个 128 字节的声音组 (sound group) 由 16 字节参数区和 112 字节样本区组成:
//! - 4 个块 × 2 条通道 (低/高半字节) × 28 个样本, 共 224 个 4 位样本;
//! - 参数字节 `params[4 + blk*2 + lane]`: 低 4 位为移位量, 位 4-5 为滤波器编号;
//! - 样本字节 `samples[sd*4 + blk]`, 通道 0 取低半字节, 通道 1 取高半字节.
//!
//! 解码后按 7:3 线性插值上采样到 44100 Hz.
//! 一个 Form-2 音频扇区负载包含 18 个声音组.

use log::debug;
use pdx_core::{PdxError, PdxResult};

use crate::codec_id::CodecId;
use crate::decoder::Decoder;
use crate::frame::{AudioFrame, Frame};
use crate::packet::Packet;

/// 声音组字节数
pub const SOUND_GROUP_SIZE: usize = 128;

/// 每个音频扇区包含的声音组数
pub const GROUPS_PER_SECTOR: usize = 18;

/// 每个声音组解码出的原始样本数 (上采样前)
pub const SAMPLES_PER_GROUP: usize = 224;

/// 输出采样率 (Hz)
pub const OUTPUT_SAMPLE_RATE: u32 = 44100;

/// 预测滤波器系数 (正值, 使用前取负)
const K0: [i64; 4] = [0, 960, 1840, 1568];
const K1: [i64; 4] = [0, 0, -832, -880];

/// 移位量超过此值时回退为 9
const MAX_SHIFT: u8 = 12;
const FALLBACK_SHIFT: u8 = 9;

/// 预测器状态, 跨声音组和扇区保持, 在记录结尾 (EOR) 处复位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdpcmState {
    /// 上一个输出 (未右移 4 位)
    pub prev1: i64,
    /// 上上个输出
    pub prev2: i64,
}

impl AdpcmState {
    /// 复位预测器
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 解码一个声音组, 返回 224 个未上采样的样本
pub fn decode_group_raw(group: &[u8; SOUND_GROUP_SIZE], state: &mut AdpcmState) -> Vec<i16> {
    let (params, samples) = group.split_at(16);
    let mut pcm = Vec::with_capacity(SAMPLES_PER_GROUP);

    for blk in 0..4 {
        for lane in 0..2 {
            let param = params[4 + blk * 2 + lane];
            let mut shift = param & 0x0F;
            if shift > MAX_SHIFT {
                shift = FALLBACK_SHIFT;
            }
            let filter = ((param & 0x30) >> 4) as usize;
            let f0 = -K0[filter];
            let f1 = -K1[filter];

            for sd in 0..28 {
                let nibble = (samples[sd * 4 + blk] >> (lane * 4)) & 0x0F;
                // 半字节放到 16 位的最高 4 位做符号扩展
                let extended = i64::from(((u16::from(nibble) << 12) as i16) >> shift);
                let result = (extended << 4) - ((state.prev1 * f0 + state.prev2 * f1) >> 10);
                state.prev2 = state.prev1;
                state.prev1 = result;
                pcm.push((result >> 4).clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16);
            }
        }
    }
    pcm
}

/// 7:3 线性插值上采样 (18900 Hz -> 44100 Hz)
///
/// 插值结果向零截断, 末尾样本原样追加一次.
pub fn upsample_linear(pcm: &[i16]) -> Vec<i16> {
    if pcm.is_empty() {
        return Vec::new();
    }
    let step = 1.0 / (7.0 / 3.0);
    let mut out = Vec::with_capacity(pcm.len() * 7 / 3 + 1);
    let mut pos = 0.0f64;
    let mut idx = 0;
    while idx + 1 < pcm.len() {
        let cur = f64::from(pcm[idx]);
        let next = f64::from(pcm[idx + 1]);
        out.push((cur + (next - cur) * pos) as i16);
        pos += step;
        if pos > 1.0 {
            pos -= 1.0;
            idx += 1;
        }
    }
    out.push(pcm[idx]);
    out
}

/// 解码一个声音组并上采样
pub fn decode_sound_group(group: &[u8; SOUND_GROUP_SIZE], state: &mut AdpcmState) -> Vec<i16> {
    upsample_linear(&decode_group_raw(group, state))
}

/// 解码一个音频扇区负载 (最多 18 个声音组, 末尾不足 128 字节的部分忽略)
pub fn decode_sector(payload: &[u8], state: &mut AdpcmState) -> Vec<i16> {
    let mut out = Vec::new();
    for chunk in payload
        .chunks_exact(SOUND_GROUP_SIZE)
        .take(GROUPS_PER_SECTOR)
    {
        if let Ok(group) = <&[u8; SOUND_GROUP_SIZE]>::try_from(chunk) {
            out.extend(decode_sound_group(group, state));
        }
    }
    out
}

/// XA-ADPCM 解码器
///
/// 每个数据包为一个音频扇区负载; 数据包带 `end_of_record` 标记时,
/// 解码完成后复位预测器.
pub struct XaAdpcmDecoder {
    /// 预测器状态
    state: AdpcmState,
    /// 已解码帧缓冲
    output_frame: Option<Frame>,
    /// 已输出的采样总数
    samples_out: i64,
    /// 是否已收到刷新信号
    flushing: bool,
}

impl XaAdpcmDecoder {
    /// 创建解码器 (工厂函数)
    pub fn create() -> PdxResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new()))
    }

    /// 创建解码器实例
    pub fn new() -> Self {
        Self {
            state: AdpcmState::default(),
            output_frame: None,
            samples_out: 0,
            flushing: false,
        }
    }

    /// 当前预测器状态
    pub fn state(&self) -> AdpcmState {
        self.state
    }
}

impl Default for XaAdpcmDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for XaAdpcmDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::XaAdpcm
    }

    fn name(&self) -> &str {
        "adpcm_xa"
    }

    fn send_packet(&mut self, packet: &Packet) -> PdxResult<()> {
        if packet.is_empty() {
            self.flushing = true;
            return Ok(());
        }
        if self.output_frame.is_some() {
            return Err(PdxError::NeedMoreData);
        }
        if packet.size() < SOUND_GROUP_SIZE {
            return Err(PdxError::InvalidData(format!(
                "XA-ADPCM 数据包过短: {} 字节",
                packet.size()
            )));
        }

        let samples = decode_sector(&packet.data, &mut self.state);
        let mut frame = AudioFrame::from_s16(&samples, OUTPUT_SAMPLE_RATE, 1);
        frame.pts = self.samples_out;
        self.samples_out += samples.len() as i64;

        if packet.end_of_record {
            debug!("XA-ADPCM: 记录结尾, 复位预测器 (累计 {} 采样)", self.samples_out);
            self.state.reset();
        }

        self.output_frame = Some(Frame::Audio(frame));
        Ok(())
    }

    fn receive_frame(&mut self) -> PdxResult<Frame> {
        match self.output_frame.take() {
            Some(frame) => Ok(frame),
            None if self.flushing => Err(PdxError::Eof),
            None => Err(PdxError::NeedMoreData),
        }
    }

    fn flush(&mut self) {
        self.state.reset();
        self.output_frame = None;
        self.samples_out = 0;
        self.flushing = false;
    }
}
