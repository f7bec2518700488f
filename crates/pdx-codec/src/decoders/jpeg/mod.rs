//! JPEG 解码器 (基线 Huffman).
//!
//! 两种使用方式:
//! - 完整 JPEG 段流: SOI, APPn, DQT, SOF0/SOF1, DHT, DRI, SOS + 熵编码数据;
//! - 预先给定头信息快照 (`JpegHeaderConfig`), 直接解码裸扫描数据,
//!   用于 Playdia 视频帧这类只携带熵编码数据的流.
//!
//! 渐进式、无损与算术编码 SOF 返回 `Unsupported`.

pub mod color;
pub mod config;
pub mod header;
pub mod idct;
pub mod quant;
pub mod scan;
pub mod tables;


use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};
use pdx_core::{BitReader, PdxError, PdxResult, PixelFormat};

use crate::codec_id::CodecId;
use crate::decoder::Decoder;
use crate::frame::{Frame, VideoFrame};
use crate::packet::Packet;

pub use config::JpegHeaderConfig;
pub use header::{JfifHeader, Marker, StartOfFrame, StartOfScan};
pub use idct::FixedIdct;
pub use tables::JpegTables;

use header::read_segment;
use quant::parse_dqt;
use scan::ScanDecoder;
use tables::parse_dht;

/// 单帧允许的最大像素数 (按 MCU 对齐后的尺寸计)
pub const MAX_FRAME_PIXELS: usize = 4096 * 4096;

/// JPEG 解码器
pub struct JpegDecoder {
    /// 量化表与 Huffman 表
    tables: JpegTables,
    /// JFIF 头
    jfif: Option<JfifHeader>,
    /// 帧头
    sof: Option<StartOfFrame>,
    /// 扫描头
    sos: Option<StartOfScan>,
    /// 复位间隔 (MCU 数)
    restart_interval: u16,
    /// 其他 APPn 段原样保存 (编号, 负载)
    app_segments: Vec<(u8, Vec<u8>)>,
    /// COM 段
    comments: Vec<Vec<u8>>,
    /// 头信息来自快照, 数据包只含扫描数据
    headerless: bool,
    /// 已解码帧缓冲
    output_frame: Option<Frame>,
    /// 已输出帧数
    frame_count: i64,
    /// 是否已收到刷新信号
    flushing: bool,
}

impl JpegDecoder {
    /// 创建解码器 (工厂函数)
    pub fn create() -> PdxResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new()))
    }

    /// 创建解码器实例, 头信息从每个数据包的段流中解析
    pub fn new() -> Self {
        Self {
            tables: JpegTables::new(),
            jfif: None,
            sof: None,
            sos: None,
            restart_interval: 0,
            app_segments: Vec::new(),
            comments: Vec::new(),
            headerless: false,
            output_frame: None,
            frame_count: 0,
            flushing: false,
        }
    }

    /// 使用头信息快照创建解码器, 数据包只含扫描数据
    pub fn with_config(config: &JpegHeaderConfig) -> PdxResult<Self> {
        let tables = config.build_tables()?;
        config.sof.validate()?;
        config.sos.frame_indices(&config.sof)?;
        Ok(Self {
            tables,
            jfif: config.app0.clone(),
            sof: Some(config.sof.clone()),
            sos: Some(config.sos.clone()),
            restart_interval: config.dri,
            headerless: true,
            ..Self::new()
        })
    }

    /// 解析段流直到 SOS, 返回熵编码数据的起始偏移
    pub fn parse_headers(&mut self, data: &[u8]) -> PdxResult<usize> {
        if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
            return Err(PdxError::InvalidData("缺少 SOI 标记".into()));
        }

        let mut pos = 2;
        loop {
            match data.get(pos) {
                Some(0xFF) => {}
                Some(&b) => {
                    return Err(PdxError::InvalidData(format!(
                        "偏移 {} 处应为标记, 实际为 0x{:02X}",
                        pos, b
                    )));
                }
                None => return Err(PdxError::InvalidData("在 SOS 之前数据结束".into())),
            }
            // 标记前允许填充的 0xFF
            while data.get(pos) == Some(&0xFF) {
                pos += 1;
            }
            let Some(&byte) = data.get(pos) else {
                return Err(PdxError::InvalidData("标记被截断".into()));
            };
            pos += 1;

            let marker = Marker::from_byte(byte);
            if !marker.has_length() {
                if marker == Marker::Eoi {
                    return Err(PdxError::InvalidData("SOS 之前遇到 EOI".into()));
                }
                continue;
            }

            let seg = read_segment(data, pos)?;
            let next = pos + 2 + seg.len();
            match marker {
                Marker::App(0) if seg.starts_with(b"JFIF\0") => {
                    let jfif = JfifHeader::parse(seg)?;
                    debug!("JFIF: {}, 密度 {}x{}", jfif.version, jfif.density_h, jfif.density_v);
                    self.jfif = Some(jfif);
                }
                Marker::App(n) => self.app_segments.push((n, seg.to_vec())),
                Marker::Com => self.comments.push(seg.to_vec()),
                Marker::Dqt => {
                    for table in parse_dqt(seg)? {
                        self.tables.set_quant(table);
                    }
                }
                Marker::Dht => {
                    for table in parse_dht(seg)? {
                        self.tables.set_huffman(table);
                    }
                }
                Marker::Sof(0) | Marker::Sof(1) => {
                    let sof = StartOfFrame::parse(seg)?;
                    debug!(
                        "SOF: {}x{}, {} 个分量, 精度 {}",
                        sof.width,
                        sof.height,
                        sof.components.len(),
                        sof.precision
                    );
                    self.sof = Some(sof);
                }
                Marker::Sof(n) => {
                    return Err(PdxError::Unsupported(format!(
                        "SOF{} (仅支持基线 Huffman 编码)",
                        n
                    )));
                }
                Marker::Dri => {
                    if seg.len() < 2 {
                        return Err(PdxError::InvalidData("DRI 段过短".into()));
                    }
                    self.restart_interval = BigEndian::read_u16(seg);
                }
                Marker::Sos => {
                    self.sos = Some(StartOfScan::parse(seg)?);
                    return Ok(next);
                }
                other => warn!("跳过不支持的 JPEG 标记 {:?} ({} 字节)", other, seg.len()),
            }
            pos = next;
        }
    }

    /// 解码一幅完整的 JPEG 图像
    pub fn decode_image(&mut self, data: &[u8]) -> PdxResult<VideoFrame> {
        let start = self.parse_headers(data)?;
        self.decode_scan_at(data, start)
    }

    /// 使用当前头信息从指定字节偏移开始解码扫描数据
    pub fn decode_scan_at(&self, data: &[u8], start: usize) -> PdxResult<VideoFrame> {
        let sof = self
            .sof
            .as_ref()
            .ok_or_else(|| PdxError::InvalidData("缺少 SOF 帧头".into()))?;
        let sos = self
            .sos
            .as_ref()
            .ok_or_else(|| PdxError::InvalidData("缺少 SOS 扫描头".into()))?;
        if sof.precision != 8 {
            return Err(PdxError::Unsupported(format!("{} 位采样精度", sof.precision)));
        }
        let pixels = sof.aligned_width() * sof.aligned_height();
        if pixels > MAX_FRAME_PIXELS {
            return Err(PdxError::Unsupported(format!(
                "帧尺寸 {}x{} 超出上限 ({} 像素)",
                sof.width, sof.height, MAX_FRAME_PIXELS
            )));
        }
        if start > data.len() {
            return Err(PdxError::OutOfRange {
                what: "扫描数据偏移",
                index: start,
                len: data.len(),
            });
        }

        let mut reader = BitReader::new(data);
        reader.set_position(start, 0);
        let planes = ScanDecoder::new(sof, sos, &self.tables, self.restart_interval)
            .decode(&mut reader)?;

        let mut frame = VideoFrame::new(u32::from(sof.width), u32::from(sof.height), PixelFormat::Rgb24);
        frame.data = color::planes_to_rgb(sof, &planes)?;
        Ok(frame)
    }

    /// 导出当前头信息快照
    pub fn header_config(&self) -> PdxResult<JpegHeaderConfig> {
        match (&self.sof, &self.sos) {
            (Some(sof), Some(sos)) => Ok(JpegHeaderConfig::capture(
                self.jfif.as_ref(),
                &self.tables,
                self.restart_interval,
                sof,
                sos,
            )),
            _ => Err(PdxError::InvalidData("尚未解析到 SOF/SOS".into())),
        }
    }

    /// 帧头
    pub fn sof(&self) -> Option<&StartOfFrame> {
        self.sof.as_ref()
    }

    /// 帧头的可变引用 (诊断时尝试不同采样因子)
    pub fn sof_mut(&mut self) -> Option<&mut StartOfFrame> {
        self.sof.as_mut()
    }

    /// 扫描头
    pub fn sos(&self) -> Option<&StartOfScan> {
        self.sos.as_ref()
    }

    /// JFIF 头
    pub fn jfif(&self) -> Option<&JfifHeader> {
        self.jfif.as_ref()
    }

    /// 复位间隔
    pub fn restart_interval(&self) -> u16 {
        self.restart_interval
    }

    /// 原样保存的 APPn 段
    pub fn app_segments(&self) -> &[(u8, Vec<u8>)] {
        &self.app_segments
    }

    /// COM 段
    pub fn comments(&self) -> &[Vec<u8>] {
        &self.comments
    }
}

impl Default for JpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JpegDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Jpeg
    }

    fn name(&self) -> &str {
        "jpeg"
    }

    fn send_packet(&mut self, packet: &Packet) -> PdxResult<()> {
        if packet.is_empty() {
            self.flushing = true;
            return Ok(());
        }
        if self.output_frame.is_some() {
            return Err(PdxError::NeedMoreData);
        }

        let mut frame = if self.headerless {
            self.decode_scan_at(&packet.data, 0)?
        } else {
            self.decode_image(&packet.data)?
        };
        frame.pts = if packet.pts >= 0 {
            packet.pts
        } else {
            self.frame_count
        };
        self.frame_count += 1;
        self.output_frame = Some(Frame::Video(frame));
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
        self.output_frame = None;
        self.frame_count = 0;
        self.flushing = false;
    }
}
