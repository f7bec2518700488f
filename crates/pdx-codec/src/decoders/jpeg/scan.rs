//! 基线扫描解码: 按 MCU 顺序解出每个分量的 8x8 块.
//!
//! 每个块: DC 差分 (Huffman 码长 + 附加位) -> AC 游程/码长对 -> 之字形还原 -> IDCT,
//! 再按分量与最大采样因子之比写入该分量的平面缓冲.
//! Huffman 解码返回 `None` 视为扫描数据结束, 只终止当前块, 不作为错误.

use log::{debug, warn};
use pdx_core::{BitReader, PdxError, PdxResult};

use super::header::{StartOfFrame, StartOfScan};
use super::quant::unzigzag;
use super::tables::JpegTables;

/// 单个分量的平面缓冲, 保存 IDCT 输出的定点采样
#[derive(Debug, Clone)]
pub struct ComponentPlane {
    /// 行跨度 (采样数)
    pub stride: usize,
    /// 行数
    pub height: usize,
    /// 定点采样 (11 位小数, 未加 128 偏移)
    pub data: Vec<i32>,
}

impl ComponentPlane {
    fn new(stride: usize, height: usize) -> Self {
        Self {
            stride,
            height,
            data: vec![0; stride * height],
        }
    }

    /// 写入一个 8x8 块, 超出平面的部分裁掉
    fn put_block(&mut self, x: usize, y: usize, block: &[i32; 64]) {
        for (row, src) in block.chunks_exact(8).enumerate() {
            let py = y + row;
            if py >= self.height || x >= self.stride {
                continue;
            }
            let n = 8.min(self.stride - x);
            let dst = py * self.stride + x;
            self.data[dst..dst + n].copy_from_slice(&src[..n]);
        }
    }

    /// 读取 (x, y) 处的采样
    pub fn sample(&self, x: usize, y: usize) -> i32 {
        self.data[y * self.stride + x]
    }
}

/// 按 JPEG 有符号幅度约定还原附加位
pub fn extend(raw: u32, len: u8) -> i32 {
    if len == 0 {
        return 0;
    }
    let raw = raw as i32;
    if raw < (1 << (len - 1)) {
        raw - (1 << len) + 1
    } else {
        raw
    }
}

/// 8 位精度下 DC 差值的最大类别 (附加位长度)
pub const MAX_DC_CATEGORY: u8 = 11;

/// 扫描解码器, 借用已解析的表与帧/扫描头
pub struct ScanDecoder<'a> {
    sof: &'a StartOfFrame,
    sos: &'a StartOfScan,
    tables: &'a JpegTables,
    restart_interval: u16,
}

impl<'a> ScanDecoder<'a> {
    /// 创建扫描解码器
    pub fn new(
        sof: &'a StartOfFrame,
        sos: &'a StartOfScan,
        tables: &'a JpegTables,
        restart_interval: u16,
    ) -> Self {
        Self {
            sof,
            sos,
            tables,
            restart_interval,
        }
    }

    /// 为每个帧分量分配平面缓冲
    fn allocate_planes(&self) -> Vec<ComponentPlane> {
        let sof = self.sof;
        let (max_h, max_v) = (sof.max_h() as usize, sof.max_v() as usize);
        sof.components
            .iter()
            .map(|c| {
                ComponentPlane::new(
                    sof.aligned_width() * c.h as usize / max_h,
                    sof.aligned_height() * c.v as usize / max_v,
                )
            })
            .collect()
    }

    /// 解码整个扫描, 返回每个帧分量的平面 (与帧头分量顺序一致)
    pub fn decode(&self, reader: &mut BitReader<'_>) -> PdxResult<Vec<ComponentPlane>> {
        let sof = self.sof;
        let mut planes = self.allocate_planes();
        let frame_indices = self.sos.frame_indices(sof)?;

        // 先把每个扫描分量用到的表取出, 缺表属于硬错误
        let mut bindings = Vec::with_capacity(frame_indices.len());
        for (sc, &fi) in self.sos.components.iter().zip(&frame_indices) {
            let fc = &sof.components[fi];
            bindings.push((
                fi,
                self.tables.dc(sc.dc_table)?,
                self.tables.ac(sc.ac_table)?,
                self.tables.quant(fc.quant_id)?.idct(),
            ));
        }

        let (max_h, max_v) = (sof.max_h() as usize, sof.max_v() as usize);
        let (mcu_w, mcu_h) = (sof.mcu_width(), sof.mcu_height());
        let columns = sof.mcu_columns();
        let dri = self.restart_interval as usize;
        let mut preds = vec![0i32; bindings.len()];

        debug!(
            "JPEG 扫描: {}x{} MCU ({}x{} 像素), {} 个分量, 复位间隔 {}",
            columns,
            sof.mcu_rows(),
            mcu_w,
            mcu_h,
            bindings.len(),
            dri
        );

        for mcu in 0..sof.mcu_count() {
            if dri > 0 && mcu > 0 && mcu % dri == 0 {
                preds.fill(0);
                reader.skip_to_byte_boundary();
                match reader.read_u16_be() {
                    Some(code @ 0xFFD0..=0xFFD7) => {
                        debug!("MCU {}: 复位标记 RST{}", mcu, code - 0xFFD0);
                    }
                    Some(code) => warn!("MCU {}: 期望复位标记, 实际为 0x{:04X}", mcu, code),
                    None => warn!("MCU {}: 期望复位标记, 数据已结束", mcu),
                }
            }

            for (si, &(fi, dc, ac, idct)) in bindings.iter().enumerate() {
                let fc = &sof.components[fi];
                for v in 0..fc.v as usize {
                    for h in 0..fc.h as usize {
                        // 直流: 码长 + 附加位, 与预测值相加
                        let Some(dc_len) = dc.coder.decode_symbol(reader) else {
                            break;
                        };
                        if dc_len > MAX_DC_CATEGORY {
                            warn!("MCU {}: 无效的 DC 码长 {}", mcu, dc_len);
                            break;
                        }
                        let Some(raw) = reader.read_bits(u32::from(dc_len)) else {
                            break;
                        };
                        let mut zz = [0i32; 64];
                        preds[si] = preds[si].saturating_add(extend(raw, dc_len));
                        zz[0] = preds[si];

                        // 交流: 高 4 位为零游程, 低 4 位为附加位长度; 0x00 为块结束
                        let mut k = 1usize;
                        while k < 64 {
                            let Some(sym) = ac.coder.decode_symbol(reader) else {
                                break;
                            };
                            if sym == 0 {
                                break;
                            }
                            let run = (sym >> 4) as usize;
                            let size = sym & 0x0F;
                            k += run;
                            if size > 0 {
                                let Some(raw) = reader.read_bits(u32::from(size)) else {
                                    break;
                                };
                                if k < 64 {
                                    zz[k] = extend(raw, size);
                                }
                            }
                            k += 1;
                        }

                        let block = idct.transform(&unzigzag(&zz));
                        let x = ((mcu % columns) * mcu_w + h * 8) * fc.h as usize / max_h;
                        let y = ((mcu / columns) * mcu_h + v * 8) * fc.v as usize / max_v;
                        planes[fi].put_block(x, y, &block);
                    }
                }
            }
        }

        if planes.is_empty() {
            return Err(PdxError::InvalidData("扫描没有输出任何分量".into()));
        }
        Ok(planes)
    }
}
