//! YCbCr -> RGB 定点颜色转换与按比例的色度上采样.

use pdx_core::{PdxError, PdxResult};

use super::header::StartOfFrame;
use super::idct::FIX_PRECISION;
use super::scan::ComponentPlane;

/// 1.402
pub const FIX_CR_R: i64 = 2871;
/// 0.34414
pub const FIX_CB_G: i64 = 704;
/// 0.71414
pub const FIX_CR_G: i64 = 1462;
/// 1.772
pub const FIX_CB_B: i64 = 3629;

fn clamp_u8(v: i64) -> u8 {
    v.clamp(0, 255) as u8
}

/// 单个像素的定点转换, 输入为 IDCT 输出的定点值
pub fn ycbcr_to_rgb(y: i32, cb: i32, cr: i32) -> [u8; 3] {
    let shift = FIX_PRECISION;
    let (y, cb, cr) = (i64::from(y) + (128 << shift), i64::from(cb), i64::from(cr));
    [
        clamp_u8((y + ((FIX_CR_R * cr) >> shift)) >> shift),
        clamp_u8((y - ((FIX_CB_G * cb) >> shift) - ((FIX_CR_G * cr) >> shift)) >> shift),
        clamp_u8((y + ((FIX_CB_B * cb) >> shift)) >> shift),
    ]
}

/// 将各分量平面转换为打包 RGB24
///
/// 每个分量按 `坐标 × 采样因子 / 最大采样因子` 取样 (最近邻).
/// 单分量 (灰度) 帧按 Cb = Cr = 0 转换.
pub fn planes_to_rgb(sof: &StartOfFrame, planes: &[ComponentPlane]) -> PdxResult<Vec<u8>> {
    let count = sof.components.len();
    if (count != 1 && count != 3) || planes.len() != count {
        return Err(PdxError::Unsupported(format!(
            "{} 个分量的颜色空间",
            count
        )));
    }

    let (max_h, max_v) = (sof.max_h() as usize, sof.max_v() as usize);
    let (width, height) = (sof.width as usize, sof.height as usize);
    let mut rgb = Vec::with_capacity(width * height * 3);

    let sample = |ci: usize, x: usize, y: usize| -> i32 {
        let c = &sof.components[ci];
        let plane = &planes[ci];
        let sx = (x * c.h as usize / max_h).min(plane.stride - 1);
        let sy = (y * c.v as usize / max_v).min(plane.height - 1);
        plane.sample(sx, sy)
    };

    for y in 0..height {
        for x in 0..width {
            let luma = sample(0, x, y);
            let (cb, cr) = if count == 3 {
                (sample(1, x, y), sample(2, x, y))
            } else {
                (0, 0)
            };
            rgb.extend_from_slice(&ycbcr_to_rgb(luma, cb, cr));
        }
    }
    Ok(rgb)
}
