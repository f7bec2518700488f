//! 定点 AAN 8x8 反离散余弦变换.
//!
//! 反量化与 AAN 缩放因子合并为一张定点表, 在构造时一次算好.
//! 先逐行再逐列做一维变换, 全部使用整数运算, 输出仍为 11 位小数定点值,
//! 由调用方 (颜色转换) 统一右移.

/// 定点小数位数
pub const FIX_PRECISION: u32 = 11;

/// 浮点转定点, 向零截断
pub fn float_to_fix(x: f64) -> i32 {
    (x * f64::from(1u32 << FIX_PRECISION)) as i32
}

/// 2cos(4π/16)
pub const FIX_2COS_PI_4_16: i64 = 2896;
/// 2cos(2π/16)
pub const FIX_2COS_PI_2_16: i64 = 3784;
/// 1/cos(2π/16)
pub const FIX_1COS_PI_2_16: i64 = 2216;
/// -1/cos(6π/16)
pub const FIX_1COS_PI_6_16: i64 = -5351;

/// AAN 缩放因子: k=0 时为 1, 否则为 cos(kπ/16)·√2
const AAN_SCALE: [f64; 8] = [
    1.0,
    1.387039845,
    1.306562965,
    1.175875602,
    1.0,
    0.785694958,
    0.541196100,
    0.275899379,
];

/// 一维 8 点变换, 输入输出均为自然顺序
fn idct_1d(x: [i64; 8]) -> [i64; 8] {
    let shift = FIX_PRECISION;

    // 偶数部分
    let tmp10 = x[0] + x[4];
    let tmp11 = x[0] - x[4];
    let tmp13 = x[2] + x[6];
    let tmp12 = (((x[2] - x[6]) * FIX_2COS_PI_4_16) >> shift) - tmp13;

    let tmp0 = tmp10 + tmp13;
    let tmp3 = tmp10 - tmp13;
    let tmp1 = tmp11 + tmp12;
    let tmp2 = tmp11 - tmp12;

    // 奇数部分
    let z13 = x[5] + x[3];
    let z10 = x[5] - x[3];
    let z11 = x[1] + x[7];
    let z12 = x[1] - x[7];

    let tmp7 = z11 + z13;
    let tmp11 = ((z11 - z13) * FIX_2COS_PI_4_16) >> shift;
    let z5 = ((z10 + z12) * FIX_2COS_PI_2_16) >> shift;
    let tmp10 = ((FIX_1COS_PI_2_16 * z12) >> shift) - z5;
    let tmp12 = ((FIX_1COS_PI_6_16 * z10) >> shift) + z5;

    let tmp6 = tmp12 - tmp7;
    let tmp5 = tmp11 - tmp6;
    let tmp4 = tmp10 + tmp5;

    [
        tmp0 + tmp7,
        tmp1 + tmp6,
        tmp2 + tmp5,
        tmp3 - tmp4,
        tmp3 + tmp4,
        tmp2 - tmp5,
        tmp1 - tmp6,
        tmp0 - tmp7,
    ]
}

/// 定点 IDCT, 绑定一张量化表
#[derive(Debug, Clone)]
pub struct FixedIdct {
    /// 反量化 × AAN 缩放的定点表 (自然顺序)
    table: [i32; 64],
}

impl FixedIdct {
    /// 由自然顺序的量化表构建
    pub fn new(qtab: &[u16; 64]) -> Self {
        let mut table = [0i32; 64];
        for i in 0..8 {
            for j in 0..8 {
                let factor = AAN_SCALE[i] * AAN_SCALE[j] / 8.0;
                table[i * 8 + j] = float_to_fix(factor * f64::from(qtab[i * 8 + j]));
            }
        }
        Self { table }
    }

    /// 定点缩放表
    pub fn table(&self) -> &[i32; 64] {
        &self.table
    }

    /// 对自然顺序的 64 个系数做反量化与二维 IDCT
    ///
    /// 返回值为 11 位小数的定点采样 (未加 128 偏移).
    pub fn transform(&self, coeffs: &[i32; 64]) -> [i32; 64] {
        let mut data = [0i64; 64];
        for (i, d) in data.iter_mut().enumerate() {
            *d = i64::from(coeffs[i]) * i64::from(self.table[i]);
        }

        // 行变换; 交流系数全零时整行等于直流值, 与完整变换结果一致
        for row in data.chunks_exact_mut(8) {
            if row[1..].iter().all(|&v| v == 0) {
                let dc = row[0];
                row.fill(dc);
                continue;
            }
            let mut x = [0i64; 8];
            x.copy_from_slice(row);
            row.copy_from_slice(&idct_1d(x));
        }

        // 列变换
        for col in 0..8 {
            let mut x = [0i64; 8];
            for (k, v) in x.iter_mut().enumerate() {
                *v = data[k * 8 + col];
            }
            for (k, v) in idct_1d(x).into_iter().enumerate() {
                data[k * 8 + col] = v;
            }
        }

        let mut out = [0i32; 64];
        for (o, d) in out.iter_mut().zip(data) {
            *o = d.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_定点常量() {
        use std::f64::consts::PI;
        assert_eq!(float_to_fix(2.0 * (PI * 4.0 / 16.0).cos()) as i64, FIX_2COS_PI_4_16);
        assert_eq!(float_to_fix(2.0 * (PI * 2.0 / 16.0).cos()) as i64, FIX_2COS_PI_2_16);
        assert_eq!(float_to_fix(1.0 / (PI * 2.0 / 16.0).cos()) as i64, FIX_1COS_PI_2_16);
        assert_eq!(float_to_fix(-(1.0 / (PI * 6.0 / 16.0).cos())) as i64, FIX_1COS_PI_6_16);
    }

    #[test]
    fn test_缩放表() {
        let idct = FixedIdct::new(&[16; 64]);
        assert_eq!(
            &idct.table()[..8],
            &[4096, 5681, 5351, 4816, 4096, 3218, 2216, 1130]
        );
        assert_eq!(idct.table()[9], 7880);
    }

    #[test]
    fn test_只有直流时输出平坦块() {
        let idct = FixedIdct::new(&[16; 64]);
        for dc in [-7, 1, 5, 100] {
            let mut coeffs = [0i32; 64];
            coeffs[0] = dc;
            let out = idct.transform(&coeffs);
            assert!(out.iter().all(|&v| v == dc * 4096), "dc={}", dc);
        }
    }

    #[test]
    fn test_行快速路径与完整变换一致() {
        let row = [12345i64, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(idct_1d(row), [12345; 8]);
    }

    #[test]
    fn test_单个水平交流系数() {
        let idct = FixedIdct::new(&[16; 64]);
        let mut coeffs = [0i32; 64];
        coeffs[1] = 10;
        let out = idct.transform(&coeffs);
        let expected = [56810, 48155, 32177, 11318, -11318, -32177, -48155, -56810];
        for row in out.chunks_exact(8) {
            assert_eq!(row, &expected);
        }
    }

    #[test]
    fn test_第八列系数不被快速路径忽略() {
        let idct = FixedIdct::new(&[16; 64]);
        let mut coeffs = [0i32; 64];
        coeffs[0] = 3;
        coeffs[9] = -2;
        coeffs[63] = 1;
        let out = idct.transform(&coeffs);
        assert_eq!(
            &out[..8],
            &[-3161, -1958, 4687, 7584, 16992, 19889, 26534, 27737]
        );
        assert_eq!(
            &out[56..],
            &[27737, 26534, 19889, 16992, 7584, 4687, -1958, -3161]
        );
    }
}
