//! 频域比较：正交归一化 2D DCT-II 的差值最大值

use super::error::MetricsError;
use image::GrayImage;
use rustdct::{Dct2, DctPlanner};

/// 平面归一化到 [0, 1] 后做 2D DCT，返回行优先系数
fn dct2_orthonormal(plane: &GrayImage, planner: &mut DctPlanner<f64>) -> Vec<f64> {
    let (width, height) = plane.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut coeffs: Vec<f64> = plane.as_raw().iter().map(|&v| v as f64 / 255.0).collect();

    // 行变换
    let row_dct = planner.plan_dct2(w);
    let row_scale = axis_scales(w);
    for row in coeffs.chunks_exact_mut(w) {
        row_dct.process_dct2(row);
        for (value, scale) in row.iter_mut().zip(row_scale.iter()) {
            *value *= scale;
        }
    }

    // 列变换
    let col_dct = planner.plan_dct2(h);
    let col_scale = axis_scales(h);
    let mut column = vec![0.0f64; h];
    for x in 0..w {
        for (y, slot) in column.iter_mut().enumerate() {
            *slot = coeffs[y * w + x];
        }
        col_dct.process_dct2(&mut column);
        for (y, value) in column.iter().enumerate() {
            coeffs[y * w + x] = value * col_scale[y];
        }
    }

    coeffs
}

/// 正交归一化系数：k=0 为 sqrt(1/N)，其余为 sqrt(2/N)
fn axis_scales(n: usize) -> Vec<f64> {
    let n_f = n as f64;
    (0..n)
        .map(|k| {
            if k == 0 {
                (1.0 / n_f).sqrt()
            } else {
                (2.0 / n_f).sqrt()
            }
        })
        .collect()
}

/// `dct(reference) - dct(rendition)` 的最大值，两平面尺寸必须一致
pub fn dct_divergence(reference: &GrayImage, rendition: &GrayImage) -> Result<f64, MetricsError> {
    if reference.dimensions() != rendition.dimensions() {
        return Err(MetricsError::InvalidFrame(format!(
            "dct plane shape mismatch: {:?} vs {:?}",
            reference.dimensions(),
            rendition.dimensions()
        )));
    }
    if reference.is_empty() {
        return Err(MetricsError::InvalidFrame("empty dct plane".to_string()));
    }

    let mut planner = DctPlanner::new();
    let reference_dct = dct2_orthonormal(reference, &mut planner);
    let rendition_dct = dct2_orthonormal(rendition, &mut planner);

    Ok(reference_dct
        .iter()
        .zip(rendition_dct.iter())
        .map(|(a, b)| a - b)
        .fold(f64::NEG_INFINITY, f64::max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_identical_planes_zero() {
        let plane = GrayImage::from_fn(40, 30, |x, y| Luma([(x * 5 + y * 2) as u8]));
        assert_eq!(dct_divergence(&plane, &plane).unwrap(), 0.0);
    }

    #[test]
    fn test_dc_difference() {
        // 常数平面只有 DC 分量：sqrt(W*H) * 1.0
        let white = GrayImage::from_pixel(64, 64, Luma([255]));
        let black = GrayImage::from_pixel(64, 64, Luma([0]));

        let value = dct_divergence(&white, &black).unwrap();
        assert!((value - 64.0).abs() < 1e-9);

        // 反方向时差值全部 <= 0，最大值是某个 ~0 的交流分量
        let reversed = dct_divergence(&black, &white).unwrap();
        assert!(reversed.abs() < 1e-9);
    }

    #[test]
    fn test_odd_sizes_supported() {
        let a = GrayImage::from_fn(7, 5, |x, y| Luma([(x * 30 + y * 11) as u8]));
        let b = GrayImage::from_fn(7, 5, |x, y| Luma([(x * 29 + y * 13) as u8]));
        assert!(dct_divergence(&a, &b).unwrap().is_finite());
    }

    #[test]
    fn test_orthonormal_energy_preserved() {
        let plane = GrayImage::from_fn(8, 6, |x, y| Luma([(x * 31 + y * 17) as u8]));
        let mut planner = DctPlanner::new();
        let coeffs = dct2_orthonormal(&plane, &mut planner);

        let spatial: f64 = plane
            .as_raw()
            .iter()
            .map(|&v| (v as f64 / 255.0).powi(2))
            .sum();
        let spectral: f64 = coeffs.iter().map(|c| c * c).sum();
        assert!((spatial - spectral).abs() < 1e-9);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let a = GrayImage::new(8, 8);
        let b = GrayImage::new(8, 7);
        assert!(dct_divergence(&a, &b).is_err());
    }
}
