//! MSE / PSNR 以及帧间像素差异比例

use super::error::MetricsError;
use super::rescale::rescale_planes;
use image::GrayImage;

/// MSE 为 0 时的 PSNR 哨兵值
pub const PSNR_IDENTICAL: f64 = 100.0;
const PIXEL_MAX: f64 = 255.0;

fn ensure_same_shape(a: &GrayImage, b: &GrayImage) -> Result<(), MetricsError> {
    if a.dimensions() != b.dimensions() {
        return Err(MetricsError::InvalidFrame(format!(
            "plane shape mismatch: {:?} vs {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }
    if a.is_empty() {
        return Err(MetricsError::InvalidFrame("empty plane".to_string()));
    }
    Ok(())
}

pub fn mse(a: &GrayImage, b: &GrayImage) -> Result<f64, MetricsError> {
    ensure_same_shape(a, b)?;
    let sum: f64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw().iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum / a.as_raw().len() as f64)
}

pub fn psnr_from_mse(mse: f64) -> f64 {
    if mse == 0.0 {
        return PSNR_IDENTICAL;
    }
    20.0 * (PIXEL_MAX / mse.sqrt()).log10()
}

/// a 视为原始信号，b 视为带噪信号
pub fn psnr(a: &GrayImage, b: &GrayImage) -> Result<f64, MetricsError> {
    Ok(psnr_from_mse(mse(a, b)?))
}

/// 两帧之间取值不同的像素比例，尺寸不同时先对齐
pub fn difference_ratio(current: &GrayImage, next: &GrayImage) -> Result<f64, MetricsError> {
    let (current, next) = rescale_planes(current, next);
    ensure_same_shape(&current, &next)?;

    let total = current.as_raw().len();
    let changed = current
        .as_raw()
        .iter()
        .zip(next.as_raw().iter())
        .filter(|(a, b)| a != b)
        .count();
    Ok(changed as f64 / total as f64)
}
