use super::error::MetricsError;
use image::GrayImage;
use imageproc::template_matching::{match_template, MatchTemplateMethod};

/// 归一化互相关模板匹配的峰值
///
/// `template` 在 `image` 上滑动，每个位置
/// `R = Σ T·I / sqrt(Σ T² · Σ I²)`，返回所有位置中的最大值。
/// 能量为零时：两者都为零记 1，只有一方为零记 0。
pub fn cross_correlation_peak(image: &GrayImage, template: &GrayImage) -> Result<f64, MetricsError> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || iw == 0 || ih == 0 {
        return Err(MetricsError::InvalidFrame("empty correlation plane".to_string()));
    }
    if tw > iw || th > ih {
        return Err(MetricsError::InvalidFrame(format!(
            "template {}x{} larger than image {}x{}",
            tw, th, iw, ih
        )));
    }

    if template.as_raw().iter().all(|&t| t == 0) {
        // 全零模板的平方误差就是窗口能量，存在零能量窗口时峰值为 1
        let window_energy = match_template(image, template, MatchTemplateMethod::SumOfSquaredErrors);
        let has_empty_window = window_energy.pixels().any(|p| p[0] == 0.0);
        return Ok(if has_empty_window { 1.0 } else { 0.0 });
    }

    // 零能量窗口的 0/0 记 0
    let scores = match_template(image, template, MatchTemplateMethod::CrossCorrelationNormalized);
    Ok(scores
        .pixels()
        .map(|p| p[0] as f64)
        .map(|score| if score.is_finite() { score } else { 0.0 })
        .fold(0.0, f64::max))
}
