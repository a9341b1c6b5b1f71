//! Canny 边缘的时域差异
//!
//! 参考帧到下一参考帧、参考帧到下一渲染帧各得到一张边缘差异图，
//! 膨胀后比较两者的稀疏度。

use super::error::MetricsError;
use super::rescale::align_planes;
use image::GrayImage;
use imageproc::edges::canny;

pub const CANNY_LOW_THRESHOLD: f32 = 100.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 200.0;
/// 膨胀核尺寸占平面宽高的比例
const DILATION_FRACTION: f64 = 0.1;

pub fn canny_difference(
    reference: &GrayImage,
    next_reference: &GrayImage,
    next_rendition: &GrayImage,
) -> Result<f64, MetricsError> {
    let aligned = align_planes(&[reference, next_reference, next_rendition]);
    let [reference, next_reference, next_rendition] = aligned.as_slice() else {
        return Err(MetricsError::InvalidFrame("edge planes misaligned".to_string()));
    };

    let (width, height) = reference.dimensions();
    if width == 0 || height == 0 {
        return Err(MetricsError::InvalidFrame("empty edge plane".to_string()));
    }
    let (w, h) = (width as usize, height as usize);

    let reference_edges = detect_edges(reference);
    let reference_diff = edge_difference(&detect_edges(next_reference), &reference_edges);
    let rendition_diff = edge_difference(&detect_edges(next_rendition), &reference_edges);

    let kernel_w = ((w as f64 * DILATION_FRACTION) as usize).max(1);
    let kernel_h = ((h as f64 * DILATION_FRACTION) as usize).max(1);

    let total = (w * h) as f64;
    let reference_ratio = sparsity_ratio(&dilate_rect(&reference_diff, w, h, kernel_w, kernel_h), total);
    let rendition_ratio = sparsity_ratio(&dilate_rect(&rendition_diff, w, h, kernel_w, kernel_h), total);

    Ok((1.0 / reference_ratio - 1.0 / rendition_ratio).abs())
}

fn detect_edges(plane: &GrayImage) -> GrayImage {
    let (width, height) = plane.dimensions();
    if width < 3 || height < 3 {
        return GrayImage::new(width, height);
    }
    canny(plane, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD)
}

/// `next - base` 按 u8 回绕相减后的非零掩码：边缘出现或消失都计入
fn edge_difference(next: &GrayImage, base: &GrayImage) -> Vec<bool> {
    next.as_raw()
        .iter()
        .zip(base.as_raw().iter())
        .map(|(&n, &b)| n.wrapping_sub(b) != 0)
        .collect()
}

/// 全像素数 / 非零像素数，非零数为 0 时取全像素数
fn sparsity_ratio(mask: &[bool], total: f64) -> f64 {
    let nonzero = mask.iter().filter(|&&v| v).count();
    if nonzero == 0 {
        total
    } else {
        total / nonzero as f64
    }
}

/// 矩形结构元素膨胀（一次迭代，锚点在核中心，越界部分忽略）
fn dilate_rect(
    mask: &[bool],
    width: usize,
    height: usize,
    kernel_w: usize,
    kernel_h: usize,
) -> Vec<bool> {
    let mut horizontal = vec![false; mask.len()];
    for (src, dst) in mask.chunks_exact(width).zip(horizontal.chunks_exact_mut(width)) {
        dilate_line(src, kernel_w, dst);
    }

    let mut output = vec![false; mask.len()];
    let mut column = vec![false; height];
    let mut dilated = vec![false; height];
    for x in 0..width {
        for y in 0..height {
            column[y] = horizontal[y * width + x];
        }
        dilate_line(&column, kernel_h, &mut dilated);
        for y in 0..height {
            output[y * width + x] = dilated[y];
        }
    }
    output
}

/// 一维膨胀：窗口 `[i - k/2, i + k - 1 - k/2]` 内有任一非零即为非零
fn dilate_line(line: &[bool], kernel: usize, out: &mut [bool]) {
    if line.is_empty() {
        return;
    }
    let anchor = kernel / 2;
    let reach = kernel.saturating_sub(1) - anchor;

    let mut prefix = vec![0usize; line.len() + 1];
    for (i, &v) in line.iter().enumerate() {
        prefix[i + 1] = prefix[i] + v as usize;
    }

    for (i, slot) in out.iter_mut().enumerate().take(line.len()) {
        let lo = i.saturating_sub(anchor);
        let hi = (i + reach).min(line.len() - 1);
        *slot = prefix[hi + 1] > prefix[lo];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn square_plane(size: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let inside = x >= x0 && x < x0 + side && y >= y0 && y < y0 + side;
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn test_identical_frames_zero() {
        let plane = square_plane(64, 16, 16, 24);
        assert_eq!(canny_difference(&plane, &plane, &plane).unwrap(), 0.0);
    }

    #[test]
    fn test_identical_edge_patterns_zero() {
        let reference = square_plane(64, 10, 10, 20);
        let next = square_plane(64, 30, 30, 20);
        assert_eq!(canny_difference(&reference, &next, &next).unwrap(), 0.0);
    }

    #[test]
    fn test_missing_motion_in_rendition() {
        let reference = square_plane(64, 10, 10, 20);
        let next_reference = square_plane(64, 30, 30, 20);
        let next_rendition = GrayImage::new(64, 64);

        let value = canny_difference(&reference, &next_reference, &next_rendition).unwrap();
        assert!(value > 0.0);
        assert!(value <= 1.0);
    }

    #[test]
    fn test_vanished_edges_in_rendition() {
        let reference = square_plane(64, 10, 10, 20);
        let blank = GrayImage::new(64, 64);

        let value = canny_difference(&reference, &reference, &blank).unwrap();
        assert!(value > 0.0);
    }

    #[test]
    fn test_edge_difference_marks_both_directions() {
        let next = GrayImage::from_raw(3, 1, vec![255, 0, 0]).unwrap();
        let base = GrayImage::from_raw(3, 1, vec![0, 255, 0]).unwrap();
        assert_eq!(edge_difference(&next, &base), vec![true, true, false]);
    }

    #[test]
    fn test_tiny_planes() {
        let plane = GrayImage::from_pixel(2, 2, Luma([200]));
        assert_eq!(canny_difference(&plane, &plane, &plane).unwrap(), 0.0);
    }

    #[test]
    fn test_dilate_line() {
        let line = [false, false, true, false, false];
        let mut out = [false; 5];

        dilate_line(&line, 3, &mut out);
        assert_eq!(out, [false, true, true, true, false]);

        dilate_line(&line, 2, &mut out);
        assert_eq!(out, [false, false, true, true, false]);

        dilate_line(&line, 1, &mut out);
        assert_eq!(out, line);
    }

    #[test]
    fn test_dilate_rect() {
        let mut mask = vec![false; 25];
        mask[12] = true;
        let dilated = dilate_rect(&mask, 5, 5, 3, 1);
        let set: Vec<usize> = (0..25).filter(|&i| dilated[i]).collect();
        assert_eq!(set, vec![11, 12, 13]);
    }

    #[test]
    fn test_sparsity_ratio() {
        assert_eq!(sparsity_ratio(&[false; 4], 4.0), 4.0);
        assert_eq!(sparsity_ratio(&[true, false, false, false], 4.0), 4.0);
        assert_eq!(sparsity_ratio(&[true, true, false, false], 4.0), 2.0);
    }
}
