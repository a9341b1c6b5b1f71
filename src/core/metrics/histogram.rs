use super::error::MetricsError;
use super::frame::Frame;
use rayon::prelude::*;

pub const BINS_PER_CHANNEL: usize = 8;
pub const HISTOGRAM_BINS: usize = BINS_PER_CHANNEL * BINS_PER_CHANNEL * BINS_PER_CHANNEL;
const CHI_SQUARED_EPS: f64 = 1e-10;

/// 三通道 8x8x8 颜色直方图（行优先展开），单通道帧三个轴都用同一通道
pub fn color_histogram(frame: &Frame) -> Result<Vec<f64>, MetricsError> {
    frame.validate()?;
    let channels = frame.channels as usize;
    let row_len = frame.width as usize * channels;

    // 按行并行累加，再归并
    let counts = frame
        .data
        .par_chunks(row_len)
        .map(|row| {
            let mut local = [0u32; HISTOGRAM_BINS];
            for px in row.chunks_exact(channels) {
                let (c0, c1, c2) = if channels >= 3 {
                    (px[0], px[1], px[2])
                } else {
                    (px[0], px[0], px[0])
                };
                local[bin_index(c0, c1, c2)] += 1;
            }
            local
        })
        .reduce(
            || [0u32; HISTOGRAM_BINS],
            |mut acc, local| {
                for (acc_bin, local_bin) in acc.iter_mut().zip(local.iter()) {
                    *acc_bin += *local_bin;
                }
                acc
            },
        );

    Ok(counts.iter().map(|&c| c as f64).collect())
}

#[inline]
fn bin_index(c0: u8, c1: u8, c2: u8) -> usize {
    let shift = 8 - BINS_PER_CHANNEL.trailing_zeros();
    let (a, b, c) = (
        (c0 >> shift) as usize,
        (c1 >> shift) as usize,
        (c2 >> shift) as usize,
    );
    (a * BINS_PER_CHANNEL + b) * BINS_PER_CHANNEL + c
}

/// 线性缩放到 [0, 1]；所有 bin 相同时全部置 0
pub fn min_max_normalize(histogram: &mut [f64]) {
    let min = histogram.iter().copied().fold(f64::INFINITY, f64::min);
    let max = histogram.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    for v in histogram.iter_mut() {
        *v = if range > 0.0 { (*v - min) / range } else { 0.0 };
    }
}

pub fn chi_squared_distance(a: &[f64], b: &[f64]) -> f64 {
    0.5 * a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2) / (x + y + CHI_SQUARED_EPS))
        .sum::<f64>()
}

/// 参考帧与渲染帧颜色直方图的卡方距离
pub fn histogram_distance(reference: &Frame, rendition: &Frame) -> Result<f64, MetricsError> {
    let mut hist_a = color_histogram(reference)?;
    let mut hist_b = color_histogram(rendition)?;
    min_max_normalize(&mut hist_a);
    min_max_normalize(&mut hist_b);
    Ok(chi_squared_distance(&hist_a, &hist_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned(width: u32, height: u32, seed: u32) -> Frame {
        let data = (0..width * height * 3)
            .map(|i| ((i * 97 + seed * 13 + i / 5) % 256) as u8)
            .collect();
        Frame::bgr(width, height, data)
    }

    #[test]
    fn test_histogram_counts_every_pixel() {
        let frame = patterned(40, 30, 1);
        let hist = color_histogram(&frame).unwrap();

        assert_eq!(hist.len(), HISTOGRAM_BINS);
        assert_eq!(hist.iter().sum::<f64>(), 1200.0);
    }

    #[test]
    fn test_bin_index() {
        assert_eq!(bin_index(0, 0, 0), 0);
        assert_eq!(bin_index(255, 255, 255), HISTOGRAM_BINS - 1);
        assert_eq!(bin_index(32, 0, 0), 64);
        assert_eq!(bin_index(0, 31, 64), 2);
    }

    #[test]
    fn test_gray_frame_uses_diagonal() {
        let frame = Frame::filled(4, 4, 1, 100);
        let hist = color_histogram(&frame).unwrap();
        assert_eq!(hist[bin_index(100, 100, 100)], 16.0);
    }

    #[test]
    fn test_identical_frames_zero() {
        let frame = patterned(64, 48, 2);
        assert_eq!(histogram_distance(&frame, &frame).unwrap(), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = patterned(64, 48, 2);
        let b = patterned(32, 20, 9);

        let ab = histogram_distance(&a, &b).unwrap();
        let ba = histogram_distance(&b, &a).unwrap();
        assert!(ab > 0.0);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_solid_colours() {
        let a = Frame::filled(16, 16, 3, 10);
        let b = Frame::filled(16, 16, 3, 240);
        let value = histogram_distance(&a, &b).unwrap();
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_max_normalize_constant() {
        let mut hist = vec![5.0; 8];
        min_max_normalize(&mut hist);
        assert!(hist.iter().all(|&v| v == 0.0));

        let mut hist = vec![2.0, 4.0, 6.0];
        min_max_normalize(&mut hist);
        assert_eq!(hist, vec![0.0, 0.5, 1.0]);
    }
}
