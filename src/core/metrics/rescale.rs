//! 帧对齐：把两帧（或多个平面）缩放到共同的最小尺寸
//!
//! 宽、高分别取最小值，不做宽高比校正。

use super::error::MetricsError;
use super::frame::Frame;
use image::imageops::{self, FilterType};
use image::GrayImage;

/// 目标尺寸 (width, height)：各维度取最小值
fn common_dimensions(dims: impl IntoIterator<Item = (u32, u32)>) -> Option<(u32, u32)> {
    dims.into_iter()
        .reduce(|(aw, ah), (bw, bh)| (aw.min(bw), ah.min(bh)))
}

pub fn rescale_pair(a: &Frame, b: &Frame) -> Result<(Frame, Frame), MetricsError> {
    a.validate()?;
    b.validate()?;
    if a.channels != b.channels {
        return Err(MetricsError::InvalidFrame(format!(
            "channel mismatch: {} vs {}",
            a.channels, b.channels
        )));
    }

    let width = a.width.min(b.width);
    let height = a.height.min(b.height);
    Ok((a.resize_to(width, height)?, b.resize_to(width, height)?))
}

pub fn rescale_planes(a: &GrayImage, b: &GrayImage) -> (GrayImage, GrayImage) {
    let (width, height) = (a.width().min(b.width()), a.height().min(b.height()));
    (
        resize_plane(a, width, height),
        resize_plane(b, width, height),
    )
}

/// 多个平面对齐到共同尺寸（边缘分析需要三个平面）
pub fn align_planes(planes: &[&GrayImage]) -> Vec<GrayImage> {
    let Some((width, height)) = common_dimensions(planes.iter().map(|p| p.dimensions())) else {
        return Vec::new();
    };
    planes
        .iter()
        .map(|plane| resize_plane(plane, width, height))
        .collect()
}

fn resize_plane(plane: &GrayImage, width: u32, height: u32) -> GrayImage {
    if plane.dimensions() == (width, height) {
        return plane.clone();
    }
    imageops::resize(plane, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_pair_takes_min_per_dimension() {
        let a = Frame::filled(640, 360, 3, 10);
        let b = Frame::filled(320, 480, 3, 20);

        let (ra, rb) = rescale_pair(&a, &b).unwrap();
        assert_eq!(ra.shape(), (360, 320));
        assert_eq!(rb.shape(), (360, 320));
        assert_eq!(ra.data.len(), rb.data.len());
    }

    #[test]
    fn test_rescale_pair_identical_shapes_untouched() {
        let a = Frame::gray(4, 2, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let b = Frame::gray(4, 2, vec![8, 7, 6, 5, 4, 3, 2, 1]);

        let (ra, rb) = rescale_pair(&a, &b).unwrap();
        assert_eq!(ra, a);
        assert_eq!(rb, b);
    }

    #[test]
    fn test_rescale_pair_channel_mismatch() {
        let a = Frame::filled(8, 8, 1, 0);
        let b = Frame::filled(8, 8, 3, 0);
        assert!(matches!(
            rescale_pair(&a, &b),
            Err(MetricsError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_rescale_planes() {
        let a = GrayImage::new(100, 40);
        let b = GrayImage::new(30, 90);

        let (ra, rb) = rescale_planes(&a, &b);
        assert_eq!(ra.dimensions(), (30, 40));
        assert_eq!(rb.dimensions(), (30, 40));
    }

    #[test]
    fn test_align_planes() {
        let a = GrayImage::new(100, 40);
        let b = GrayImage::new(30, 90);
        let c = GrayImage::new(50, 20);

        let aligned = align_planes(&[&a, &b, &c]);
        assert_eq!(aligned.len(), 3);
        assert!(aligned.iter().all(|p| p.dimensions() == (30, 20)));
        assert!(align_planes(&[]).is_empty());
    }
}
