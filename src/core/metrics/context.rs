use super::error::MetricsError;
use super::frame::Frame;
use super::hash::{dhash, HashGrid};
use super::rescale::rescale_planes;
use image::GrayImage;
use once_cell::unsync::OnceCell;

/// 一次调用的四帧及帧位置（借用，调用结束即丢弃）
#[derive(Debug, Clone, Copy)]
pub struct FramePairContext<'a> {
    pub reference: &'a Frame,
    pub next_reference: &'a Frame,
    pub rendition: &'a Frame,
    pub next_rendition: &'a Frame,
    pub frame_pos: u64,
}

impl<'a> FramePairContext<'a> {
    pub fn new(
        frame_pos: u64,
        rendition: &'a Frame,
        next_rendition: &'a Frame,
        reference: &'a Frame,
        next_reference: &'a Frame,
    ) -> Self {
        Self {
            reference,
            next_reference,
            rendition,
            next_rendition,
            frame_pos,
        }
    }

    pub fn validate(&self) -> Result<(), MetricsError> {
        let frames = [
            ("reference", self.reference),
            ("next_reference", self.next_reference),
            ("rendition", self.rendition),
            ("next_rendition", self.next_rendition),
        ];
        for (name, frame) in frames {
            frame.validate().map_err(|e| match e {
                MetricsError::InvalidFrame(msg) => {
                    MetricsError::InvalidFrame(format!("{} frame at {}: {}", name, self.frame_pos, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

/// 单次调用内的中间结果缓存，每项最多计算一次
pub(crate) struct PairArtifacts<'a> {
    pair: FramePairContext<'a>,
    hash_size: u32,
    hash_grid: HashGrid,
    reference_plane: OnceCell<GrayImage>,
    next_reference_plane: OnceCell<GrayImage>,
    rendition_plane: OnceCell<GrayImage>,
    next_rendition_plane: OnceCell<GrayImage>,
    reference_hash: OnceCell<Vec<u8>>,
    rendition_hash: OnceCell<Vec<u8>>,
    aligned_reference_rendition: OnceCell<(GrayImage, GrayImage)>,
}

impl<'a> PairArtifacts<'a> {
    pub fn new(pair: FramePairContext<'a>, hash_size: u32, hash_grid: HashGrid) -> Self {
        Self {
            pair,
            hash_size,
            hash_grid,
            reference_plane: OnceCell::new(),
            next_reference_plane: OnceCell::new(),
            rendition_plane: OnceCell::new(),
            next_rendition_plane: OnceCell::new(),
            reference_hash: OnceCell::new(),
            rendition_hash: OnceCell::new(),
            aligned_reference_rendition: OnceCell::new(),
        }
    }

    pub fn pair(&self) -> &FramePairContext<'a> {
        &self.pair
    }

    pub fn reference_plane(&self) -> Result<&GrayImage, MetricsError> {
        self.reference_plane
            .get_or_try_init(|| self.pair.reference.value_plane())
    }

    pub fn next_reference_plane(&self) -> Result<&GrayImage, MetricsError> {
        self.next_reference_plane
            .get_or_try_init(|| self.pair.next_reference.value_plane())
    }

    pub fn rendition_plane(&self) -> Result<&GrayImage, MetricsError> {
        self.rendition_plane
            .get_or_try_init(|| self.pair.rendition.value_plane())
    }

    pub fn next_rendition_plane(&self) -> Result<&GrayImage, MetricsError> {
        self.next_rendition_plane
            .get_or_try_init(|| self.pair.next_rendition.value_plane())
    }

    pub fn reference_hash(&self) -> Result<&[u8], MetricsError> {
        self.reference_hash
            .get_or_try_init(|| dhash(self.pair.reference, self.hash_size, self.hash_grid))
            .map(Vec::as_slice)
    }

    pub fn rendition_hash(&self) -> Result<&[u8], MetricsError> {
        self.rendition_hash
            .get_or_try_init(|| dhash(self.pair.rendition, self.hash_size, self.hash_grid))
            .map(Vec::as_slice)
    }

    /// 参考帧与渲染帧的 V 平面，已对齐到共同尺寸（DCT 与互相关共用）
    pub fn aligned_reference_rendition(&self) -> Result<(&GrayImage, &GrayImage), MetricsError> {
        let (reference, rendition) = self.aligned_reference_rendition.get_or_try_init(|| {
            Ok::<_, MetricsError>(rescale_planes(
                self.reference_plane()?,
                self.rendition_plane()?,
            ))
        })?;
        Ok((reference, rendition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_names_offending_frame() {
        let good = Frame::filled(8, 8, 3, 0);
        let bad = Frame::bgr(8, 8, vec![0u8; 10]);
        let pair = FramePairContext::new(42, &good, &bad, &good, &good);

        let err = pair.validate().unwrap_err().to_string();
        assert!(err.contains("next_rendition"));
        assert!(err.contains("42"));
    }

    #[test]
    fn test_artifacts_cached() {
        let reference = Frame::filled(16, 8, 3, 50);
        let rendition = Frame::filled(8, 16, 3, 60);
        let pair = FramePairContext::new(0, &rendition, &rendition, &reference, &reference);
        let artifacts = PairArtifacts::new(pair, 16, HashGrid::Reshape);

        let first = artifacts.reference_plane().unwrap() as *const GrayImage;
        let second = artifacts.reference_plane().unwrap() as *const GrayImage;
        assert_eq!(first, second);

        let (r, d) = artifacts.aligned_reference_rendition().unwrap();
        assert_eq!(r.dimensions(), (8, 8));
        assert_eq!(d.dimensions(), (8, 8));
        assert!(r.as_raw().iter().all(|&v| v == 50));
    }
}
