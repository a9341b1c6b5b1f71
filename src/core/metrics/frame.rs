use super::error::MetricsError;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer};

/// 帧数据结构（交错存储：height × width × channels，行优先）
///
/// 颜色通道的字节序不做解释，只要求同一次调用的四帧保持一致；
/// 下游模型训练时使用的是 BGR。
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// 单通道（灰度）帧
    pub fn gray(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, 1, data)
    }

    /// 三通道 BGR 帧
    pub fn bgr(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, 3, data)
    }

    pub fn filled(width: u32, height: u32, channels: u8, value: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self::new(width, height, channels, vec![value; len])
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// (height, width)
    pub fn shape(&self) -> (u32, u32) {
        (self.height, self.width)
    }

    /// 校验帧的形状与缓冲区长度
    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.width == 0 || self.height == 0 {
            return Err(MetricsError::InvalidFrame(format!(
                "zero-area frame {}x{}",
                self.width, self.height
            )));
        }
        if !(1..=4).contains(&self.channels) {
            return Err(MetricsError::InvalidFrame(format!(
                "unsupported channel count {}",
                self.channels
            )));
        }
        let expected = self.pixel_count() * self.channels as usize;
        if self.data.len() != expected {
            return Err(MetricsError::InvalidFrame(format!(
                "buffer length {} does not match {}x{}x{} = {}",
                self.data.len(),
                self.width,
                self.height,
                self.channels,
                expected
            )));
        }
        Ok(())
    }

    /// HSV 的 V 通道（各颜色通道的最大值），单通道帧直接复制
    pub fn value_plane(&self) -> Result<GrayImage, MetricsError> {
        self.validate()?;
        let c = self.channels as usize;
        let values: Vec<u8> = match self.channels {
            1 => self.data.clone(),
            2 => self.data.chunks_exact(2).map(|px| px[0]).collect(),
            _ => self
                .data
                .chunks_exact(c)
                .map(|px| px[0].max(px[1]).max(px[2]))
                .collect(),
        };
        GrayImage::from_raw(self.width, self.height, values).ok_or_else(|| {
            MetricsError::InvalidFrame("value plane buffer too small".to_string())
        })
    }

    pub fn resize_to(&self, target_width: u32, target_height: u32) -> Result<Frame, MetricsError> {
        if (self.width, self.height) == (target_width, target_height) {
            return Ok(self.clone());
        }
        let resized =
            self.to_dynamic()?
                .resize_exact(target_width, target_height, FilterType::Triangle);
        Ok(Self::from_dynamic(resized))
    }

    pub(crate) fn to_dynamic(&self) -> Result<DynamicImage, MetricsError> {
        self.validate()?;
        let (w, h) = (self.width, self.height);
        let data = self.data.clone();
        let image = match self.channels {
            1 => ImageBuffer::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            2 => ImageBuffer::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
            3 => ImageBuffer::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            _ => ImageBuffer::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        };
        image.ok_or_else(|| MetricsError::InvalidFrame("image buffer too small".to_string()))
    }

    pub(crate) fn from_dynamic(image: DynamicImage) -> Frame {
        let (width, height) = (image.width(), image.height());
        let (channels, data) = match image {
            DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            other => (4, other.to_rgba8().into_raw()),
        };
        Frame::new(width, height, channels, data)
    }
}

/// 从原生层传递的 YUV420 原始帧数据
#[derive(Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
}

impl RawFrame {
    /// 转为三通道 BGR 帧
    pub fn to_bgr(&self) -> Result<Frame, MetricsError> {
        let w = self.width as usize;
        let h = self.height as usize;
        let uv_w = w.div_ceil(2);
        let uv_len = uv_w * h.div_ceil(2);

        if w == 0 || h == 0 {
            return Err(MetricsError::InvalidFrame(format!(
                "zero-area raw frame {}x{}",
                w, h
            )));
        }
        if self.y_plane.len() < w * h
            || self.u_plane.len() < uv_len
            || self.v_plane.len() < uv_len
        {
            return Err(MetricsError::InvalidFrame(format!(
                "YUV420 planes too small for {}x{} (y={}, u={}, v={})",
                w,
                h,
                self.y_plane.len(),
                self.u_plane.len(),
                self.v_plane.len()
            )));
        }

        let mut bgr = vec![0u8; w * h * 3];
        for y in 0..h {
            for x in 0..w {
                let y_idx = y * w + x;
                let uv_idx = (y / 2) * uv_w + x / 2;

                let y_val = self.y_plane[y_idx] as f32;
                let u_val = self.u_plane[uv_idx] as f32 - 128.0;
                let v_val = self.v_plane[uv_idx] as f32 - 128.0;

                let r = (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8;
                let g = (y_val - 0.344136 * u_val - 0.714136 * v_val).clamp(0.0, 255.0) as u8;
                let b = (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8;

                let idx = y_idx * 3;
                bgr[idx] = b;
                bgr[idx + 1] = g;
                bgr[idx + 2] = r;
            }
        }

        Ok(Frame::bgr(self.width, self.height, bgr))
    }
}
