use super::context::PairArtifacts;
use super::correlation::cross_correlation_peak;
use super::dct::dct_divergence;
use super::edges::canny_difference;
use super::error::MetricsError;
use super::hash::{cosine_distance, euclidean_distance, hamming_distance};
use super::histogram::histogram_distance;
use super::rescale::rescale_planes;
use super::scalar::{difference_ratio, mse, psnr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 指标标识（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    TemporalHistogramDistance,
    TemporalDifference,
    TemporalPsnr,
    TemporalMse,
    TemporalCanny,
    TemporalCrossCorrelation,
    TemporalDct,
    HashEuclidean,
    HashHamming,
    HashCosine,
}

/// 指标计算函数：只依赖缓存中它需要的中间结果
pub(crate) type Evaluator = fn(&PairArtifacts<'_>) -> Result<f64, MetricsError>;

impl MetricId {
    pub const ALL: [MetricId; 10] = [
        MetricId::TemporalHistogramDistance,
        MetricId::TemporalDifference,
        MetricId::TemporalPsnr,
        MetricId::TemporalMse,
        MetricId::TemporalCanny,
        MetricId::TemporalCrossCorrelation,
        MetricId::TemporalDct,
        MetricId::HashEuclidean,
        MetricId::HashHamming,
        MetricId::HashCosine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricId::TemporalHistogramDistance => "temporal_histogram_distance",
            MetricId::TemporalDifference => "temporal_difference",
            MetricId::TemporalPsnr => "temporal_psnr",
            MetricId::TemporalMse => "temporal_mse",
            MetricId::TemporalCanny => "temporal_canny",
            MetricId::TemporalCrossCorrelation => "temporal_cross_correlation",
            MetricId::TemporalDct => "temporal_dct",
            MetricId::HashEuclidean => "hash_euclidean",
            MetricId::HashHamming => "hash_hamming",
            MetricId::HashCosine => "hash_cosine",
        }
    }

    /// 分发表
    pub(crate) fn evaluator(self) -> Evaluator {
        match self {
            MetricId::TemporalHistogramDistance => temporal_histogram_distance,
            MetricId::TemporalDifference => temporal_difference,
            MetricId::TemporalPsnr => temporal_psnr,
            MetricId::TemporalMse => temporal_mse,
            MetricId::TemporalCanny => temporal_canny,
            MetricId::TemporalCrossCorrelation => temporal_cross_correlation,
            MetricId::TemporalDct => temporal_dct,
            MetricId::HashEuclidean => hash_euclidean,
            MetricId::HashHamming => hash_hamming,
            MetricId::HashCosine => hash_cosine,
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricId {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| MetricsError::UnknownMetric(s.to_string()))
    }
}

fn temporal_histogram_distance(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    histogram_distance(ctx.pair().reference, ctx.pair().rendition)
}

/// 渲染帧与其下一帧之间的像素变化比例
fn temporal_difference(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    difference_ratio(ctx.rendition_plane()?, ctx.next_rendition_plane()?)
}

fn temporal_psnr(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    let (reference, next_rendition) =
        rescale_planes(ctx.reference_plane()?, ctx.next_rendition_plane()?);
    psnr(&reference, &next_rendition)
}

fn temporal_mse(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    let (reference, next_reference) =
        rescale_planes(ctx.reference_plane()?, ctx.next_reference_plane()?);
    mse(&reference, &next_reference)
}

fn temporal_canny(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    canny_difference(
        ctx.reference_plane()?,
        ctx.next_reference_plane()?,
        ctx.next_rendition_plane()?,
    )
}

/// 渲染帧作为模板在参考帧上匹配
fn temporal_cross_correlation(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    let (reference, rendition) = ctx.aligned_reference_rendition()?;
    cross_correlation_peak(reference, rendition)
}

fn temporal_dct(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    let (reference, rendition) = ctx.aligned_reference_rendition()?;
    dct_divergence(reference, rendition)
}

fn hash_euclidean(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    Ok(euclidean_distance(ctx.reference_hash()?, ctx.rendition_hash()?))
}

fn hash_hamming(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    Ok(hamming_distance(ctx.reference_hash()?, ctx.rendition_hash()?))
}

fn hash_cosine(ctx: &PairArtifacts<'_>) -> Result<f64, MetricsError> {
    Ok(cosine_distance(ctx.reference_hash()?, ctx.rendition_hash()?))
}
