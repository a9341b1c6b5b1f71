//! 帧对指标引擎
//!
//! 构造时固定指标列表与哈希参数；每次调用都是输入帧的纯函数，
//! 共享的中间结果（V 平面、哈希、对齐后的平面）每次调用最多计算一次。

use super::context::{FramePairContext, PairArtifacts};
use super::error::MetricsError;
use super::frame::Frame;
use super::hash::HashGrid;
use super::metric::MetricId;
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_HASH_SIZE: u32 = 16;
pub const DEFAULT_SKIP_FRAMES: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub metrics: Vec<MetricId>,
    pub hash_size: u32,
    /// 只供外部采样器使用，引擎内部不参与计算
    pub skip_frames: u32,
    pub hash_grid: HashGrid,
}

/// JSON 配置的原始形式，指标名在转换时校验
#[derive(Debug, Deserialize)]
struct RawEngineConfig {
    metrics: Vec<String>,
    #[serde(default = "default_hash_size")]
    hash_size: u32,
    #[serde(default = "default_skip_frames")]
    skip_frames: u32,
    #[serde(default)]
    hash_grid: HashGrid,
}

fn default_hash_size() -> u32 {
    DEFAULT_HASH_SIZE
}

fn default_skip_frames() -> u32 {
    DEFAULT_SKIP_FRAMES
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(MetricId::ALL.to_vec())
    }
}

impl EngineConfig {
    pub fn new(metrics: Vec<MetricId>) -> Self {
        Self {
            metrics,
            hash_size: DEFAULT_HASH_SIZE,
            skip_frames: DEFAULT_SKIP_FRAMES,
            hash_grid: HashGrid::default(),
        }
    }

    /// 按名称构造，未知名称直接报错
    pub fn from_names<I, S>(names: I) -> Result<Self, MetricsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let metrics = names
            .into_iter()
            .map(|name| name.as_ref().parse::<MetricId>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(metrics))
    }

    /// `{"metrics": [...], "hash_size": 16, "skip_frames": 1, "hash_grid": "reshape"}`
    pub fn from_json(json: &str) -> Result<Self, MetricsError> {
        let raw: RawEngineConfig = serde_json::from_str(json)?;
        Ok(Self::from_names(&raw.metrics)?
            .with_hash_size(raw.hash_size)
            .with_skip_frames(raw.skip_frames)
            .with_hash_grid(raw.hash_grid))
    }

    pub fn with_hash_size(mut self, hash_size: u32) -> Self {
        self.hash_size = hash_size;
        self
    }

    pub fn with_skip_frames(mut self, skip_frames: u32) -> Self {
        self.skip_frames = skip_frames;
        self
    }

    pub fn with_hash_grid(mut self, hash_grid: HashGrid) -> Self {
        self.hash_grid = hash_grid;
        self
    }
}

/// 指标结果：只包含已配置的指标
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricResult {
    values: BTreeMap<MetricId, f64>,
}

impl MetricResult {
    pub fn get(&self, metric: MetricId) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    pub fn contains(&self, metric: MetricId) -> bool {
        self.values.contains_key(&metric)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricId, f64)> + '_ {
        self.values.iter().map(|(&k, &v)| (k, v))
    }

    /// 按给定顺序取出特征值，缺任何一项返回 None
    pub fn feature_row(&self, order: &[MetricId]) -> Option<Vec<f64>> {
        order.iter().map(|&metric| self.get(metric)).collect()
    }

    pub fn to_json(&self) -> Result<String, MetricsError> {
        Ok(serde_json::to_string(self)?)
    }

    fn insert(&mut self, metric: MetricId, value: f64) {
        self.values.insert(metric, value);
    }
}

pub struct FramePairMetricsEngine {
    config: EngineConfig,
}

impl FramePairMetricsEngine {
    pub fn new(mut config: EngineConfig) -> Result<Self, MetricsError> {
        if config.hash_size < 2 {
            return Err(MetricsError::InvalidConfig(format!(
                "hash_size must be at least 2, got {}",
                config.hash_size
            )));
        }

        // 重复的指标只保留第一次出现
        let mut unique = Vec::with_capacity(config.metrics.len());
        for metric in config.metrics.drain(..) {
            if unique.contains(&metric) {
                warn!("⚠️ Duplicate metric in config ignored: {}", metric);
            } else {
                unique.push(metric);
            }
        }
        config.metrics = unique;

        info!(
            "📐 FramePairMetricsEngine: {} metrics, hash_size={}, skip_frames={}",
            config.metrics.len(),
            config.hash_size,
            config.skip_frames
        );
        Ok(Self { config })
    }

    pub fn from_json(json: &str) -> Result<Self, MetricsError> {
        Self::new(EngineConfig::from_json(json)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &[MetricId] {
        &self.config.metrics
    }

    pub fn skip_frames(&self) -> u32 {
        self.config.skip_frames
    }

    /// 采样器取 "下一帧" 的位置
    pub fn next_frame_index(&self, frame_pos: u64) -> u64 {
        frame_pos.saturating_add(self.config.skip_frames as u64)
    }

    pub fn compute_metrics(
        &self,
        frame_pos: u64,
        rendition_frame: &Frame,
        next_rendition_frame: &Frame,
        reference_frame: &Frame,
        next_reference_frame: &Frame,
    ) -> Result<MetricResult, MetricsError> {
        self.compute(&FramePairContext::new(
            frame_pos,
            rendition_frame,
            next_rendition_frame,
            reference_frame,
            next_reference_frame,
        ))
    }

    pub fn compute(&self, pair: &FramePairContext<'_>) -> Result<MetricResult, MetricsError> {
        if let Err(e) = pair.validate() {
            error!("❌ Rejected frame pair at {}: {}", pair.frame_pos, e);
            return Err(e);
        }

        let artifacts = PairArtifacts::new(*pair, self.config.hash_size, self.config.hash_grid);
        let mut result = MetricResult::default();

        for &metric in &self.config.metrics {
            let value = ensure_finite(metric, (metric.evaluator())(&artifacts)?, pair.frame_pos)?;
            result.insert(metric, value);
        }

        debug!(
            "Frame {}: computed {} metrics",
            pair.frame_pos,
            result.len()
        );
        Ok(result)
    }

    /// 并行计算多个帧对，结果顺序与输入一致
    pub fn compute_batch(
        &self,
        pairs: &[FramePairContext<'_>],
    ) -> Vec<Result<MetricResult, MetricsError>> {
        pairs.par_iter().map(|pair| self.compute(pair)).collect()
    }

    /// 按配置顺序展开成特征行
    pub fn feature_row(&self, result: &MetricResult) -> Option<Vec<f64>> {
        result.feature_row(&self.config.metrics)
    }
}

/// NaN / 无穷大不作为指标值返回
fn ensure_finite(metric: MetricId, value: f64, frame_pos: u64) -> Result<f64, MetricsError> {
    if value.is_finite() {
        return Ok(value);
    }
    error!("❌ {} produced {} at frame {}", metric, value, frame_pos);
    Err(MetricsError::InvalidFrame(format!(
        "{} produced non-finite value {} at frame {}",
        metric, value, frame_pos
    )))
}
