//! 帧对指标计算器

use crate::core::metrics::{
    EngineConfig, Frame, FramePairContext, FramePairMetricsEngine, MetricResult, MetricsError,
    RawFrame,
};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Mutex;

const DEFAULT_MAX_THREADS: usize = 4;

/// 一个帧对的自有输入（跨线程传递时使用）
#[derive(Debug, Clone)]
pub struct FramePairInput {
    pub frame_pos: u64,
    pub reference: Frame,
    pub next_reference: Frame,
    pub rendition: Frame,
    pub next_rendition: Frame,
}

impl FramePairInput {
    pub fn new(
        frame_pos: u64,
        rendition: Frame,
        next_rendition: Frame,
        reference: Frame,
        next_reference: Frame,
    ) -> Self {
        Self {
            frame_pos,
            reference,
            next_reference,
            rendition,
            next_rendition,
        }
    }

    /// 由解码器输出的 YUV420 帧构造
    pub fn from_yuv(
        frame_pos: u64,
        rendition: &RawFrame,
        next_rendition: &RawFrame,
        reference: &RawFrame,
        next_reference: &RawFrame,
    ) -> Result<Self, MetricsError> {
        Ok(Self::new(
            frame_pos,
            rendition.to_bgr()?,
            next_rendition.to_bgr()?,
            reference.to_bgr()?,
            next_reference.to_bgr()?,
        ))
    }

    pub fn as_context(&self) -> FramePairContext<'_> {
        FramePairContext::new(
            self.frame_pos,
            &self.rendition,
            &self.next_rendition,
            &self.reference,
            &self.next_reference,
        )
    }
}

/// 计算统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatorStats {
    pub processed_pairs: u64,
    pub failed_pairs: u64,
}

/// 帧对指标计算器 - 独立线程池 + 统计
///
/// ```no_run
/// use rendition_metrics::api::metrics::FrameMetricsCalculator;
///
/// let calculator = FrameMetricsCalculator::from_json(r#"{"metrics": ["temporal_psnr"]}"#)?;
/// # Ok::<(), rendition_metrics::MetricsError>(())
/// ```
pub struct FrameMetricsCalculator {
    engine: FramePairMetricsEngine,
    pool: ThreadPool,
    processed_count: Mutex<u64>,
    failed_count: Mutex<u64>,
}

impl FrameMetricsCalculator {
    pub fn create(config: EngineConfig) -> Result<Self, MetricsError> {
        Self::with_threads(config, num_cpus::get().min(DEFAULT_MAX_THREADS))
    }

    /// 指定线程池上限，实际线程数不超过 CPU 核数
    pub fn with_threads(config: EngineConfig, max_threads: usize) -> Result<Self, MetricsError> {
        crate::init_logging();

        let engine = FramePairMetricsEngine::new(config)?;
        let threads = max_threads.clamp(1, num_cpus::get().max(1));
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rendition-metrics-{}", i))
            .build()
            .map_err(|e| MetricsError::InvalidConfig(format!("thread pool: {}", e)))?;

        info!("🎬 FrameMetricsCalculator: created ({} threads)", threads);
        Ok(Self {
            engine,
            pool,
            processed_count: Mutex::new(0),
            failed_count: Mutex::new(0),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, MetricsError> {
        Self::create(EngineConfig::from_json(json)?)
    }

    pub fn engine(&self) -> &FramePairMetricsEngine {
        &self.engine
    }

    pub fn process_pair(&self, input: &FramePairInput) -> Result<MetricResult, MetricsError> {
        let result = self.engine.compute(&input.as_context());
        self.record(std::slice::from_ref(&result));
        result
    }

    /// 批量处理，结果顺序与输入一致；单个帧对失败不影响其他帧对
    pub fn process_batch(
        &self,
        inputs: &[FramePairInput],
    ) -> Vec<Result<MetricResult, MetricsError>> {
        let results: Vec<_> = self.pool.install(|| {
            inputs
                .par_iter()
                .map(|input| self.engine.compute(&input.as_context()))
                .collect()
        });
        debug!("Batch of {} pairs finished", inputs.len());
        self.record(&results);
        results
    }

    pub fn stats(&self) -> CalculatorStats {
        let processed_pairs = self.processed_count.lock().map(|c| *c).unwrap_or(0);
        let failed_pairs = self.failed_count.lock().map(|c| *c).unwrap_or(0);
        CalculatorStats {
            processed_pairs,
            failed_pairs,
        }
    }

    pub fn reset(&self) {
        if let Ok(mut count) = self.processed_count.lock() {
            *count = 0;
        }
        if let Ok(mut count) = self.failed_count.lock() {
            *count = 0;
        }
    }

    fn record(&self, results: &[Result<MetricResult, MetricsError>]) {
        let failed = results.iter().filter(|r| r.is_err()).count() as u64;
        if failed > 0 {
            warn!("⚠️ {} of {} frame pairs failed", failed, results.len());
        }
        if let Ok(mut count) = self.processed_count.lock() {
            *count += results.len() as u64 - failed;
        }
        if let Ok(mut count) = self.failed_count.lock() {
            *count += failed;
        }
    }
}

impl Drop for FrameMetricsCalculator {
    fn drop(&mut self) {
        info!("🗑️ FrameMetricsCalculator: released");
    }
}
