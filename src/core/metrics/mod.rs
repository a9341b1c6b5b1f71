//! 帧对质量指标
//!
//! 对参考流与渲染流中时间对齐的帧对计算一组数值指标，
//! 供下游的篡改检测模型作为特征使用。

pub mod context;
pub mod correlation;
pub mod dct;
pub mod edges;
pub mod engine;
pub mod error;
pub mod frame;
pub mod hash;
pub mod histogram;
pub mod metric;
pub mod rescale;
pub mod scalar;

pub use context::FramePairContext;
pub use engine::{EngineConfig, FramePairMetricsEngine, MetricResult};
pub use error::MetricsError;
pub use frame::{Frame, RawFrame};
pub use hash::HashGrid;
pub use metric::MetricId;
