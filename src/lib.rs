pub mod api;
pub mod core;

pub use crate::core::metrics::{
    EngineConfig, Frame, FramePairContext, FramePairMetricsEngine, HashGrid, MetricId,
    MetricResult, MetricsError, RawFrame,
};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("rendition_metrics"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // 重复初始化时忽略错误
        let _ = env_logger::Builder::from_default_env().try_init();
    }
}
