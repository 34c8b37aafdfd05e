//! # Prometheus 指标收集模块
//!
//! 为消息中心提供统一的 Prometheus 指标收集能力。

use std::sync::Arc;

use once_cell::sync::Lazy;
use prometheus::core::Collector;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use tracing::warn;

/// 全局指标注册表
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// 进程内唯一的消息中心指标，所有处理器共享同一组收集器
static MESSAGE_CENTER_METRICS: Lazy<Arc<MessageCenterMetrics>> =
    Lazy::new(|| Arc::new(MessageCenterMetrics::register()));

/// 消息中心指标
#[derive(Clone)]
pub struct MessageCenterMetrics {
    /// 消息处理结果（accepted / duplicate / invalid / unsupported）
    pub messages_total: IntCounterVec,
    /// 单条消息发送耗时（秒）
    pub send_duration_seconds: Histogram,
    /// 群组推送次数
    pub fanout_pushes_total: IntCounter,
    /// 因群组无成员而跳过的推送次数
    pub fanout_skipped_total: IntCounter,
    /// 回放请求次数（sync / get_more）
    pub replay_requests_total: IntCounterVec,
    /// 加入群组结果（joined / invalid）
    pub joins_total: IntCounterVec,
}

impl MessageCenterMetrics {
    /// 获取共享的指标实例
    pub fn shared() -> Arc<Self> {
        Arc::clone(&MESSAGE_CENTER_METRICS)
    }

    fn register() -> Self {
        let messages_total = IntCounterVec::new(
            Opts::new(
                "message_center_messages_total",
                "Total number of messages processed by result",
            ),
            &["result"],
        )
        .expect("Failed to create message_center_messages_total metric");

        let send_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "message_center_send_duration_seconds",
                "Message send pipeline duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )
        .expect("Failed to create message_center_send_duration_seconds metric");

        let fanout_pushes_total = IntCounter::new(
            "message_center_fanout_pushes_total",
            "Total number of group pushes",
        )
        .expect("Failed to create message_center_fanout_pushes_total metric");

        let fanout_skipped_total = IntCounter::new(
            "message_center_fanout_skipped_total",
            "Total number of group pushes skipped because the group had no members",
        )
        .expect("Failed to create message_center_fanout_skipped_total metric");

        let replay_requests_total = IntCounterVec::new(
            Opts::new(
                "message_center_replay_requests_total",
                "Total number of replay requests",
            ),
            &["operation"],
        )
        .expect("Failed to create message_center_replay_requests_total metric");

        let joins_total = IntCounterVec::new(
            Opts::new("message_center_joins_total", "Total number of join requests"),
            &["result"],
        )
        .expect("Failed to create message_center_joins_total metric");

        register_collector(messages_total.clone());
        register_collector(send_duration_seconds.clone());
        register_collector(fanout_pushes_total.clone());
        register_collector(fanout_skipped_total.clone());
        register_collector(replay_requests_total.clone());
        register_collector(joins_total.clone());

        Self {
            messages_total,
            send_duration_seconds,
            fanout_pushes_total,
            fanout_skipped_total,
            replay_requests_total,
            joins_total,
        }
    }
}

fn register_collector<C: Collector + 'static>(collector: C) {
    if let Err(err) = REGISTRY.register(Box::new(collector)) {
        warn!(error = %err, "Failed to register metric collector");
    }
}

/// 获取 Prometheus 指标导出格式
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
