use std::{
    collections::BTreeMap,
    sync::{Mutex, OnceLock},
};

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

#[derive(Default)]
struct MetricsState {
    // Mint API 调用统计（按端点）
    remote_ok: BTreeMap<&'static str, u64>,
    remote_err: BTreeMap<&'static str, u64>,
    remote_fallbacks: BTreeMap<&'static str, u64>,
    remote_latency_sum_ms: u128,
    // 简易直方图分桶（毫秒）：<50, <100, <250, <500, <1000, >=1000
    remote_hist_buckets: [u64; 6],
    // Webhook 转发
    webhooks_received: u64,
    webhook_deliveries: u64,
}

fn state() -> std::sync::MutexGuard<'static, MetricsState> {
    let lock = METRICS.get_or_init(|| Mutex::new(MetricsState::default()));
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    }
}

pub fn observe_remote_call(endpoint: &'static str, ok: bool, latency_ms: u128) {
    let mut s = state();
    if ok {
        *s.remote_ok.entry(endpoint).or_insert(0) += 1;
    } else {
        *s.remote_err.entry(endpoint).or_insert(0) += 1;
    }
    s.remote_latency_sum_ms += latency_ms;
    let idx = match latency_ms {
        0..=49 => 0,
        50..=99 => 1,
        100..=249 => 2,
        250..=499 => 3,
        500..=999 => 4,
        _ => 5,
    };
    s.remote_hist_buckets[idx] += 1;
}

pub fn count_fallback(endpoint: &'static str) {
    *state().remote_fallbacks.entry(endpoint).or_insert(0) += 1;
}

pub fn count_webhook(listeners: usize) {
    let mut s = state();
    s.webhooks_received += 1;
    s.webhook_deliveries += listeners as u64;
}

pub fn render_prometheus() -> String {
    let s = state();
    let mut out = String::new();

    out.push_str("# HELP mint_harness_remote_requests_total Mint API requests per endpoint\n");
    out.push_str("# TYPE mint_harness_remote_requests_total counter\n");
    for (k, v) in s.remote_ok.iter() {
        out.push_str(&format!(
            "mint_harness_remote_requests_total{{endpoint=\"{}\",result=\"ok\"}} {}\n",
            k, v
        ));
    }
    for (k, v) in s.remote_err.iter() {
        out.push_str(&format!(
            "mint_harness_remote_requests_total{{endpoint=\"{}\",result=\"err\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP mint_harness_remote_fallbacks_total Legacy endpoint fallbacks\n");
    out.push_str("# TYPE mint_harness_remote_fallbacks_total counter\n");
    for (k, v) in s.remote_fallbacks.iter() {
        out.push_str(&format!(
            "mint_harness_remote_fallbacks_total{{endpoint=\"{}\"}} {}\n",
            k, v
        ));
    }

    // 直方图分桶按 Prometheus 约定累加，+Inf 等于总次数
    out.push_str("# HELP mint_harness_remote_latency_ms Mint API latency histogram (ms)\n");
    out.push_str("# TYPE mint_harness_remote_latency_ms histogram\n");
    let bounds = ["50", "100", "250", "500", "1000"];
    let mut cumulative = 0u64;
    for (bound, count) in bounds.iter().zip(s.remote_hist_buckets.iter()) {
        cumulative += count;
        out.push_str(&format!(
            "mint_harness_remote_latency_ms_bucket{{le=\"{}\"}} {}\n",
            bound, cumulative
        ));
    }
    let total = s.remote_hist_buckets.iter().sum::<u64>();
    out.push_str(&format!(
        "mint_harness_remote_latency_ms_bucket{{le=\"+Inf\"}} {}\n",
        total
    ));
    out.push_str(&format!(
        "mint_harness_remote_latency_ms_sum {}\n",
        s.remote_latency_sum_ms
    ));
    out.push_str(&format!("mint_harness_remote_latency_ms_count {}\n", total));

    out.push_str("# HELP mint_harness_webhooks_received_total Webhooks received\n");
    out.push_str("# TYPE mint_harness_webhooks_received_total counter\n");
    out.push_str(&format!(
        "mint_harness_webhooks_received_total {}\n",
        s.webhooks_received
    ));

    out.push_str("# HELP mint_harness_webhook_deliveries_total Webhook deliveries to live listeners\n");
    out.push_str("# TYPE mint_harness_webhook_deliveries_total counter\n");
    out.push_str(&format!(
        "mint_harness_webhook_deliveries_total {}\n",
        s.webhook_deliveries
    ));

    out
}
