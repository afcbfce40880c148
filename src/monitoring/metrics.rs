use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use tracing::info;

static EXPORTER: OnceCell<SocketAddr> = OnceCell::new();
static PROMETHEUS_ENABLED: AtomicBool = AtomicBool::new(false);

/// 安装 Prometheus HTTP exporter；重复调用只生效一次。
pub fn try_init_prometheus(listen: &str) -> Result<()> {
    let addr = EXPORTER.get_or_try_init(|| {
        let addr: SocketAddr = listen
            .trim()
            .parse()
            .with_context(|| format!("Prometheus 监听地址无效: {listen}"))?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("安装 Prometheus exporter 失败")?;
        PROMETHEUS_ENABLED.store(true, Ordering::Relaxed);
        Ok::<_, anyhow::Error>(addr)
    })?;
    info!(target: "monitoring", listen = %addr, "Prometheus exporter 已启用");
    Ok(())
}

pub fn prometheus_enabled() -> bool {
    PROMETHEUS_ENABLED.load(Ordering::Relaxed)
}
