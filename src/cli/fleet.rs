use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::advisor::{GeminiAdvisor, PayloadAdvisor};
use crate::chain::ChainClient;
use crate::cli::args::{BalancesCmd, FundCmd, GenerateCmd, PayloadCmd, SwarmCmd};
use crate::cli::console_ui::ConsoleUi;
use crate::cli::context::{
    read_key_file, resolve_chain_client, resolve_export_path, resolve_fleet_settings,
    resolve_fleet_source, resolve_funded_export_path,
};
use crate::config::CeloshipConfig;
use crate::fleet::{
    FleetOrchestrator, FleetSource, FleetStatsSnapshot, OperationOutcome, Severity, WalletStatus,
    export_csv,
};

#[derive(Serialize)]
struct WalletSummary {
    index: usize,
    address: String,
    status: WalletStatus,
    tx_count: u64,
    balance: String,
}

#[derive(Serialize)]
struct RunSummary {
    stats: FleetStatsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    abandoned: Option<usize>,
    wallets: Vec<WalletSummary>,
}

impl RunSummary {
    fn collect<C: ChainClient>(
        orchestrator: &FleetOrchestrator<C>,
        abandoned: Option<usize>,
    ) -> Self {
        let wallets = orchestrator
            .wallets()
            .into_iter()
            .enumerate()
            .map(|(index, wallet)| WalletSummary {
                index,
                address: wallet.address().to_string(),
                status: wallet.status,
                tx_count: wallet.tx_count,
                balance: wallet.balance,
            })
            .collect();
        Self {
            stats: orchestrator.stats(),
            abandoned,
            wallets,
        }
    }

    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

fn build_orchestrator(
    config: &CeloshipConfig,
    source: FleetSource,
) -> Result<FleetOrchestrator<impl ChainClient>> {
    let client = Arc::new(resolve_chain_client(config)?);
    Ok(FleetOrchestrator::new(
        client,
        resolve_fleet_settings(config, source),
    ))
}

fn completed<T>(outcome: OperationOutcome<T>, operation: &str) -> Result<T> {
    outcome
        .completed()
        .ok_or_else(|| anyhow!("{operation} 被拒绝：已有注资或 swarm 正在进行"))
}

fn funder_key(config: &CeloshipConfig) -> Result<&str> {
    let key = config.funder.private_key.trim();
    if key.is_empty() {
        return Err(anyhow!(
            "未配置注资私钥：请设置 funder.private_key 或环境变量 CELOSHIP_FUNDER_KEY"
        ));
    }
    Ok(key)
}

async fn export_fleet<C: ChainClient>(
    orchestrator: &FleetOrchestrator<C>,
    path: &Path,
) -> Result<()> {
    let csv = export_csv(&orchestrator.wallets());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, csv.as_bytes()).await?;
    info!(
        target: "cli::fleet",
        path = %path.display(),
        wallets = orchestrator.wallets().len(),
        "舰队已导出（包含明文私钥，请妥善保管）"
    );
    Ok(())
}

/// 收集本次操作产生的交易浏览器链接。
fn explorer_links<C: ChainClient>(
    orchestrator: &FleetOrchestrator<C>,
    explorer_url: &str,
    since: usize,
) -> Vec<String> {
    orchestrator
        .logs()
        .iter()
        .skip(since)
        .filter(|entry| entry.severity == Severity::Success)
        .filter_map(|entry| {
            entry
                .explorer_link(explorer_url)
                .map(|link| format!("{}  {link}", entry.message))
        })
        .collect()
}

/// 注资与 swarm 的最终结果；仪表盘关闭后再打印到 stdout。
pub struct RunOutput {
    links: Vec<String>,
    summary: RunSummary,
}

impl RunOutput {
    pub fn print(&self) -> Result<()> {
        for link in &self.links {
            println!("{link}");
        }
        self.summary.print()
    }
}

pub async fn handle_generate(config: &CeloshipConfig, cmd: GenerateCmd) -> Result<()> {
    let orchestrator = build_orchestrator(config, FleetSource::Generate { count: cmd.count })?;
    let size = completed(
        orchestrator.prepare_fleet(&FleetSource::Generate { count: cmd.count })?,
        "生成钱包",
    )?;

    match resolve_export_path(cmd.export, &config.fleet) {
        Some(path) => export_fleet(&orchestrator, &path).await?,
        None => {
            warn!(
                target: "cli::fleet",
                "未指定导出路径，私钥不会被保存；请使用 --export 或 fleet.export_path"
            );
            for (index, wallet) in orchestrator.wallets().iter().enumerate() {
                println!("{index:>4}  {}", wallet.address());
            }
        }
    }
    info!(target: "cli::fleet", wallets = size, "钱包生成完成");
    Ok(())
}

pub async fn handle_balances(config: &CeloshipConfig, cmd: BalancesCmd) -> Result<()> {
    let source = read_key_file(&cmd.keys)?;
    let orchestrator = build_orchestrator(config, source.clone())?;
    completed(orchestrator.prepare_fleet(&source)?, "导入钱包")?;
    orchestrator.refresh_balances().await;
    RunSummary::collect(&orchestrator, None).print()
}

pub async fn handle_fund(
    config: &CeloshipConfig,
    cmd: FundCmd,
    dashboard: Option<&ConsoleUi>,
) -> Result<RunOutput> {
    let key = funder_key(config)?;
    let source = resolve_fleet_source(&config.fleet)?;
    let orchestrator = build_orchestrator(config, source.clone())?;
    if let Some(ui) = dashboard {
        ui.attach(orchestrator.subscribe())?;
    }

    completed(orchestrator.prepare_fleet(&source)?, "准备舰队")?;
    let export_path =
        resolve_funded_export_path(cmd.export, &config.fleet, OffsetDateTime::now_utc());
    if let Some(path) = &export_path {
        export_fleet(&orchestrator, path).await?;
    }

    let report = completed(orchestrator.fund_fleet(key).await?, "注资")?;
    info!(
        target: "cli::fleet",
        attempted = report.attempted,
        funded = report.funded,
        "注资结束"
    );

    if let Some(path) = &export_path {
        export_fleet(&orchestrator, path).await?;
    }
    Ok(RunOutput {
        links: explorer_links(&orchestrator, &config.global.explorer_url, 0),
        summary: RunSummary::collect(&orchestrator, None),
    })
}

pub async fn handle_swarm(
    config: &CeloshipConfig,
    cmd: SwarmCmd,
    dashboard: Option<&ConsoleUi>,
) -> Result<RunOutput> {
    let key = if cmd.skip_funding {
        None
    } else {
        Some(funder_key(config)?)
    };
    let source = resolve_fleet_source(&config.fleet)?;
    let orchestrator = build_orchestrator(config, source.clone())?;
    if let Some(ui) = dashboard {
        ui.attach(orchestrator.subscribe())?;
    }

    completed(orchestrator.prepare_fleet(&source)?, "准备舰队")?;
    let export_path = if key.is_none() {
        resolve_export_path(cmd.export, &config.fleet)
    } else {
        resolve_funded_export_path(cmd.export, &config.fleet, OffsetDateTime::now_utc())
    };
    if let Some(path) = &export_path {
        export_fleet(&orchestrator, path).await?;
    }

    match key {
        None => {
            info!(target: "cli::fleet", "跳过注资，刷新现有余额");
            orchestrator.refresh_balances().await;
        }
        Some(key) => {
            let report = completed(orchestrator.fund_fleet(key).await?, "注资")?;
            if report.funded == 0 {
                warn!(target: "cli::fleet", "没有任何钱包注资成功，swarm 交易可能全部失败");
            }
        }
    }

    let swarm_logs_from = orchestrator.logs().len();
    let report = completed(orchestrator.start_swarm().await?, "swarm")?;

    if let Some(path) = &export_path {
        export_fleet(&orchestrator, path).await?;
    }
    let links = if config.global.logging.profile.is_verbose() {
        explorer_links(&orchestrator, &config.global.explorer_url, swarm_logs_from)
    } else {
        Vec::new()
    };
    Ok(RunOutput {
        links,
        summary: RunSummary::collect(&orchestrator, Some(report.abandoned)),
    })
}

pub async fn handle_payload(config: &CeloshipConfig, cmd: PayloadCmd) -> Result<()> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("celoship/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let advisor = GeminiAdvisor::new(client, &config.advisor);
    let suggestion = advisor.generate_payload(&cmd.contract, &cmd.intent).await;
    if suggestion.is_fallback() {
        warn!(
            target: "cli::payload",
            reason = %suggestion.reasoning,
            "未获得可用 payload"
        );
    }
    println!("{}", serde_json::to_string_pretty(&suggestion)?);
    Ok(())
}
