use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use time::{OffsetDateTime, UtcOffset, macros::format_description};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt};

use crate::chain::EvmChainClient;
use crate::config::{
    CeloshipConfig, ConfigError, FleetConfig, FleetMode, LoggingConfig, LoggingProfile,
    load_config,
};
use crate::fleet::{FleetSettings, FleetSource};

/// 初始化 tracing，兼顾 JSON 与文本输出模式；`writer` 用于把日志转发到控制台面板。
pub fn init_tracing(config: &LoggingConfig, writer: Option<BoxMakeWriter>) -> Result<()> {
    let mut filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // 默认压低外部依赖的调试输出；Verbose 模式打开编排与链交互细节。
    if matches!(config.profile, LoggingProfile::Lean) {
        const QUIET_TARGETS: &[(&str, &str)] = &[
            ("hyper", "warn"),
            ("hyper_util::client::legacy", "warn"),
            ("reqwest", "info"),
            ("alloy_transport_http", "info"),
            ("alloy_rpc_client", "info"),
        ];
        for (module, level) in QUIET_TARGETS {
            if !config.level.contains(module) {
                if let Ok(directive) = format!("{module}={level}").parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }
    }

    if config.profile.is_verbose() {
        const VERBOSE_TARGETS: &[(&str, &str)] = &[
            ("chain::evm", "debug"),
            ("fleet::prepare", "debug"),
            ("fleet::balances", "debug"),
            ("advisor::gemini", "debug"),
        ];
        for (module, level) in VERBOSE_TARGETS {
            if let Ok(directive) = format!("{module}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    let time_format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::from_hms(config.timezone_offset_hours, 0, 0).map_err(|err| {
        anyhow!(
            "invalid logging timezone offset {}: {err}",
            config.timezone_offset_hours
        )
    })?;
    let offset_timer = OffsetTime::new(offset, time_format);
    let use_ansi = writer.is_none() && std::io::stderr().is_terminal();
    let writer = writer.unwrap_or_else(|| BoxMakeWriter::new(std::io::stderr));

    let base = fmt()
        .with_timer(offset_timer)
        .with_writer(writer)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true)
        .with_level(true);

    if config.json {
        base.json()
            .with_current_span(false)
            .with_span_list(false)
            .with_env_filter(filter)
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    } else {
        base.with_ansi(use_ansi)
            .with_env_filter(filter)
            .event_format(fmt::format().compact())
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    }
    Ok(())
}

/// 加载主配置；用于 `celoship --config` 的入口。
pub fn load_configuration(path: Option<PathBuf>) -> Result<CeloshipConfig, ConfigError> {
    load_config(path)
}

pub fn init_configs(args: crate::cli::args::InitCmd) -> Result<()> {
    let output_dir = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    fs::create_dir_all(&output_dir)?;

    let templates: [(&str, &str); 1] = [(
        "celoship.yaml",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/celoship.yaml")),
    )];

    for (filename, contents) in templates {
        let target_path = output_dir.join(filename);
        if target_path.exists() && !args.force {
            println!(
                "跳过 {}（文件已存在，如需覆盖请加 --force）",
                target_path.display()
            );
            continue;
        }

        fs::write(&target_path, contents)?;
        println!("已写入 {}", target_path.display());
    }

    Ok(())
}

pub fn resolve_chain_client(config: &CeloshipConfig) -> Result<EvmChainClient> {
    EvmChainClient::new(
        &config.global.rpc_url,
        config.global.chain_id,
        Duration::from_millis(config.swarm.confirm_timeout_ms),
        Duration::from_millis(config.swarm.poll_interval_ms),
    )
    .map_err(|err| anyhow!(err))
}

/// 读取每行一个私钥的导入文件。
pub fn read_key_file(path: &Path) -> Result<FleetSource> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("读取私钥文件失败: {}", path.display()))?;
    Ok(FleetSource::from_key_lines(&raw))
}

pub fn resolve_fleet_source(fleet: &FleetConfig) -> Result<FleetSource> {
    match fleet.mode {
        FleetMode::Generate => Ok(FleetSource::Generate { count: fleet.count }),
        FleetMode::Import => {
            let path = fleet
                .import_path
                .as_deref()
                .ok_or_else(|| anyhow!("fleet.mode = import 时必须配置 fleet.import_path"))?;
            read_key_file(path)
        }
    }
}

pub fn resolve_fleet_settings(config: &CeloshipConfig, source: FleetSource) -> FleetSettings {
    let swarm = &config.swarm;
    FleetSettings {
        source,
        fund_amount: config.funder.amount.clone(),
        target: swarm.target.clone(),
        payload: swarm.payload.clone(),
        tx_per_wallet: swarm.tx_per_wallet,
        gas_limit: swarm.gas_limit,
        confirmations: swarm.confirmations.max(1),
        pacing: Duration::from_millis(swarm.pacing_ms),
        settle_delay: Duration::from_millis(swarm.settle_ms),
    }
}

pub fn resolve_export_path(explicit: Option<PathBuf>, fleet: &FleetConfig) -> Option<PathBuf> {
    explicit.or_else(|| fleet.export_path.clone())
}

/// 注资前确定导出路径：生成模式的新钱包私钥只存在于内存，未配置时落到带时间戳的默认文件。
pub fn resolve_funded_export_path(
    explicit: Option<PathBuf>,
    fleet: &FleetConfig,
    now: OffsetDateTime,
) -> Option<PathBuf> {
    resolve_export_path(explicit, fleet).or_else(|| match fleet.mode {
        FleetMode::Generate => Some(default_export_path(now)),
        FleetMode::Import => None,
    })
}

fn default_export_path(now: OffsetDateTime) -> PathBuf {
    let stamp = now
        .format(format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    PathBuf::from(format!("celoship-fleet-{stamp}.csv"))
}
