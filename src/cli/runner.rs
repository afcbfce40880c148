use anyhow::{Result, anyhow};
use tracing::warn;

use crate::cli::args::{Cli, Command};
use crate::cli::console_ui::ConsoleUi;
use crate::cli::context::{init_configs, init_tracing};
use crate::cli::fleet::{
    handle_balances, handle_fund, handle_generate, handle_payload, handle_swarm,
};
use crate::config::CeloshipConfig;

pub async fn run(cli: Cli, config: CeloshipConfig) -> Result<()> {
    if let Command::Init(args) = cli.command {
        return init_configs(args);
    }

    let wants_dashboard =
        config.dashboard.enable && matches!(cli.command, Command::Fund(_) | Command::Swarm(_));
    let (dashboard, dashboard_error) = if wants_dashboard {
        match ConsoleUi::start() {
            Ok(ui) => (Some(ui), None),
            Err(err) => (None, Some(err)),
        }
    } else {
        (None, None)
    };

    init_tracing(
        &config.global.logging,
        dashboard.as_ref().map(ConsoleUi::make_writer),
    )?;
    if let Some(err) = dashboard_error {
        warn!(target: "cli", error = %err, "控制台仪表盘不可用，回退为普通日志输出");
    }

    if config.global.prometheus.enable {
        crate::monitoring::try_init_prometheus(&config.global.prometheus.listen)
            .map_err(|err| anyhow!(err))?;
    }

    let output = match cli.command {
        Command::Init(_) => None,
        Command::Generate(cmd) => {
            handle_generate(&config, cmd).await?;
            None
        }
        Command::Balances(cmd) => {
            handle_balances(&config, cmd).await?;
            None
        }
        Command::Fund(cmd) => Some(handle_fund(&config, cmd, dashboard.as_ref()).await?),
        Command::Swarm(cmd) => Some(handle_swarm(&config, cmd, dashboard.as_ref()).await?),
        Command::Payload(cmd) => {
            handle_payload(&config, cmd).await?;
            None
        }
    };

    // 先退出备用屏幕，结果才会留在终端上
    drop(dashboard);
    match output {
        Some(output) => output.print(),
        None => Ok(()),
    }
}
