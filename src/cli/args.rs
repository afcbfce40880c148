use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "celoship", version, about = "Celo 钱包舰队注资与交易压测工具")]
pub struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径（默认查找 celoship.yaml 或 config/celoship.yaml）"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 初始化配置模版文件
    Init(InitCmd),
    /// 生成新钱包并导出
    Generate(GenerateCmd),
    /// 导入私钥并查询余额
    Balances(BalancesCmd),
    /// 按配置准备舰队并逐个注资
    Fund(FundCmd),
    /// 准备、注资并对目标合约发起 swarm
    Swarm(SwarmCmd),
    /// 请求 Gemini 生成交易 payload
    Payload(PayloadCmd),
}

#[derive(Args, Debug)]
pub struct InitCmd {
    #[arg(long, value_name = "DIR", help = "可选输出目录（默认当前目录）")]
    pub output: Option<PathBuf>,
    #[arg(long, help = "若文件存在则覆盖")]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct GenerateCmd {
    #[arg(long, short = 'n', help = "生成钱包数量")]
    pub count: usize,
    #[arg(long, value_name = "FILE", help = "导出 CSV 路径（缺省使用 fleet.export_path）")]
    pub export: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BalancesCmd {
    #[arg(long, value_name = "FILE", help = "每行一个私钥的文本文件")]
    pub keys: PathBuf,
}

#[derive(Args, Debug)]
pub struct FundCmd {
    #[arg(long, value_name = "FILE", help = "注资完成后导出 CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SwarmCmd {
    #[arg(long, help = "跳过注资，直接使用现有余额")]
    pub skip_funding: bool,
    #[arg(long, value_name = "FILE", help = "swarm 结束后导出 CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PayloadCmd {
    #[arg(long, help = "目标合约地址")]
    pub contract: String,
    #[arg(long, help = "交易意图描述，例如 \"调用 increment()\"")]
    pub intent: String,
}
