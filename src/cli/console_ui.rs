use std::collections::VecDeque;
use std::io::{self, IsTerminal, Write};
use std::thread::{self, JoinHandle};

use alloy::primitives::Address;
use anyhow::{Result, anyhow};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use flume::{Receiver, Sender};
use parking_lot::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::fleet::{FleetEvent, FleetStatsSnapshot, WalletStatus};
use crate::monitoring::format::short_address;

const MAX_BUFFERED_LOG_LINES: usize = 500;
const MAX_WALLET_ROWS: usize = 12;

enum ConsoleUiEvent {
    LogLine(String),
    Fleet(FleetEvent),
    Shutdown,
}

/// 终端仪表盘：上方钱包表，中间滚动日志，底部统计行。
pub struct ConsoleUi {
    event_tx: Sender<ConsoleUiEvent>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleUi {
    pub fn start() -> Result<Self> {
        if !io::stdout().is_terminal() {
            return Err(anyhow!("终端不支持控制台仪表盘"));
        }

        let (event_tx, event_rx) = flume::unbounded::<ConsoleUiEvent>();
        let join_handle = thread::Builder::new()
            .name("console-ui".to_string())
            .spawn(move || {
                if let Err(err) = run_ui_loop(event_rx) {
                    eprintln!("console ui terminated: {err}");
                }
            })
            .map_err(|err| anyhow!("启动控制台面板线程失败: {err}"))?;

        Ok(Self {
            event_tx,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    pub fn make_writer(&self) -> BoxMakeWriter {
        let tx = self.event_tx.clone();
        BoxMakeWriter::new(move || ConsoleUiLogWriter::new(tx.clone()))
    }

    /// 订阅编排器事件。转发线程不被 join：编排器释放后订阅端断开，线程随之退出。
    pub fn attach(&self, events: Receiver<FleetEvent>) -> Result<()> {
        let tx = self.event_tx.clone();
        thread::Builder::new()
            .name("console-ui-events".to_string())
            .spawn(move || forward_fleet_events(&events, &tx))
            .map_err(|err| anyhow!("启动事件转发线程失败: {err}"))?;
        Ok(())
    }
}

fn forward_fleet_events(events: &Receiver<FleetEvent>, tx: &Sender<ConsoleUiEvent>) {
    while let Ok(event) = events.recv() {
        if tx.send(ConsoleUiEvent::Fleet(event)).is_err() {
            break;
        }
    }
}

impl Drop for ConsoleUi {
    fn drop(&mut self) {
        if self.event_tx.send(ConsoleUiEvent::Shutdown).is_ok() {
            if let Some(handle) = self.join_handle.lock().take() {
                let _ = handle.join();
            }
        }
    }
}

struct ConsoleUiLogWriter {
    tx: Sender<ConsoleUiEvent>,
    pending: String,
}

impl ConsoleUiLogWriter {
    fn new(tx: Sender<ConsoleUiEvent>) -> Self {
        Self {
            tx,
            pending: String::new(),
        }
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let message = self.pending.drain(..).collect();
        let _ = self.tx.send(ConsoleUiEvent::LogLine(message));
    }
}

impl Write for ConsoleUiLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let chunk = String::from_utf8_lossy(buf);
        self.pending.push_str(&chunk);
        while let Some(pos) = self.pending.find('\n') {
            let mut line = self.pending.drain(..=pos).collect::<String>();
            if line.ends_with('\n') {
                line.pop();
            }
            if line.ends_with('\r') {
                line.pop();
            }
            let _ = self.tx.send(ConsoleUiEvent::LogLine(line));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_pending();
        Ok(())
    }
}

impl Drop for ConsoleUiLogWriter {
    fn drop(&mut self) {
        self.flush_pending();
    }
}

#[derive(Debug, Clone, PartialEq)]
struct WalletRow {
    address: Address,
    status: WalletStatus,
    tx_count: u64,
    balance: String,
}

/// 仪表盘状态，只由事件驱动。
#[derive(Debug, Default)]
struct DashboardState {
    wallets: Vec<WalletRow>,
    stats: FleetStatsSnapshot,
}

impl DashboardState {
    fn apply(&mut self, event: FleetEvent) {
        match event {
            FleetEvent::FleetPrepared { wallets } => {
                self.wallets = wallets
                    .into_iter()
                    .map(|address| WalletRow {
                        address,
                        status: WalletStatus::Idle,
                        tx_count: 0,
                        balance: "0".to_string(),
                    })
                    .collect();
            }
            FleetEvent::FleetReset => {
                self.wallets.clear();
            }
            FleetEvent::WalletStatusChanged { index, status } => {
                if let Some(row) = self.wallets.get_mut(index) {
                    row.status = status;
                    if status == WalletStatus::Sending {
                        row.tx_count = 0;
                    }
                }
            }
            FleetEvent::TransactionConfirmed { index, .. } => {
                if let Some(row) = self.wallets.get_mut(index) {
                    row.tx_count += 1;
                }
            }
            FleetEvent::BalanceUpdated { index, balance } => {
                if let Some(row) = self.wallets.get_mut(index) {
                    row.balance = balance;
                }
            }
            FleetEvent::StatsUpdated(stats) => {
                self.stats = stats;
            }
            FleetEvent::Log(_)
            | FleetEvent::WalletFunded { .. }
            | FleetEvent::FundingFailed { .. }
            | FleetEvent::TransactionFailed { .. } => {}
        }
    }

    fn wallet_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.wallets.len().min(MAX_WALLET_ROWS) + 1);
        lines.push(format!(
            "{:>4}  {:<14}  {:<8}  {:>5}  {}",
            "#", "address", "status", "tx", "balance"
        ));
        for (index, row) in self.wallets.iter().enumerate().take(MAX_WALLET_ROWS) {
            lines.push(format!(
                "{:>4}  {:<14}  {:<8}  {:>5}  {}",
                index,
                short_address(&row.address),
                row.status,
                row.tx_count,
                row.balance
            ));
        }
        if self.wallets.len() > MAX_WALLET_ROWS {
            lines.push(format!("      … 另有 {} 个钱包", self.wallets.len() - MAX_WALLET_ROWS));
        }
        lines
    }

    fn summary_line(&self) -> String {
        let done = self
            .wallets
            .iter()
            .filter(|row| row.status == WalletStatus::Done)
            .count();
        format!(
            "钱包 {} | 完成 {} | 交易 {} | 成功 {} | 失败 {}",
            self.wallets.len(),
            done,
            self.stats.total_tx,
            self.stats.successful_tx,
            self.stats.failed_tx
        )
    }
}

fn run_ui_loop(event_rx: Receiver<ConsoleUiEvent>) -> Result<()> {
    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    if let Err(err) = execute_initialise(&mut stdout) {
        let _ = terminal::disable_raw_mode();
        return Err(err);
    }

    let mut logs = VecDeque::with_capacity(MAX_BUFFERED_LOG_LINES);
    let mut state = DashboardState::default();
    let mut loop_result: Result<()> = Ok(());

    if let Err(err) = render(&mut stdout, &logs, &state) {
        let _ = cleanup_terminal(&mut stdout);
        return Err(err);
    }

    while let Ok(event) = event_rx.recv() {
        match event {
            ConsoleUiEvent::LogLine(line) => {
                if !line.is_empty() {
                    logs.push_back(line);
                    if logs.len() > MAX_BUFFERED_LOG_LINES {
                        logs.pop_front();
                    }
                }
            }
            ConsoleUiEvent::Fleet(event) => state.apply(event),
            ConsoleUiEvent::Shutdown => break,
        }

        // 批量事件只渲染一次
        if !event_rx.is_empty() {
            continue;
        }
        if let Err(err) = render(&mut stdout, &logs, &state) {
            loop_result = Err(err);
            break;
        }
    }

    let cleanup_result = cleanup_terminal(&mut stdout);
    match (loop_result, cleanup_result) {
        (Ok(_), Ok(_)) => Ok(()),
        (Err(err), Ok(_)) => Err(err),
        (Ok(_), Err(err)) => Err(err),
        (Err(primary), Err(cleanup_err)) => {
            Err(primary.context(format!("cleanup failed: {cleanup_err}")))
        }
    }
}

fn execute_initialise(stdout: &mut io::Stdout) -> Result<()> {
    use crossterm::execute;
    execute!(
        stdout,
        EnterAlternateScreen,
        Hide,
        Clear(ClearType::All),
        MoveTo(0, 0)
    )?;
    stdout.flush()?;
    Ok(())
}

fn cleanup_terminal(stdout: &mut io::Stdout) -> Result<()> {
    use crossterm::execute;
    execute!(stdout, Show, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    stdout.flush()?;
    Ok(())
}

fn render(stdout: &mut io::Stdout, logs: &VecDeque<String>, state: &DashboardState) -> Result<()> {
    let (width, height) = terminal::size()?;
    if height == 0 || width == 0 {
        return Ok(());
    }
    let width = width as usize;
    let height = height as usize;

    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;

    let table = state.wallet_lines();
    let table_rows = table.len().min(height.saturating_sub(2));
    for (row, line) in table.iter().take(table_rows).enumerate() {
        queue!(stdout, MoveTo(0, row as u16), Print(clip(line, width)))?;
    }

    let log_top = table_rows + 1;
    let available_rows = height.saturating_sub(log_top + 1);
    let start_index = logs.len().saturating_sub(available_rows);
    for (idx, line) in logs.iter().skip(start_index).enumerate() {
        queue!(
            stdout,
            MoveTo(0, (log_top + idx) as u16),
            Print(clip(line, width))
        )?;
    }

    let summary_row = (height - 1) as u16;
    queue!(
        stdout,
        MoveTo(0, summary_row),
        Clear(ClearType::CurrentLine),
        Print(clip(&state.summary_line(), width))
    )?;

    stdout.flush()?;
    Ok(())
}

fn clip(line: &str, width: usize) -> String {
    line.chars().take(width).collect()
}
