use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Bytes, U256};

use super::*;
use crate::chain::mock::MockChainClient;

const KEY_A: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const KEY_B: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const FUNDER: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

fn settings(tx_per_wallet: u32) -> FleetSettings {
    FleetSettings {
        source: FleetSource::Generate { count: 2 },
        fund_amount: "0.01".to_string(),
        target: "0xABC".to_string(),
        payload: String::new(),
        tx_per_wallet,
        gas_limit: 100_000,
        confirmations: 1,
        pacing: Duration::ZERO,
        settle_delay: Duration::ZERO,
    }
}

fn orchestrator(
    client: MockChainClient,
    settings: FleetSettings,
) -> (Arc<MockChainClient>, FleetOrchestrator<MockChainClient>) {
    let client = Arc::new(client);
    let orchestrator = FleetOrchestrator::new(Arc::clone(&client), settings);
    (client, orchestrator)
}

fn count_severity(logs: &[LogEntry], severity: Severity) -> usize {
    logs.iter().filter(|e| e.severity == severity).count()
}

#[tokio::test]
async fn generate_creates_unique_idle_wallets() {
    let (_, fleet) = orchestrator(MockChainClient::new(), settings(1));
    for n in [1usize, 3, 10] {
        let size = fleet
            .prepare_fleet(&FleetSource::Generate { count: n })
            .expect("prepare")
            .completed()
            .expect("not busy");
        assert_eq!(size, n);

        let wallets = fleet.wallets();
        assert_eq!(wallets.len(), n);
        let unique: HashSet<_> = wallets.iter().map(WalletAccount::address).collect();
        assert_eq!(unique.len(), n);
        for wallet in &wallets {
            assert_eq!(wallet.balance, "0");
            assert_eq!(wallet.tx_count, 0);
            assert_eq!(wallet.status, WalletStatus::Idle);
        }
    }
}

#[tokio::test]
async fn generate_rejects_zero_count() {
    let (_, fleet) = orchestrator(MockChainClient::new(), settings(1));
    let err = fleet
        .prepare_fleet(&FleetSource::Generate { count: 0 })
        .unwrap_err();
    assert!(matches!(err, FleetError::InvalidWalletCount));
    assert!(fleet.wallets().is_empty());
}

#[tokio::test]
async fn import_skips_invalid_lines_with_one_warning_each() {
    let (_, fleet) = orchestrator(MockChainClient::new(), settings(1));
    let raw = format!("{KEY_A}\nnot-a-key\n\n  {KEY_B}  \n0x1234\n");
    let size = fleet
        .prepare_fleet(&FleetSource::from_key_lines(&raw))
        .expect("prepare")
        .completed()
        .expect("not busy");

    assert_eq!(size, 2);
    let logs = fleet.logs();
    assert_eq!(count_severity(&logs, Severity::Warning), 2);
    assert_eq!(count_severity(&logs, Severity::Error), 0);

    let wallets = fleet.wallets();
    assert_eq!(
        wallets[0].account.private_key_hex().as_str(),
        KEY_A
    );
    assert_eq!(
        wallets[1].account.private_key_hex().as_str(),
        format!("0x{KEY_B}")
    );
}

#[tokio::test]
async fn all_invalid_import_clears_fleet_and_blocks_swarm() {
    let (client, fleet) = orchestrator(MockChainClient::new(), settings(2));
    fleet
        .prepare_fleet(&FleetSource::Generate { count: 3 })
        .expect("prepare");

    let err = fleet
        .prepare_fleet(&FleetSource::from_key_lines("garbage\nzz\n"))
        .unwrap_err();
    assert!(matches!(err, FleetError::NoValidWallets));
    assert!(fleet.wallets().is_empty());

    let logs = fleet.logs();
    assert_eq!(count_severity(&logs, Severity::Warning), 2);
    assert_eq!(count_severity(&logs, Severity::Error), 1);

    let err = fleet.start_swarm().await.unwrap_err();
    assert!(matches!(err, FleetError::EmptyFleet));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn all_invalid_import_source_blocks_funding() {
    let mut config = settings(1);
    config.source = FleetSource::from_key_lines("garbage\nzz\n");
    let (client, fleet) = orchestrator(MockChainClient::new(), config);

    let err = fleet.fund_fleet(FUNDER).await.unwrap_err();
    assert!(matches!(err, FleetError::NoValidWallets));
    assert!(client.transfers().is_empty());
    assert!(fleet.wallets().is_empty());
    assert!(!fleet.is_busy());

    let err = fleet.start_swarm().await.unwrap_err();
    assert!(matches!(err, FleetError::EmptyFleet));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn invalid_funder_key_moves_no_funds() {
    let (client, fleet) = orchestrator(MockChainClient::new(), settings(1));
    let err = fleet.fund_fleet("0xnot-hex").await.unwrap_err();
    assert!(matches!(err, FleetError::InvalidFunderKey(_)));
    assert!(client.transfers().is_empty());
    assert!(fleet.wallets().is_empty());
}

#[tokio::test]
async fn invalid_amount_is_rejected_before_transfers() {
    let mut config = settings(1);
    config.fund_amount = "-1".to_string();
    let (client, fleet) = orchestrator(MockChainClient::new(), config);
    let err = fleet.fund_fleet(FUNDER).await.unwrap_err();
    assert!(matches!(err, FleetError::InvalidAmount { .. }));
    assert!(client.transfers().is_empty());
}

#[tokio::test]
async fn funding_runs_in_fleet_order_and_continues_past_failures() {
    let mut config = settings(1);
    config.source = FleetSource::Generate { count: 4 };
    let (client, fleet) = orchestrator(MockChainClient::new(), config);

    fleet
        .prepare_fleet(&fleet.settings().source.clone())
        .expect("prepare");
    let addresses: Vec<_> = fleet.wallets().iter().map(WalletAccount::address).collect();
    client.fail_transfer_to(addresses[1]);
    client.set_balance(addresses[0], "0.01");

    let report = fleet
        .fund_fleet(FUNDER)
        .await
        .expect("fund")
        .completed()
        .expect("not busy");
    assert_eq!(
        report,
        FundReport {
            attempted: 4,
            funded: 3
        }
    );

    let transfers = client.transfers();
    let observed: Vec<_> = transfers.iter().map(|t| t.to).collect();
    assert_eq!(observed, addresses);
    let expected_wei = U256::from(10_000_000_000_000_000u64);
    assert!(transfers.iter().all(|t| t.amount_wei == expected_wei));

    let wallets = fleet.wallets();
    assert_eq!(wallets[0].status, WalletStatus::Funding);
    assert_eq!(wallets[1].status, WalletStatus::Idle);
    assert_eq!(wallets[0].balance, "0.01");

    // 注资后按顺序刷新余额
    assert_eq!(client.balance_queries(), addresses);
}

#[tokio::test]
async fn fund_prepares_fleet_implicitly() {
    let (client, fleet) = orchestrator(MockChainClient::new(), settings(1));
    let report = fleet
        .fund_fleet(FUNDER)
        .await
        .expect("fund")
        .completed()
        .expect("not busy");
    assert_eq!(report.attempted, 2);
    assert_eq!(fleet.wallets().len(), 2);
    assert_eq!(client.transfers().len(), 2);
}

#[tokio::test]
async fn swarm_preconditions_abort_before_sending() {
    let mut config = settings(1);
    config.target = "  ".to_string();
    let (client, fleet) = orchestrator(MockChainClient::new(), config);
    fleet
        .prepare_fleet(&FleetSource::Generate { count: 1 })
        .expect("prepare");
    assert!(matches!(
        fleet.start_swarm().await.unwrap_err(),
        FleetError::MissingTarget
    ));

    let mut config = settings(1);
    config.payload = "0xzz".to_string();
    let (_, bad_payload) = orchestrator(MockChainClient::new(), config);
    bad_payload
        .prepare_fleet(&FleetSource::Generate { count: 1 })
        .expect("prepare");
    assert!(matches!(
        bad_payload.start_swarm().await.unwrap_err(),
        FleetError::InvalidPayload(_)
    ));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn swarm_nonces_are_contiguous_per_wallet() {
    let mut config = settings(4);
    config.payload = "0xdeadbeef".to_string();
    config.gas_limit = 250_000;
    let (client, fleet) = orchestrator(MockChainClient::new(), config);
    fleet
        .prepare_fleet(&FleetSource::Generate { count: 3 })
        .expect("prepare");
    let addresses: Vec<_> = fleet.wallets().iter().map(WalletAccount::address).collect();
    client.set_nonce(addresses[0], 7);
    client.set_nonce(addresses[2], 42);

    fleet.start_swarm().await.expect("swarm");

    for (address, start) in addresses.iter().zip([7u64, 0, 42]) {
        let calls = client.calls_from(*address);
        let nonces: Vec<_> = calls.iter().map(|c| c.nonce).collect();
        assert_eq!(nonces, (start..start + 4).collect::<Vec<_>>());
        for call in &calls {
            assert_eq!(call.to, "0xABC");
            assert_eq!(call.gas_limit, 250_000);
            assert_eq!(call.data, Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]));
        }
    }
}

#[tokio::test]
async fn swarm_failures_are_counted_and_sending_continues() {
    let (client, fleet) = orchestrator(MockChainClient::new(), settings(3));
    fleet
        .prepare_fleet(&FleetSource::Generate { count: 2 })
        .expect("prepare");
    let addresses: Vec<_> = fleet.wallets().iter().map(WalletAccount::address).collect();
    client.fail_call(addresses[0], 1);

    let report = fleet
        .start_swarm()
        .await
        .expect("swarm")
        .completed()
        .expect("not busy");
    assert_eq!(report.stats.total_tx, 6);
    assert_eq!(report.stats.successful_tx, 5);
    assert_eq!(report.stats.failed_tx, 1);
    assert_eq!(report.abandoned, 0);

    // 失败后仍继续下一个 nonce
    let nonces: Vec<_> = client
        .calls_from(addresses[0])
        .iter()
        .map(|c| c.nonce)
        .collect();
    assert_eq!(nonces, [0, 1, 2]);

    let wallets = fleet.wallets();
    assert_eq!(wallets[0].tx_count, 2);
    assert_eq!(wallets[0].status, WalletStatus::Done);
    assert_eq!(wallets[1].tx_count, 3);
    assert_eq!(wallets[1].status, WalletStatus::Done);
}

#[tokio::test]
async fn nonce_failure_abandons_only_that_wallet() {
    let (client, fleet) = orchestrator(MockChainClient::new(), settings(2));
    fleet
        .prepare_fleet(&FleetSource::Generate { count: 3 })
        .expect("prepare");
    let addresses: Vec<_> = fleet.wallets().iter().map(WalletAccount::address).collect();
    client.fail_nonce_for(addresses[1]);

    let report = fleet
        .start_swarm()
        .await
        .expect("swarm")
        .completed()
        .expect("not busy");
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.stats.total_tx, (3 - 1) * 2);
    assert_eq!(
        report.stats.total_tx,
        report.stats.successful_tx + report.stats.failed_tx
    );
    assert!(client.calls_from(addresses[1]).is_empty());

    let wallets = fleet.wallets();
    assert_eq!(wallets[1].status, WalletStatus::Error);
    assert_eq!(wallets[1].tx_count, 0);
    assert_eq!(wallets[0].status, WalletStatus::Done);
    assert_eq!(wallets[2].status, WalletStatus::Done);
}

#[tokio::test]
async fn nonce_failure_after_completed_run_marks_error() {
    let (client, fleet) = orchestrator(MockChainClient::new(), settings(2));
    fleet
        .prepare_fleet(&FleetSource::Generate { count: 2 })
        .expect("prepare");
    fleet.start_swarm().await.expect("first swarm");
    let wallets = fleet.wallets();
    assert!(wallets.iter().all(|w| w.status == WalletStatus::Done));

    let address = wallets[0].address();
    client.fail_nonce_for(address);
    let report = fleet
        .start_swarm()
        .await
        .expect("second swarm")
        .completed()
        .expect("not busy");
    assert_eq!(report.abandoned, 1);

    let wallets = fleet.wallets();
    assert_eq!(wallets[0].status, WalletStatus::Error);
    assert_eq!(wallets[0].tx_count, 0);
    assert_eq!(wallets[1].status, WalletStatus::Done);
    assert_eq!(wallets[1].tx_count, 2);
}

#[tokio::test]
async fn status_events_never_regress_within_a_run() {
    let (client, fleet) = orchestrator(MockChainClient::new(), settings(3));
    fleet
        .prepare_fleet(&FleetSource::Generate { count: 1 })
        .expect("prepare");
    let address = fleet.wallets()[0].address();
    client.fail_call(address, 0);
    let rx = fleet.subscribe();

    fleet.start_swarm().await.expect("swarm");

    let statuses: Vec<_> = rx
        .try_iter()
        .filter_map(|event| match event {
            FleetEvent::WalletStatusChanged { status, .. } => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        [WalletStatus::Sending, WalletStatus::Error, WalletStatus::Done]
    );
}

#[tokio::test]
async fn reset_is_rejected_while_swarm_in_flight() {
    let (client, fleet) = orchestrator(MockChainClient::gated(), settings(2));
    fleet
        .prepare_fleet(&FleetSource::Generate { count: 2 })
        .expect("prepare");

    let (swarm, ()) = tokio::join!(fleet.start_swarm(), async {
        client.wait_for_submission().await;
        assert!(fleet.is_busy());
        assert!(!fleet.reset_fleet());
        assert_eq!(fleet.wallets().len(), 2);
        assert_eq!(fleet.stats(), FleetStatsSnapshot::default());
        assert!(fleet.fund_fleet(FUNDER).await.expect("fund").is_busy());
        assert!(fleet.start_swarm().await.expect("swarm").is_busy());
        assert!(
            fleet
                .prepare_fleet(&FleetSource::Generate { count: 1 })
                .expect("prepare")
                .is_busy()
        );
        client.release_confirmations();
    });

    let report = swarm.expect("swarm").completed().expect("not busy");
    assert_eq!(report.stats.successful_tx, 4);
    assert!(client.transfers().is_empty());

    assert!(fleet.reset_fleet());
    assert!(fleet.wallets().is_empty());
    assert_eq!(fleet.stats(), FleetStatsSnapshot::default());
}

#[tokio::test]
async fn end_to_end_generate_fund_swarm() {
    let (client, fleet) = orchestrator(MockChainClient::new(), settings(3));
    let rx = fleet.subscribe();

    fleet
        .prepare_fleet(&FleetSource::Generate { count: 2 })
        .expect("prepare");
    let report = fleet
        .fund_fleet(FUNDER)
        .await
        .expect("fund")
        .completed()
        .expect("not busy");
    assert_eq!(report.funded, 2);

    let swarm_started = fleet.logs().len();
    let report = fleet
        .start_swarm()
        .await
        .expect("swarm")
        .completed()
        .expect("not busy");

    assert_eq!(
        report.stats,
        FleetStatsSnapshot {
            total_tx: 6,
            successful_tx: 6,
            failed_tx: 0
        }
    );
    assert_eq!(fleet.stats(), report.stats);
    for wallet in fleet.wallets() {
        assert_eq!(wallet.status, WalletStatus::Done);
        assert_eq!(wallet.tx_count, 3);
    }
    assert_eq!(client.calls().len(), 6);

    let logs = fleet.logs();
    assert_eq!(count_severity(&logs[..swarm_started], Severity::Success), 2);
    assert_eq!(count_severity(&logs[swarm_started..], Severity::Success), 6);
    assert_eq!(count_severity(&logs, Severity::Error), 0);
    assert!(
        logs[swarm_started..]
            .iter()
            .filter(|e| e.severity == Severity::Success)
            .all(|e| e.transaction_reference.is_some())
    );

    let confirmed = rx
        .try_iter()
        .filter(|event| matches!(event, FleetEvent::TransactionConfirmed { .. }))
        .count();
    assert_eq!(confirmed, 6);
}

#[tokio::test]
async fn stats_reset_at_start_of_each_run() {
    let (_, fleet) = orchestrator(MockChainClient::new(), settings(2));
    fleet
        .prepare_fleet(&FleetSource::Generate { count: 2 })
        .expect("prepare");
    fleet.start_swarm().await.expect("first");
    let report = fleet
        .start_swarm()
        .await
        .expect("second")
        .completed()
        .expect("not busy");
    assert_eq!(report.stats.total_tx, 4);
    assert!(fleet.wallets().iter().all(|w| w.tx_count == 2));
}

#[test]
fn payload_parsing_accepts_empty_and_hex() {
    assert!(parse_payload("").expect("empty").is_empty());
    assert!(parse_payload("0x").expect("0x").is_empty());
    assert_eq!(parse_payload(" 0xA9059CBB ").expect("hex").len(), 4);
    assert!(matches!(
        parse_payload("0x123"),
        Err(FleetError::InvalidPayload(_))
    ));
}
