use std::fmt::Write as _;

use zeroize::Zeroizing;

use super::types::WalletAccount;

pub const CSV_HEADER: &str = "index,address,private_key,status,tx_count,balance";

/// 导出当前舰队快照；包含明文私钥，缓冲区在释放时清零。
pub fn export_csv(wallets: &[WalletAccount]) -> Zeroizing<String> {
    let mut out = Zeroizing::new(String::with_capacity(128 * (wallets.len() + 1)));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for (index, wallet) in wallets.iter().enumerate() {
        let key = wallet.account.private_key_hex();
        // 写入 String 不会失败
        let _ = writeln!(
            out,
            "{index},{},{},{},{},{}",
            wallet.address(),
            key.as_str(),
            wallet.status,
            wallet.tx_count,
            csv_field(&wallet.balance),
        );
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
