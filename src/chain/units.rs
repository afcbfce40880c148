use alloy::primitives::U256;
use alloy::primitives::utils::format_ether as format_ether_wide;
use anyhow::{Result, anyhow, bail};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// 原生币精度（CELO / ETH 均为 18 位）。
pub const NATIVE_DECIMALS: u32 = 18;

fn wei_per_unit() -> Decimal {
    Decimal::from(10u64.pow(NATIVE_DECIMALS))
}

/// 将十进制金额（如 `"0.01"`）转换为 wei。
pub fn parse_native_amount(raw: &str) -> Result<U256> {
    let trimmed = raw.trim();
    let amount: Decimal = trimmed
        .parse()
        .map_err(|err| anyhow!("金额格式无效 {trimmed}: {err}"))?;
    if amount <= Decimal::ZERO {
        bail!("金额必须大于 0");
    }
    let scaled = amount
        .checked_mul(wei_per_unit())
        .ok_or_else(|| anyhow!("金额超出可表示范围"))?;
    if !scaled.fract().is_zero() {
        bail!("金额最多支持 {NATIVE_DECIMALS} 位小数");
    }
    let wei = scaled
        .to_u128()
        .ok_or_else(|| anyhow!("金额超过 u128 最大值"))?;
    Ok(U256::from(wei))
}

/// 将 wei 格式化为去掉多余零的十进制字符串，0 输出为 `"0"`。
pub fn format_native_amount(wei: U256) -> String {
    let narrow = u128::try_from(wei)
        .ok()
        .and_then(|value| i128::try_from(value).ok())
        .and_then(|value| Decimal::try_from_i128_with_scale(value, NATIVE_DECIMALS).ok());
    match narrow {
        Some(decimal) => decimal.normalize().to_string(),
        None => format_ether_wide(wei),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fractional_amounts() {
        assert_eq!(
            parse_native_amount("0.01").unwrap(),
            U256::from(10_000_000_000_000_000u128)
        );
        assert_eq!(
            parse_native_amount(" 2 ").unwrap(),
            U256::from(2_000_000_000_000_000_000u128)
        );
    }

    #[test]
    fn rejects_invalid_amounts() {
        assert!(parse_native_amount("0").is_err());
        assert!(parse_native_amount("-1").is_err());
        assert!(parse_native_amount("abc").is_err());
        assert!(parse_native_amount("0.0000000000000000001").is_err());
    }

    #[test]
    fn formats_wei_as_trimmed_decimal() {
        assert_eq!(format_native_amount(U256::ZERO), "0");
        assert_eq!(
            format_native_amount(U256::from(10_000_000_000_000_000u128)),
            "0.01"
        );
        assert_eq!(
            format_native_amount(U256::from(1_500_000_000_000_000_000u128)),
            "1.5"
        );
    }
}
