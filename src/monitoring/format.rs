use std::borrow::Cow;

use alloy::primitives::{Address, B256};

/// `0x1234..abcd` 形式的短地址，用于控制台表格。
pub fn short_address(address: &Address) -> String {
    short_hex(&address.to_string()).into_owned()
}

pub fn short_hash(hash: &B256) -> String {
    short_hex(&hash.to_string()).into_owned()
}

pub fn short_hex(value: &str) -> Cow<'_, str> {
    if value.len() <= 12 {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("{}..{}", &value[..6], &value[value.len() - 4..]))
    }
}
