//! 金额解析与格式化
//!
//! 所有金额均以字符串进出 Mint API，内部统一用 `Decimal` 做精确运算，
//! 避免浮点数在分位四舍五入时产生偏差（例如 1.005）。

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::MintError;

/// 解析正数金额字符串
pub fn parse_amount(raw: &str) -> Result<Decimal, MintError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MintError::Validation("amount is required".into()));
    }

    let value = Decimal::from_str(trimmed)
        .map_err(|_| MintError::Validation(format!("malformed amount: {:?}", raw)))?;

    if value <= Decimal::ZERO {
        return Err(MintError::Validation(format!(
            "amount must be greater than zero: {}",
            trimmed
        )));
    }

    Ok(value)
}

/// 主单位两位小数格式（法币/业务类操作、地址簿付款）
///
/// 舍入规则：中点远离零（half away from zero），在十进制上精确计算。
/// `"1"` → `"1.00"`，`"1.005"` → `"1.01"`，`"1.004"` → `"1.00"`。
pub fn format_major_units(raw: &str) -> Result<String, MintError> {
    let value = parse_amount(raw)?;
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        return Err(MintError::Validation(format!(
            "amount rounds to zero at two decimals: {}",
            raw.trim()
        )));
    }
    rounded.rescale(2);
    Ok(rounded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_major_units_pads_integers() {
        assert_eq!(format_major_units("1").unwrap(), "1.00");
        assert_eq!(format_major_units("2.5").unwrap(), "2.50");
        assert_eq!(format_major_units(" 10 ").unwrap(), "10.00");
    }

    #[test]
    fn test_format_major_units_midpoint_rounds_away_from_zero() {
        assert_eq!(format_major_units("1.005").unwrap(), "1.01");
        assert_eq!(format_major_units("1.015").unwrap(), "1.02");
        assert_eq!(format_major_units("1.004").unwrap(), "1.00");
        assert_eq!(format_major_units("0.125").unwrap(), "0.13");
    }

    #[test]
    fn test_format_major_units_rejects_bad_input() {
        assert!(format_major_units("").is_err());
        assert!(format_major_units("abc").is_err());
        assert!(format_major_units("-1").is_err());
        assert!(format_major_units("0").is_err());
        assert!(format_major_units("0.001").is_err());
    }
}
