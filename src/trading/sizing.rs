//! Order sizing for copied trades.

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::Trade;

/// Smallest limit order size the exchange accepts, in shares.
pub const MIN_ORDER_SIZE: Decimal = dec!(5);

/// Share count for a limit order copying `trade`.
///
/// Mirrors the source size, or with `min_share_possible` buys just enough
/// shares for a notional of at least 1 USDC. Either way the result is never
/// below [`MIN_ORDER_SIZE`].
pub fn limit_order_size(trade: &Trade, min_share_possible: bool) -> Result<Decimal> {
    if trade.price <= Decimal::ZERO {
        bail!(
            "cannot size trade {} with non-positive price {}",
            trade.transaction_hash,
            trade.price
        );
    }

    let size = if min_share_possible {
        (Decimal::ONE / trade.price).ceil()
    } else {
        trade.size
    };

    Ok(size.max(MIN_ORDER_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeSide;

    fn trade(price: Decimal, size: Decimal) -> Trade {
        Trade {
            transaction_hash: "0xhash".to_string(),
            wallet: "0xwallet".to_string(),
            asset: "123".to_string(),
            price,
            size,
            side: TradeSide::Buy,
        }
    }

    #[test]
    fn test_mirrors_source_size() {
        assert_eq!(limit_order_size(&trade(dec!(0.5), dec!(42)), false).unwrap(), dec!(42));
        assert_eq!(limit_order_size(&trade(dec!(0.5), dec!(7.25)), false).unwrap(), dec!(7.25));
    }

    #[test]
    fn test_floors_at_minimum() {
        assert_eq!(limit_order_size(&trade(dec!(0.5), dec!(1)), false).unwrap(), dec!(5));
        // ceil(1 / 0.9) = 2
        assert_eq!(limit_order_size(&trade(dec!(0.9), dec!(100)), true).unwrap(), dec!(5));
    }

    #[test]
    fn test_min_share_possible_ignores_source_size() {
        // ceil(1 / 0.03) = 34
        assert_eq!(limit_order_size(&trade(dec!(0.03), dec!(1000)), true).unwrap(), dec!(34));
        // ceil(1 / 0.15) = 7
        assert_eq!(limit_order_size(&trade(dec!(0.15), dec!(1)), true).unwrap(), dec!(7));
        // exact division does not round up
        assert_eq!(limit_order_size(&trade(dec!(0.1), dec!(1)), true).unwrap(), dec!(10));
    }

    #[test]
    fn test_sizes_hold_for_a_price_grid() {
        for cents in 1..100u32 {
            let price = Decimal::new(cents as i64, 2);
            let t = trade(price, dec!(3));

            let with_policy = limit_order_size(&t, true).unwrap();
            assert_eq!(with_policy, (Decimal::ONE / price).ceil().max(dec!(5)));
            assert!(with_policy * price >= Decimal::ONE);

            assert_eq!(limit_order_size(&t, false).unwrap(), dec!(5));
        }
    }

    #[test]
    fn test_zero_price_is_an_error() {
        assert!(limit_order_size(&trade(dec!(0), dec!(10)), true).is_err());
        assert!(limit_order_size(&trade(dec!(0), dec!(10)), false).is_err());
    }
}
