//! Fee-imbalance pricer: computes the integer price of a token such that
//! its fee-induced imbalance can be sold for fee token against the
//! available fee-selling orders.

use crate::config::Config;
use crate::error::SolverError;
use crate::models::{Fee, Order, TokenId};
use crate::xrate::find_best_xrate;
use num::{BigInt, BigRational, Zero};

/// Creates a synthetic order market-selling `sell_amount` of `sell_token`:
/// its limit is the most optimistic rate the counter-orders offer, with
/// some slack so the order still matches after rounding.
pub fn create_market_order(
    buy_token: TokenId,
    sell_token: TokenId,
    sell_amount: BigRational,
    s_orders: &[Order],
) -> Order {
    let min_xrate = s_orders
        .iter()
        .map(|order| order.max_xrate().clone())
        .min()
        .expect("market order against an empty orderbook");
    let min_xrate = min_xrate * BigRational::new(9.into(), 10.into());

    Order::new(
        None,
        None,
        buy_token,
        sell_token,
        sell_amount,
        min_xrate.recip(),
    )
}

/// Finds the integer price of `buy_token` at which a subset of `f_orders`
/// (selling fee token for `buy_token`) can absorb `buy_token_imbalance`.
///
/// The imbalance is padded by 1% as an estimate of what integer rounding
/// will add on top. The optimal rate is integerized asymmetrically: rounded
/// up when the synthetic sell order's limit is binding, down otherwise, so
/// the integerized rate never violates whichever side's limit was tight.
pub fn compute_token_price_to_cover_imbalance(
    buy_token: &TokenId,
    fee: &Fee,
    buy_token_imbalance: &BigRational,
    f_orders: &mut [Order],
    config: &Config,
) -> Result<BigInt, SolverError> {
    if f_orders.is_empty() {
        return Err(SolverError::FeeUnreachable(buy_token.clone()));
    }

    let sell_amount = buy_token_imbalance * BigRational::new(101.into(), 100.into());

    let mut market_order = [create_market_order(
        fee.token.clone(),
        buy_token.clone(),
        sell_amount,
        f_orders,
    )];

    // The optimal rate here is fee_token_price / buy_token_price.
    let (xrate, _) = find_best_xrate(&mut market_order, f_orders, fee, config)
        .ok_or_else(|| SolverError::FeeUnreachable(buy_token.clone()))?;

    let fee_token_price = BigRational::from_integer(config.fee_token_price.clone());
    let buy_token_price = if xrate == market_order[0].max_xrate() * fee.factor() {
        // The synthetic order's limit is binding: round the price up so
        // the integerized rate rounds down and stays within that limit.
        (fee_token_price / &xrate).ceil().to_integer()
    } else {
        // Otherwise some f order's limit may be binding: round the price
        // down so the inverse rate rounds down and stays within it.
        (fee_token_price / &xrate).floor().to_integer()
    };

    // A zero price means the b token is worth effectively nothing in fee
    // terms; no integral price can cover the imbalance then.
    if buy_token_price.is_zero() {
        return Err(SolverError::FeeUnreachable(buy_token.clone()));
    }

    Ok(buy_token_price)
}
