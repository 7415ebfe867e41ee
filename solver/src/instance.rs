//! JSON instance input and output.
//!
//! The input format carries the batch fee, per-account token balances and
//! the orders; the output is the same document with clearing prices,
//! executed amounts on the touched orders, updated account balances and the
//! objective metrics added.

use crate::config::Config;
use crate::models::{AccountId, AccountState, Fee, Order, Solution, TokenId};
use crate::orderbook::{
    compute_solution_metrics, restrict_order_sell_amounts_by_balances, ObjVals,
};
use crate::serialization::{Decimal, Num};
use anyhow::{ensure, Context, Result};
use num::{BigInt, BigRational, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FeeDto {
    pub token: TokenId,
    #[serde(with = "crate::serialization::exact_decimal")]
    pub ratio: BigRational,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    #[serde(rename = "accountID")]
    pub account_id: AccountId,
    pub buy_token: TokenId,
    pub sell_token: TokenId,
    pub buy_amount: Decimal,
    pub sell_amount: Decimal,
    #[serde(rename = "orderID", default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_buy_amount: Option<Num<BigInt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_sell_amount: Option<Num<BigInt>>,
}

pub type AccountsDto = BTreeMap<AccountId, BTreeMap<TokenId, Decimal>>;

/// Objective metric values as they appear in the solution file.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ObjValsDto {
    pub volume: Num<BigInt>,
    pub utility: Num<BigInt>,
    pub utility_disreg: Num<BigInt>,
    pub utility_disreg_touched: Num<BigInt>,
    pub fees: Num<BigInt>,
    pub orders_touched: Num<BigInt>,
}

impl From<ObjVals> for ObjValsDto {
    fn from(obj: ObjVals) -> Self {
        ObjValsDto {
            volume: Num(obj.volume),
            utility: Num(obj.utility),
            utility_disreg: Num(obj.utility_disreg),
            utility_disreg_touched: Num(obj.utility_disreg_touched),
            fees: Num(obj.fees),
            orders_touched: Num(BigInt::from(obj.orders_touched)),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Instance {
    pub fee: FeeDto,
    pub accounts: AccountsDto,
    pub orders: Vec<OrderDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prices: Option<BTreeMap<TokenId, Num<BigInt>>>,
    #[serde(rename = "objVals", default, skip_serializing_if = "Option::is_none")]
    pub obj_vals: Option<ObjValsDto>,
}

impl Instance {
    pub fn read_from(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("unable to open instance file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("unable to parse instance file {}", path.display()))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("unable to create solution file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("unable to write solution file {}", path.display()))
    }

    pub fn fee(&self) -> Fee {
        Fee {
            token: self.fee.token.clone(),
            ratio: self.fee.ratio.clone(),
        }
    }

    pub fn account_state(&self) -> AccountState {
        let mut accounts = AccountState::default();
        for (account_id, balances) in &self.accounts {
            let entry = accounts.0.entry(account_id.clone()).or_default();
            for (token, balance) in balances {
                entry.insert(token.clone(), balance.0.floor().to_integer());
            }
        }
        accounts
    }

    /// Builds the order entities. The limit rate is derived as `sellAmount
    /// / max(MIN_TRADABLE_AMOUNT, buyAmount)` so that tiny requested buy
    /// amounts do not produce absurd limit rates.
    fn build_orders(&self, config: &Config) -> Vec<Order> {
        let min_tradable = BigRational::from_integer(config.min_tradable_amount.clone());
        self.orders
            .iter()
            .enumerate()
            .map(|(index, order)| {
                let buy_amount_ceiled = order.buy_amount.0.clone().max(min_tradable.clone());
                Order::new(
                    Some(index),
                    Some(order.account_id.clone()),
                    order.buy_token.clone(),
                    order.sell_token.clone(),
                    order.sell_amount.0.clone(),
                    &order.sell_amount.0 / buy_amount_ceiled,
                )
            })
            .collect()
    }

    /// Loads all orders with their sell amounts restricted to the account
    /// balances, for the best-token-pair enumeration.
    pub fn load_orderbook(&self, config: &Config) -> (AccountState, Vec<Order>) {
        let accounts = self.account_state();
        let orders = restrict_order_sell_amounts_by_balances(self.build_orders(config), &accounts);
        (accounts, orders)
    }

    /// Loads and splits the orders of a token-pair problem:
    /// `b_orders` buy the b token for the s token, `s_orders` the reverse,
    /// and `f_orders` buy the b token for fee token.
    #[allow(clippy::type_complexity)]
    pub fn load_problem(
        &self,
        token_pair: (&TokenId, &TokenId),
        config: &Config,
    ) -> Result<(AccountState, Vec<Order>, Vec<Order>, Vec<Order>)> {
        let (b_buy_token, s_buy_token) = token_pair;
        let fee = self.fee();
        // A fee-token side must always be the b side.
        ensure!(
            s_buy_token != &fee.token,
            "the fee token may only appear as the b buy token of the pair",
        );

        let (accounts, orders) = self.load_orderbook(config);
        let b_orders = orders
            .iter()
            .filter(|o| &o.buy_token == b_buy_token && &o.sell_token == s_buy_token)
            .cloned()
            .collect();
        let s_orders = orders
            .iter()
            .filter(|o| &o.buy_token == s_buy_token && &o.sell_token == b_buy_token)
            .cloned()
            .collect();
        let f_orders = orders
            .iter()
            .filter(|o| &o.buy_token == b_buy_token && o.sell_token == fee.token)
            .cloned()
            .collect();

        Ok((accounts, b_orders, s_orders, f_orders))
    }

    /// Produces the output instance for a solution: prices, updated account
    /// balances, objective metrics, and the touched orders with their
    /// executed amounts. Untouched orders are dropped.
    pub fn dump_solution(&self, solution: &Solution) -> Instance {
        let mut output = self.clone();
        let fee = self.fee();

        output.prices = Some(
            solution
                .prices
                .iter()
                .map(|(token, price)| (token.clone(), Num(price.clone())))
                .collect(),
        );

        // Update account balances with the executed trades.
        for order in &solution.orders {
            let account_id = match &order.account_id {
                Some(account_id) => account_id,
                None => continue,
            };
            let balances = output.accounts.entry(account_id.clone()).or_default();
            for (token, delta) in &[
                (&order.buy_token, order.buy_amount.clone()),
                (&order.sell_token, -order.sell_amount.clone()),
            ] {
                let balance = balances.entry((*token).clone()).or_default();
                *balance = Decimal(balance.0.floor() + delta);
            }
        }

        let accounts_updated = self.account_state().updated_for(&solution.orders);
        output.obj_vals = Some(
            compute_solution_metrics(&solution.prices, &accounts_updated, &solution.orders, &fee)
                .into(),
        );

        // Keep only the touched orders, in instance order, with their
        // executed amounts.
        let mut touched: Vec<(usize, OrderDto)> = Vec::new();
        for order in &solution.orders {
            if order.sell_amount <= BigRational::zero() {
                continue;
            }
            let index = match order.index {
                Some(index) => index,
                None => continue,
            };
            let mut dto = self.orders[index].clone();
            dto.exec_buy_amount = Some(Num(order.buy_amount.to_integer()));
            dto.exec_sell_amount = Some(Num(order.sell_amount.to_integer()));
            touched.push((index, dto));
        }
        touched.sort_by_key(|(index, _)| *index);
        output.orders = touched.into_iter().map(|(_, dto)| dto).collect();

        output
    }
}
