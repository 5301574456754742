use super::{format_ether, format_gwei};
use crate::chain::{Address, EthClient};
use crate::errors::BridgeError;

/// 0.1 ETH.
pub const MIN_RECOMMENDED_WEI: u128 = 100_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub account: Address,
    pub balance_wei: u128,
    /// `None` when the node would not report a gas price.
    pub gas_price_wei: Option<u128>,
}

impl BalanceReport {
    pub async fn collect(eth: &EthClient, account: Address) -> anyhow::Result<Self> {
        let balance_wei = eth.get_balance(&account).await.map_err(BridgeError::from)?;
        let gas_price_wei = match eth.gas_price().await {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "could not fetch gas price");
                None
            }
        };
        Ok(Self {
            account,
            balance_wei,
            gas_price_wei,
        })
    }

    pub fn is_low(&self) -> bool {
        self.balance_wei < MIN_RECOMMENDED_WEI
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Checking balance for account: {}\n", self.account));
        out.push_str(&format!("Balance: {} ETH\n", format_ether(self.balance_wei)));
        if self.is_low() {
            out.push_str("\nWARNING: Balance is below recommended minimum (0.1 ETH)\n");
        } else {
            out.push_str("\nBalance is sufficient for transactions\n");
        }
        match self.gas_price_wei {
            Some(p) => out.push_str(&format!("\nCurrent Gas Price: {} gwei\n", format_gwei(p))),
            None => out.push_str("\nCould not fetch gas price\n"),
        }
        out
    }
}
