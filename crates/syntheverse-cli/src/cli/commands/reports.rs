use crate::cli::args::{SnapshotArgs, SummaryArgs};
use crate::cli::helpers::{build_bridge, load_settings};
use crate::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use std::path::Path;
use syntheverse_core::errors::BridgeError;
use syntheverse_core::report::{self, BalanceReport, DiscoverySummary, PersistenceSnapshot};

pub async fn summary(args: SummaryArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let settings = load_settings(config)?;
    let bridge = build_bridge(&settings, None, false)?;
    let summary = DiscoverySummary::collect(&bridge).await?;
    print!("{}", summary.render());
    if let Some(out) = args.out {
        report::write_json(&summary, &out)?;
        println!("Detailed summary saved to: {}", out.display());
    }
    Ok(EXIT_SUCCESS)
}

pub async fn snapshot(args: SnapshotArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let settings = load_settings(config)?;
    let earlier = args
        .compare
        .as_deref()
        .map(PersistenceSnapshot::load)
        .transpose()?;
    let bridge = build_bridge(&settings, None, false)?;
    let snap = PersistenceSnapshot::collect(&bridge).await?;
    print!("{}", snap.render());
    report::write_json(&snap, &args.out)?;
    println!("\nState snapshot saved to: {}", args.out.display());

    let Some(earlier) = earlier else {
        println!("\nTo test persistence: restart the node, then run");
        println!(
            "  syntheverse snapshot --compare {} --out <new file>",
            args.out.display()
        );
        return Ok(EXIT_SUCCESS);
    };
    let cmp = snap.compare(&earlier);
    println!("\nCompared with snapshot from {}:", earlier.timestamp);
    print!("{}", cmp.render());
    Ok(if cmp.state_lost() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    })
}

pub async fn balance(config: Option<&Path>) -> anyhow::Result<i32> {
    let settings = load_settings(config)?;
    let key = syntheverse_core::config::private_key()
        .ok_or_else(|| BridgeError::missing_key("PRIVATE_KEY", "checking the signer balance"))?;
    let wallet = syntheverse_core::chain::Wallet::from_hex(&key).map_err(BridgeError::from)?;
    let eth = syntheverse_core::chain::EthClient::http(&settings.chain.rpc_url);
    let report = BalanceReport::collect(&eth, wallet.address()).await?;
    print!("{}", report.render());
    Ok(EXIT_SUCCESS)
}
