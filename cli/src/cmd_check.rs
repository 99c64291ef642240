//! `chainstream check`: query the upstream endpoint once.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use chainstream_core::{ChainSource, ChainStreamConfig};
use chainstream_rpc::{HttpTransport, RpcChainSource};

pub async fn run(config: &ChainStreamConfig) -> Result<()> {
    let url = &config.rpc.url;
    let timeout = Duration::from_millis(config.rpc.request_timeout_ms);
    let transport = HttpTransport::new(url.clone(), timeout)?;
    let source = RpcChainSource::new(transport);

    println!("Checking {url}...");
    let start = Instant::now();
    let chain_id = source
        .chain_id()
        .await
        .with_context(|| format!("{url} unreachable"))?;
    let latency = start.elapsed();

    let head = source.latest_head().await.context("reading latest block")?;
    let gas = source.suggested_gas_price().await.context("reading gas price")?;

    println!("  chain id:   {chain_id}");
    println!("  head:       #{} ({} txs) {}", head.number, head.tx_count, head.hash);
    println!("  gas price:  {} wei ({:.3} gwei)", gas, gas as f64 / 1e9);
    println!("  latency:    {}ms", latency.as_millis());
    Ok(())
}
