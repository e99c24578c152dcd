//! Three cache nodes in one process serving the "scores" group.
//!
//! Run with:
//!   RUST_LOG=macchiato=debug cargo run --example scores

use macchiato::group::GetterFn;
use macchiato::{CacheNode, GroupConfig, NodeConfig, Registry};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

const PEERS: [&str; 3] = ["127.0.0.1:8001", "127.0.0.1:8002", "127.0.0.1:8003"];

fn scores() -> HashMap<&'static str, &'static str> {
    HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "567")])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "macchiato=info".to_string()))
        .init();

    // One registry per node, as if each ran in its own process
    let mut nodes = Vec::new();
    for addr in PEERS {
        let registry = Arc::new(Registry::new());
        let db = scores();
        let group = registry.new_group(
            "scores",
            GroupConfig::default().with_hot_key_qps(3),
            GetterFn::new(move |key: &str| {
                println!("[slow db] {} searching {}", addr, key);
                db.get(key)
                    .map(|v| v.as_bytes().to_vec())
                    .ok_or_else(|| format!("{} not exist", key).into())
            }),
        )?;

        let config = NodeConfig::new(addr.parse()?).with_peers(PEERS);
        let node = CacheNode::start(config, registry).await?;
        node.attach(&group)?;
        println!("Node started at {}", node.addr());
        nodes.push((node, group));
    }

    println!("\n=== Key ownership (10000 sample keys) ===");
    let mut share: Vec<_> = nodes[0].0.pool().distribution(10_000).into_iter().collect();
    share.sort();
    for (peer, owned) in share {
        println!("{}: {}", peer, owned);
    }

    // Ask every node for every key, twice, plus a key nobody has
    for round in 1..=2 {
        println!("\n=== Round {} ===", round);
        for (node, group) in &nodes {
            for key in ["Tom", "Jack", "Sam", "Kate"] {
                match group.get(key).await {
                    Ok(value) => println!("{} {} = {}", node.addr(), key, value),
                    Err(e) => println!("{} {} failed: {}", node.addr(), key, e),
                }
            }
        }
    }

    // Hammer one key from every node until it turns hot where it is remote
    for _ in 0..3 {
        for (_, group) in &nodes {
            group.get("Tom").await?;
        }
    }

    println!("\n=== Stats ===");
    for (node, group) in &nodes {
        let stats = group.stats();
        println!(
            "{}: gets={} hot_hits={} main_hits={} peer_loads={} local_loads={} promotions={} hit_rate={:.2}",
            node.addr(),
            stats.gets,
            stats.hot_hits,
            stats.main_hits,
            stats.peer_loads,
            stats.local_loads,
            stats.promotions,
            stats.hit_rate()
        );
    }

    println!("\n=== Metrics of {} ===", nodes[0].0.addr());
    let (_, group) = &nodes[0];
    print!("{}", group.metrics().render(group.name()));

    println!("\nShutting down...");
    for (node, _) in nodes {
        node.shutdown().await;
    }

    Ok(())
}
