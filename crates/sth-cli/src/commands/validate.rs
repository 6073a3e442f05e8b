//! Validate command implementation.

use anyhow::Result;
use sth_core::Config;

/// Validate a loaded configuration and print a summary.
pub fn run(config: &Config) -> Result<()> {
    config.validate()?;

    println!("Configuration is valid");
    println!();
    println!("Cluster:");
    println!("  Endpoint:    {}", config.cluster.endpoint);
    println!("  Database:    /{}", config.cluster.database.trim_matches('/'));
    if config.cluster.tables_path.is_empty() {
        println!("  Tables path: (none)");
    } else {
        println!("  Tables path: {}", config.cluster.tables_path);
    }
    println!();
    println!("Execution:");
    println!("  Retry delay: {}ms", config.execution.retry_delay_ms);
    println!(
        "  Bulk upsert batch size: {}",
        config.execution.bulk_upsert_batch_size
    );
    match config.execution.scan_timeout_seconds {
        Some(seconds) => println!("  Scan timeout: {}s", seconds),
        None => println!("  Scan timeout: driver default"),
    }

    Ok(())
}
