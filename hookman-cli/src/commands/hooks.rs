//! `hookman hooks` - list the hooks a plugin can implement

use anyhow::Result;
use clap::Args;
use hookman_core::{HookSpecRegistry, ParamType};
use serde::Serialize;

use crate::config::HookmanConfig;

#[derive(Args)]
pub struct HooksArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// One hook as shown to plugin authors
#[derive(Debug, Serialize)]
struct HookRow<'a> {
    name: &'a str,
    symbol: &'a str,
    signature: String,
    doc: &'a str,
}

fn rows(registry: &HookSpecRegistry) -> Vec<HookRow<'_>> {
    registry
        .hooks()
        .map(|(descriptor, id)| HookRow {
            name: &descriptor.name,
            symbol: id.as_str(),
            signature: ParamType::describe_signature(
                &descriptor.param_types(),
                descriptor.returns,
            ),
            doc: descriptor.doc.trim(),
        })
        .collect()
}

pub fn run(args: HooksArgs, config: &HookmanConfig) -> Result<()> {
    let registry = super::load_registry(config)?;
    let rows = rows(&registry);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{} v{} (runtime: {})",
        registry.project(),
        registry.version(),
        registry.runtime()
    );
    println!();
    for row in rows {
        println!("{}    {}", row.symbol, row.signature);
        if let Some(summary) = row.doc.lines().next() {
            println!("    {summary}");
        }
    }

    Ok(())
}
