//! `hookman check` - bind every available plugin and report the result

use anyhow::Result;
use clap::Args;
use hookman_core::DynamicLoader;

use crate::config::HookmanConfig;

#[derive(Args)]
pub struct CheckArgs {
    /// Leave a plugin out of the check (repeatable)
    #[arg(long = "ignore", value_name = "NAME")]
    pub ignore: Vec<String>,
}

fn slot_line(hook: &str, symbol: &str, plugin: Option<&str>) -> String {
    match plugin {
        Some(plugin) => format!("✓ {hook} ({symbol}) <- {plugin}"),
        None => format!("○ {hook} ({symbol}) unbound"),
    }
}

pub fn run(args: CheckArgs, config: &HookmanConfig) -> Result<()> {
    let manager = super::load_manager(config)?;
    let loader = DynamicLoader::new(manager.registry().runtime());
    let caller = manager.hook_caller(loader, &args.ignore)?;

    for slot in caller.slots() {
        println!("{}", slot_line(slot.name(), slot.id().as_str(), slot.plugin()));
    }

    let bound = caller.slots().iter().filter(|s| s.is_bound()).count();
    println!();
    println!(
        "{bound}/{} hooks bound from {} plugin libraries",
        caller.slots().len(),
        caller.library_count()
    );
    Ok(())
}
