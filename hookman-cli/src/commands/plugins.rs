//! Plugin management commands: list, status, install, remove

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Args;
use hookman_core::{ConflictStatus, PACKAGE_EXTENSION, PluginInfo, ScanReport};
use serde::Serialize;

use crate::config::HookmanConfig;

#[derive(Args)]
pub struct ListArgs {
    /// Leave a plugin out of the listing (repeatable)
    #[arg(long = "ignore", value_name = "NAME")]
    pub ignore: Vec<String>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Plugin package (.hmplugin)
    pub package: PathBuf,

    /// Plugin root to install into (defaults to the first configured root)
    #[arg(long)]
    pub dest: Option<PathBuf>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Plugin name
    pub name: String,
}

#[derive(Serialize)]
struct SkippedRow {
    name: String,
    location: PathBuf,
    error: String,
}

#[derive(Serialize)]
struct ListReport<'a> {
    plugins: &'a [PluginInfo],
    skipped: Vec<SkippedRow>,
}

impl<'a> From<&'a ScanReport> for ListReport<'a> {
    fn from(report: &'a ScanReport) -> Self {
        Self {
            plugins: &report.plugins,
            skipped: report
                .skipped
                .iter()
                .map(|s| SkippedRow {
                    name: s.name.clone(),
                    location: s.location.clone(),
                    error: s.error.to_string(),
                })
                .collect(),
        }
    }
}

fn plugin_line(plugin: &PluginInfo) -> String {
    let description = if plugin.manifest.description.is_empty() {
        "No description"
    } else {
        &plugin.manifest.description
    };
    format!(
        "✓ {} v{}    {}",
        plugin.name, plugin.manifest.version, description
    )
}

fn conflict_line(conflict: &ConflictStatus) -> String {
    format!("✗ {}: {}", conflict.hook, conflict.plugins.join(", "))
}

pub fn list(args: ListArgs, config: &HookmanConfig) -> Result<()> {
    let manager = super::load_manager(config)?;
    let report = manager.scan_report(&args.ignore);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ListReport::from(&report))?
        );
        return Ok(());
    }

    if report.plugins.is_empty() && report.skipped.is_empty() {
        println!("No plugins installed");
        println!();
        println!("Plugin directories:");
        for dir in manager.plugin_dirs() {
            println!("  {}", dir.display());
        }
        println!();
        println!("To install a plugin: hookman install <name>.{PACKAGE_EXTENSION}");
        return Ok(());
    }

    for plugin in &report.plugins {
        println!("{}", plugin_line(plugin));
        for hook in &plugin.hooks_implemented {
            println!("    {hook}");
        }
    }
    for skipped in &report.skipped {
        println!("✗ {}    {}", skipped.name, skipped.error);
    }

    Ok(())
}

pub fn status(args: StatusArgs, config: &HookmanConfig) -> Result<()> {
    let manager = super::load_manager(config)?;
    let conflicts = manager.status(&[]);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No conflicts");
        return Ok(());
    }

    println!("Hooks implemented by more than one plugin:");
    for conflict in &conflicts {
        println!("{}", conflict_line(conflict));
    }
    println!();
    println!("Remove or ignore all but one plugin per hook.");

    Ok(())
}

fn destination(args: &InstallArgs, config: &HookmanConfig) -> Result<PathBuf> {
    match &args.dest {
        Some(dest) => Ok(dest.clone()),
        None => config
            .default_destination()
            .cloned()
            .ok_or_else(|| anyhow!("no plugin directories configured")),
    }
}

fn has_package_extension(package: &Path) -> bool {
    package
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PACKAGE_EXTENSION))
}

pub fn install(args: InstallArgs, config: &HookmanConfig) -> Result<()> {
    let manager = super::load_manager(config)?;
    let dest = destination(&args, config)?;

    if !has_package_extension(&args.package) {
        tracing::warn!(
            package = %args.package.display(),
            "Package does not have the .{} extension", PACKAGE_EXTENSION
        );
    }

    let installed = manager.install_plugin(&args.package, &dest)?;
    println!("Installed plugin into {}", installed.display());
    println!("Run 'hookman status' to check for conflicts.");
    Ok(())
}

pub fn remove(args: RemoveArgs, config: &HookmanConfig) -> Result<()> {
    let manager = super::load_manager(config)?;

    if manager.remove_plugin(&args.name)? {
        println!("Removed plugin: {}", args.name);
    } else {
        println!("Plugin '{}' is not installed", args.name);
    }
    Ok(())
}
