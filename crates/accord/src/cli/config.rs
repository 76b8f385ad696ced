//! `accord config`: show the effective configuration and paths.

use crate::cli::context::Context;
use crate::cli::output::print_json;
use accord::config::{accord_home, default_records_dir};
use accord_protocol::{StoreBackend, StoreConfig};
use anyhow::Result;

#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn credentials_summary(store: &StoreConfig) -> &'static str {
    match (store.backend, &store.access_token, &store.credentials) {
        (StoreBackend::Memory, _, _) => "not needed",
        (_, Some(_), _) => "access token",
        (_, None, Some(_)) => "service account",
        (_, None, None) => "missing",
    }
}

pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    let home = accord_home();
    let records = default_records_dir();
    let missing: Vec<&str> = config.folders.missing().iter().map(|s| s.as_str()).collect();

    if args.json {
        return print_json(&serde_json::json!({
            "home": home.to_string_lossy(),
            "configPath": ctx.config_path.to_string_lossy(),
            "configExists": ctx.config_path.exists(),
            "records": records.to_string_lossy(),
            "credentials": credentials_summary(&config.store),
            "missingFolders": missing,
            "config": config,
        }));
    }

    println!("ACCORD CONFIGURATION");
    println!("====================");
    println!();
    println!("Home:        {}", home.display());
    println!(
        "Config:      {} ({})",
        ctx.config_path.display(),
        if ctx.config_path.exists() { "exists" } else { "defaults" }
    );
    println!("Records:     {}", records.display());
    println!();
    println!("Templates:   {}", config.templates.dir.display());
    println!("Store:       {} ({})", config.store.backend, config.store.api_base);
    println!("Credentials: {}", credentials_summary(&config.store));
    println!("Native conversion: {}", if config.store.prefer_native_conversion { "yes" } else { "no" });
    if let Some(owner) = &config.store.default_owner {
        println!("Folder owner: {}", owner);
    }
    println!();
    println!("Lifecycle folders:");
    for state in accord_protocol::LifecycleState::ALL {
        println!("  {:<9} {}", state.as_str(), config.folders.get(state).unwrap_or("(not set)"));
    }
    if !missing.is_empty() {
        println!();
        println!("Missing folders: {}", missing.join(", "));
    }
    Ok(())
}
