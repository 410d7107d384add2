use anyhow::{Context, Result};
use droplet_lifecycle::DropletProvider;
use droplet_models::{Target, TargetMetadata};
use std::path::Path;

use crate::config::Config;

pub fn load_target(path: &Path) -> Result<Target> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read target file {}", path.display()))?;
    parse_target(&raw).with_context(|| format!("Invalid target file {}", path.display()))
}

fn parse_target(raw: &str) -> Result<Target> {
    let target: Target = serde_json::from_str(raw)?;
    if target.id.is_empty() || target.name.is_empty() {
        anyhow::bail!("target id and name must be non-empty");
    }
    Ok(target)
}

fn build_provider(config: &Config) -> Result<DropletProvider> {
    DropletProvider::digitalocean(config.provider_settings(), &config.api_base_url)
        .context("Failed to build provider")
}

pub async fn run_create(config: &Config, path: &Path) -> Result<()> {
    let target = load_target(path)?;
    let provider = build_provider(config)?;

    provider.create(&target).await?;

    println!("✓ Target {} created", target.name);
    Ok(())
}

pub async fn run_start(config: &Config, path: &Path) -> Result<()> {
    let target = load_target(path)?;
    let provider = build_provider(config)?;

    provider.start(&target).await?;

    println!("✓ Target {} started", target.name);
    Ok(())
}

pub async fn run_stop(config: &Config, path: &Path) -> Result<()> {
    let target = load_target(path)?;
    let provider = build_provider(config)?;

    provider.stop(&target).await?;

    println!("✓ Target {} stopped", target.name);
    Ok(())
}

pub async fn run_destroy(config: &Config, path: &Path) -> Result<()> {
    let target = load_target(path)?;
    let provider = build_provider(config)?;

    provider.destroy(&target).await?;

    println!("✓ Target {} destroyed", target.name);
    Ok(())
}

pub async fn run_info(config: &Config, path: &Path, output: &str) -> Result<()> {
    let target = load_target(path)?;
    let provider = build_provider(config)?;

    if output == "json" {
        println!("{}", provider.info_json(&target).await?);
    } else {
        print_table(&provider.info(&target).await?);
    }
    Ok(())
}

fn print_table(metadata: &TargetMetadata) {
    println!("Target: {}", metadata.resource_name);
    println!("{}", "=".repeat(60));
    println!("  State:       {:?}", metadata.state);
    println!("  Status:      {}", metadata.status);
    println!(
        "  Droplet ID:  {}",
        metadata
            .droplet_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Public IP:   {}", metadata.public_ip.as_deref().unwrap_or("-"));
    println!("  Region:      {}", metadata.region.as_deref().unwrap_or("-"));
    if metadata.volume_ids.is_empty() {
        println!("  Volumes:     -");
    } else {
        println!("  Volumes:     {}", metadata.volume_ids.join(", "));
    }
}
