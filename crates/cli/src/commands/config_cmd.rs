//! `handoff config`: Configuration inspection.

use handoff_config::EngineConfig;
use std::path::Path;

pub fn show(config: &EngineConfig) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

pub fn defaults() {
    println!("{}", EngineConfig::default_toml());
}

pub fn path(explicit: Option<&Path>) {
    match explicit {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", EngineConfig::config_dir().join("config.toml").display()),
    }
}
