//! static-pages - pre-render page components to static HTML.

use anyhow::{Context, Result, bail};
use clap::Parser;
use static_pages::{
    build::build,
    cli::{Cli, Commands},
    config::StaticPagesConfig,
    log,
};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Externals are resolved from the working directory's package.json
    std::env::set_current_dir(config.get_root()).with_context(|| {
        format!("Failed to enter project root `{}`", config.get_root().display())
    })?;

    match &cli.command {
        Commands::Build { .. } => {
            if let Err(e) = build(&config) {
                log!("error"; "{e:#}");
                return Err(e);
            }
            Ok(())
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<StaticPagesConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        StaticPagesConfig::from_path(&config_path)?
    } else if cli.config != Path::new(static_pages::config::CONFIG_FILE) {
        bail!("Config file `{}` not found.", config_path.display());
    } else {
        StaticPagesConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
