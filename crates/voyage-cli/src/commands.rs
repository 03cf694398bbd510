use anyhow::Result;
use tracing::info;

use voyage_cli::pipeline::{
    ConfigOverrides, TransferRequest, TransferRun, active_mapping, load_config, run_transfer,
};

use crate::cli::{MappingArgs, TransferArgs};
use crate::summary::print_mapping;

pub fn run_transfer_command(args: &TransferArgs) -> Result<TransferRun> {
    let overrides = ConfigOverrides {
        target_sheet: args.sheet.clone(),
        source_sheet: args.source_sheet.clone(),
    };
    let config = load_config(args.config.as_deref(), &overrides)?;
    info!(
        target_sheet = %config.target_sheet,
        mapped_columns = active_mapping(&config)?.len(),
        "Loaded configuration"
    );
    let request = TransferRequest {
        source: args.source.clone(),
        target: args.target.clone(),
        output: args.output.clone(),
        config,
        dry_run: args.dry_run,
    };
    run_transfer(&request)
}

pub fn run_mapping(args: &MappingArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), &ConfigOverrides::default())?;
    let mapping = active_mapping(&config)?;
    print_mapping(&mapping);
    Ok(())
}
