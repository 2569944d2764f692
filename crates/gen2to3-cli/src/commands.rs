use anyhow::{Context, Result};
use tracing::info;

use gen2to3_cli::pipeline::{
    ConvertRequest, ConvertResult, load_catalog, resolve_instrument, run_convert, translate_one,
};
use gen2to3_cli::render::{catalog_json, translation_json};
use gen2to3_output::TransferMode;

use crate::cli::{ConvertArgs, OutputFormatArg, RulesArgs, TransferArg, TranslateArgs};
use crate::summary::{print_convert_summary, print_rules, print_translation};

pub fn run_convert_command(args: &ConvertArgs) -> Result<ConvertResult> {
    let request = ConvertRequest {
        source: args.source.clone(),
        dest: args.dest.clone(),
        collection: args.collection.clone(),
        config: args.catalog.config.clone(),
        instrument: args.catalog.instrument.clone(),
        transfer: match args.transfer {
            TransferArg::None => TransferMode::None,
            TransferArg::Copy => TransferMode::Copy,
            TransferArg::Hardlink => TransferMode::Hardlink,
        },
        jobs: args.jobs,
        dry_run: args.dry_run,
    };
    let result = run_convert(&request)?;
    print_convert_summary(&result);
    Ok(result)
}

/// Returns whether the record translated.
pub fn run_translate(args: &TranslateArgs) -> Result<bool> {
    let catalog = load_catalog(&args.catalog.config)?;
    let instrument = resolve_instrument(args.catalog.instrument.as_deref(), &catalog)?;
    let outcome = translate_one(&catalog, &instrument, &args.dataset_type, &args.pairs)?;
    match args.format {
        OutputFormatArg::Text => print_translation(&outcome, args.explain),
        OutputFormatArg::Json => {
            let json = serde_json::to_string_pretty(&translation_json(&outcome))
                .context("encode translation")?;
            println!("{json}");
        }
    }
    if let Err(error) = &outcome.result {
        info!(kind = error.kind().as_str(), "translation failed");
    }
    Ok(outcome.result.is_ok())
}

pub fn run_rules(args: &RulesArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog.config)?;
    match args.format {
        OutputFormatArg::Text => print_rules(&catalog),
        OutputFormatArg::Json => {
            let json =
                serde_json::to_string_pretty(&catalog_json(&catalog)).context("encode catalog")?;
            println!("{json}");
        }
    }
    Ok(())
}
