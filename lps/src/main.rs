use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;
use lps::config::Settings;
use lps::signature::public_key_address;
use secp256k1::SECP256K1;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogOutputFormat {
    Json,
    Pretty,
}

/// Command line arguments for the liquidity provider.
#[derive(Debug, Parser)]
#[clap(name = "Flyover liquidity provider")]
struct LpsArgs {
    /// Optional path to the configuration file. If not provided, it is
    /// expected that all parameters are provided via environment variables.
    #[clap(short = 'c', long, required = false)]
    config: Option<PathBuf>,

    #[clap(short = 'o', long = "output-format", default_value = "pretty")]
    output_format: Option<LogOutputFormat>,
}

#[tokio::main]
#[tracing::instrument(name = "lps")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = LpsArgs::parse();

    let pretty = matches!(args.output_format, Some(LogOutputFormat::Pretty));
    lps::logging::setup_logging("info,lps=debug", pretty);

    tracing::info!(version = lps::VERSION, "starting the liquidity provider");

    let settings = Settings::new(args.config)?;
    let provider = public_key_address(&settings.lps.private_key.public_key(SECP256K1));
    let pegin = &settings.pegin;

    tracing::info!(
        %provider,
        network = ?settings.lps.network,
        chain_id = settings.lps.chain_id,
        btc_address = %settings.lps.btc_address,
        fee_collector = %settings.lps.fee_collector_address,
        "loaded provider identity"
    );
    tracing::info!(
        time_for_deposit = pegin.time_for_deposit,
        call_time = pegin.call_time,
        %pegin.penalty_fee,
        %pegin.fixed_fee,
        fee_percentage = pegin.fee_percentage,
        %pegin.min_value,
        %pegin.max_value,
        max_confirmations = settings.general.btc_confirmations.max(),
        "effective peg-in configuration"
    );

    Ok(())
}
