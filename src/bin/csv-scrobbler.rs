use clap::Parser;
use csv_scrobbler::config::{exit_code, parse_error_exit_code, EXIT_SUCCESS};
use csv_scrobbler::{
    parse_records, read_source, Cli, Config, ConsoleReporter, LastFmApiClientImpl, Scrobbler,
    ScrobbleSummary,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(parse_error_exit_code(&e));
        }
    };

    init_logging(args.debug);
    let debug = args.debug;

    let outcome = match Config::from_cli(args) {
        Ok(config) => {
            log::debug!("Starting with {config:?}");
            run(&config).await
        }
        Err(e) => Err(e),
    };

    // Debug mode surfaces the full error (including the raw payload)
    let code = exit_code(outcome, debug)?;
    if code != EXIT_SUCCESS {
        std::process::exit(code);
    }
    Ok(())
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "warn,csv_scrobbler=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

async fn run(config: &Config) -> csv_scrobbler::Result<ScrobbleSummary> {
    let text = read_source(config.input.as_deref()).await?;
    let records = parse_records(&text, config.delimiter, config.has_header)?;

    if records.is_empty() {
        println!("📭 No rows to scrobble");
    } else if config.dry_run {
        println!("🔍 Dry run: {} rows", records.len());
    } else {
        println!("🎵 Scrobbling {} rows...", records.len());
    }

    let http_client = http_client::native::NativeClient::new();
    let api = LastFmApiClientImpl::new(
        Box::new(http_client),
        config.api_key.clone(),
        config.api_secret.clone(),
    );

    let mut reporter = ConsoleReporter;
    let summary = Scrobbler::new(&api, config, &mut reporter)
        .run(&records)
        .await?;
    Ok(summary)
}
