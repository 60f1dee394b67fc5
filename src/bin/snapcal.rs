use anyhow::Result;
use chrono::Utc;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use snapcal::cli;
use snapcal::config::Config;
use snapcal::context::StandardContext;
use std::env;

fn init_logging(config: &Config) {
    let level = env::var("SNAPCAL_LOG")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| config.log_level_filter());
    let log_config = ConfigBuilder::new().set_time_level(log::LevelFilter::Off).build();
    // Logs go to stderr so JSON/ICS output on stdout stays clean.
    let _ = TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let cli_args = cli::parse_args(&args)?;

    let ctx = StandardContext::new(cli_args.root.clone());
    let config = Config::load_or_default(&ctx)?;
    init_logging(&config);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli::run(&cli_args, &ctx, &config, Utc::now(), &mut out)
}
