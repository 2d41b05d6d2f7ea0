use std::io;
use std::path::Path;
use std::process;

use clap::Parser;

use deltarand::cli::{Cli, Command, ExtractorArgs, ValidateArgs};
use deltarand::config::{self, Config};
use deltarand::error::Error;
use deltarand::{entropy, logging, output, shutdown, stream, validate};

/// Build a Config by layering: defaults → TOML file → CLI overrides.
fn build_config(config_file: Option<&Path>, extractor_args: &ExtractorArgs) -> Config {
    let mut cfg = match config::load_config(config_file) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("{}", e);
            Config::default()
        }
    };

    if let Some(v) = extractor_args.clock {
        cfg.extractor.clock = v;
    }
    if let Some(v) = extractor_args.width {
        cfg.extractor.width = v;
    }

    cfg
}

fn apply_validate_overrides(cfg: &mut Config, args: &ValidateArgs) {
    if let Some(ref v) = args.scales {
        cfg.validator.scales = v.clone();
    }
    if let Some(v) = args.alpha {
        cfg.validator.alpha = v;
    }
    if let Some(v) = args.threads {
        cfg.validator.threads = v;
    }
    cfg.validator.validate();
}

fn run_stream(cli: &Cli, cfg: &Config) -> Result<(), Error> {
    let extractor = entropy::extractor(&cfg.extractor);
    let mut out = output::open_sink(cli.output_file.as_deref())?;
    shutdown::install_signal_handlers();
    stream::run(&extractor, cli.count, cli.format, &mut *out, shutdown::flag())?;
    Ok(())
}

fn run_validate(args: &ValidateArgs, cfg: &Config) -> Result<(), Error> {
    let extractor = entropy::extractor(&cfg.extractor);
    shutdown::install_signal_handlers();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = validate::run(extractor, &cfg.validator, args.judge, shutdown::flag(), &mut out);
    if shutdown::requested() {
        log::warn!(target: "deltarand::validate", "stopped by signal");
    }
    result.map(|_| ())
}

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Command::Validate(args)) => {
            logging::init(&args.log);
            let mut cfg = build_config(args.config_file.as_deref(), &args.extractor);
            apply_validate_overrides(&mut cfg, args);
            run_validate(args, &cfg)
        }
        None => {
            logging::init(&cli.log);
            let cfg = build_config(cli.config_file.as_deref(), &cli.extractor);
            run_stream(&cli, &cfg)
        }
    };

    if let Err(e) = result {
        log::error!("{}", e);
        process::exit(1);
    }
}
