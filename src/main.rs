use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, Level, LevelFilter};
use crate::config::{Cli, Config};
use crate::download::HttpFetcher;
use crate::install::install;
use crate::launch::{log_java_version, run_client, JavaLauncher};

mod config;
mod download;
mod install;
mod launch;

/// Progress (info and below) goes to stdout, problems go to stderr.
fn setup_logger(level: LevelFilter) -> Result<()> {
	let stdout = fern::Dispatch::new()
		.filter(|metadata| metadata.level() > Level::Warn)
		.format(|out, message, record| {
			if record.level() == Level::Info {
				out.finish(format_args!("{message}"))
			} else {
				out.finish(format_args!("[{} {}] {message}", record.level(), record.target()))
			}
		})
		.chain(std::io::stdout());

	let stderr = fern::Dispatch::new()
		.level(LevelFilter::Warn)
		.format(|out, message, record| out.finish(format_args!("[{}] {message}", record.level())))
		.chain(std::io::stderr());

	fern::Dispatch::new()
		.level(level)
		// these are too chatty even for trace
		.level_for("hyper", LevelFilter::Info)
		.level_for("reqwest", LevelFilter::Info)
		.chain(stdout)
		.chain(stderr)
		.apply()
		.context("failed to set up logging")
}

fn run(config: Config) -> Result<()> {
	debug!("{config:?}");

	let fetcher = HttpFetcher::new(config.fetch_timeout, config.download_timeout)?;

	// one step after the other, there's nothing to run in parallel
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.context("failed to start the async runtime")?;

	let installed = runtime.block_on(install(&config, &fetcher))?;
	debug!("{:?} for {} at {:?}", installed.outcome, installed.id, installed.client_jar);

	if config.run_offline {
		debug!("username {:?} isn't passed on to the game", config.username);

		let launcher = JavaLauncher::locate();
		log_java_version(&launcher);
		run_client(&launcher, &installed.client_jar)?;
	}

	info!("Done. Version installed to {}", installed.version_dir.display());
	info!("Next steps: assemble libraries, extract natives and implement Microsoft/Xbox OAuth for online play.");

	Ok(())
}

fn main() {
	let cli = Cli::parse();

	if let Err(e) = setup_logger(cli.log_level()) {
		eprintln!("{e:#}");
		std::process::exit(1);
	}

	let result = Config::from_cli(cli, std::env::var_os("HOME"))
		.and_then(run);

	if let Err(e) = result {
		error!("{e:#}");
		std::process::exit(1);
	}
}
