use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{bail, Result};
use clap::{ArgAction, Parser};
use log::LevelFilter;

pub(crate) const VERSION_MANIFEST_URL: &str = "https://launchermeta.mojang.com/mc/game/version_manifest.json";

/// Downloads a Minecraft client jar into a game directory.
#[derive(Debug, Parser)]
#[command(name = "mcfetch")]
pub(crate) struct Cli {
	/// Minecraft version id to install (e.g. 1.20.2). If empty, uses the latest release.
	#[arg(long = "version", value_name = "ID", default_value = "")]
	pub(crate) version_id: String,
	/// After the download, attempt to run the client jar (offline test).
	#[arg(long)]
	pub(crate) run_offline: bool,
	/// Minecraft game directory [default: $HOME/.minecraft]
	#[arg(long, value_name = "DIR")]
	pub(crate) mcdir: Option<PathBuf>,
	/// Offline username when running. Currently unused.
	#[arg(long, default_value = "Player")]
	pub(crate) username: String,
	/// Where to get the version manifest from.
	#[arg(long, value_name = "URL", default_value = VERSION_MANIFEST_URL)]
	pub(crate) manifest_url: String,
	/// Timeout in seconds for getting the version manifest and version json.
	#[arg(long, value_name = "SECS", default_value_t = 20)]
	pub(crate) fetch_timeout: u64,
	/// Timeout in seconds for downloading the client jar, 0 for none.
	#[arg(long, value_name = "SECS", default_value_t = 600)]
	pub(crate) download_timeout: u64,
	/// Don't check the size and sha1 of the downloaded jar.
	#[arg(long)]
	pub(crate) no_verify: bool,
	/// Print more. Can be given twice.
	#[arg(short, long, action = ArgAction::Count)]
	pub(crate) verbose: u8,
}

impl Cli {
	pub(crate) fn log_level(&self) -> LevelFilter {
		match self.verbose {
			0 => LevelFilter::Info,
			1 => LevelFilter::Debug,
			_ => LevelFilter::Trace,
		}
	}
}

/// All settings for one run, read once from the command line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Config {
	pub(crate) manifest_url: String,
	pub(crate) game_dir: PathBuf,
	/// `None` means the latest release.
	pub(crate) version: Option<String>,
	pub(crate) run_offline: bool,
	pub(crate) username: String,
	pub(crate) fetch_timeout: Duration,
	/// `None` means no timeout.
	pub(crate) download_timeout: Option<Duration>,
	pub(crate) verify: bool,
}

impl Config {
	/// `home` is the value of `$HOME`, used for the default game directory.
	pub(crate) fn from_cli(cli: Cli, home: Option<OsString>) -> Result<Config> {
		let game_dir = match (cli.mcdir, home) {
			(Some(mcdir), _) => mcdir,
			(None, Some(home)) if !home.is_empty() => Path::new(&home).join(".minecraft"),
			(None, _) => bail!("cannot find a default game directory since $HOME isn't set, use --mcdir"),
		};

		Ok(Config {
			manifest_url: cli.manifest_url,
			game_dir,
			version: Some(cli.version_id).filter(|id| !id.is_empty()),
			run_offline: cli.run_offline,
			username: cli.username,
			fetch_timeout: Duration::from_secs(cli.fetch_timeout),
			download_timeout: Some(cli.download_timeout)
				.filter(|&secs| secs != 0)
				.map(Duration::from_secs),
			verify: !cli.no_verify,
		})
	}

	/// `<game dir>/versions/<id>`
	pub(crate) fn version_dir(&self, id: &str) -> PathBuf {
		self.game_dir.join("versions").join(id)
	}

	/// `<game dir>/versions/<id>/<id>.jar`
	pub(crate) fn client_jar(&self, id: &str) -> PathBuf {
		self.version_dir(id).join(format!("{id}.jar"))
	}
}
