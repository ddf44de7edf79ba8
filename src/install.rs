use std::path::PathBuf;
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use crate::config::Config;
use crate::download::{download_artifact, fetch_manifest, fetch_version_details, DownloadOutcome, Fetcher};

/// Where a version ended up.
#[derive(Debug)]
pub(crate) struct Installed {
	pub(crate) id: String,
	pub(crate) version_dir: PathBuf,
	pub(crate) client_jar: PathBuf,
	pub(crate) outcome: DownloadOutcome,
}

/// Gets the client jar of the configured version into the game directory.
///
/// This goes manifest, version json, jar, one after the other. Any error stops it.
pub(crate) async fn install(config: &Config, fetcher: &impl Fetcher) -> Result<Installed> {
	info!("Fetching version manifest...");
	let manifest = fetch_manifest(fetcher, &config.manifest_url).await?;

	if config.version.is_none() {
		info!("No version specified; using latest release: {}", manifest.latest.release);
	}
	let version = manifest.resolve(config.version.as_deref())?;

	info!("Fetching version JSON for {}", version.id);
	let details = fetch_version_details(fetcher, &version.url).await?;
	debug!("version {:?} uses assets {:?}, client jar has sha1 {} and {} bytes",
		details.id, details.assets, details.downloads.client.sha1, details.downloads.client.size);

	let version_dir = config.version_dir(&version.id);
	let client_jar = config.client_jar(&version.id);

	info!("Downloading client jar to {}", client_jar.display());
	let client = &details.downloads.client;
	let outcome = download_artifact(fetcher, &client.url, &client_jar, config.verify.then_some(client)).await
		.with_context(|| anyhow!("failed to download client jar for {}", version.id))?;

	match outcome {
		DownloadOutcome::Downloaded { bytes } => info!("Downloaded {bytes} bytes."),
		DownloadOutcome::Skipped => info!("Already downloaded."),
	}

	Ok(Installed {
		id: version.id.clone(),
		version_dir,
		client_jar,
		outcome,
	})
}
