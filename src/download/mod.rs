use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, trace, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use crate::download::version_details::{DownloadInfo, VersionDetails};
use crate::download::versions_manifest::VersionsManifest;

pub(crate) mod versions_manifest;
pub(crate) mod version_details;
#[cfg(test)]
pub(crate) mod stub;

/// Everything that needs the network goes through this.
pub(crate) trait Fetcher {
	/// Gets the body of `url` as text. Any non success status code is an error.
	// note: can't rewrite with async, bc of `+ Send`
	#[allow(clippy::manual_async_fn)]
	fn get_text(&self, url: &str) -> impl Future<Output = Result<String>> + Send;

	/// Streams the body of `url` into `file`, returning the number of bytes written.
	#[allow(clippy::manual_async_fn)]
	fn get_to_file(&self, url: &str, file: &mut File) -> impl Future<Output = Result<u64>> + Send;
}

/// The [Fetcher] doing actual http requests.
#[derive(Debug)]
pub(crate) struct HttpFetcher {
	/// Used for the small json files.
	client: Client,
	/// Used for the jar, this one may have a longer timeout or none at all.
	download_client: Client,
}

impl HttpFetcher {
	pub(crate) fn new(fetch_timeout: Duration, download_timeout: Option<Duration>) -> Result<HttpFetcher> {
		let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

		let client = Client::builder()
			.user_agent(user_agent)
			.timeout(fetch_timeout)
			.build()
			.context("failed to build http client")?;

		let mut download_client = Client::builder()
			.user_agent(user_agent);
		if let Some(timeout) = download_timeout {
			download_client = download_client.timeout(timeout);
		}
		let download_client = download_client.build()
			.context("failed to build http client for downloads")?;

		Ok(HttpFetcher { client, download_client })
	}

	async fn get(client: &Client, url: &str) -> Result<Response> {
		trace!("GET {url:?}");
		let response = client.get(url).send().await
			.with_context(|| anyhow!("failed to send request to {url:?}"))?;

		if response.status().is_success() {
			Ok(response)
		} else {
			bail!("Got a \"{}\" for {url:?}", response.status());
		}
	}
}

impl Fetcher for HttpFetcher {
	#[allow(clippy::manual_async_fn)]
	fn get_text(&self, url: &str) -> impl Future<Output = Result<String>> + Send {
		async move {
			HttpFetcher::get(&self.client, url).await?
				.text().await
				.with_context(|| anyhow!("failed to read body of {url:?}"))
		}
	}

	#[allow(clippy::manual_async_fn)]
	fn get_to_file(&self, url: &str, file: &mut File) -> impl Future<Output = Result<u64>> + Send {
		async move {
			let mut response = HttpFetcher::get(&self.download_client, url).await?;

			let mut written = 0;
			while let Some(chunk) = response.chunk().await.with_context(|| anyhow!("failed to read body of {url:?}"))? {
				file.write_all(&chunk).await?;
				written += chunk.len() as u64;
			}

			Ok(written)
		}
	}
}

async fn fetch_json<T: DeserializeOwned>(fetcher: &impl Fetcher, url: &str) -> Result<T> {
	let body = fetcher.get_text(url).await?;

	serde_json::from_str(&body)
		.with_context(|| anyhow!("failed to parse json from {url:?}"))
}

pub(crate) async fn fetch_manifest(fetcher: &impl Fetcher, url: &str) -> Result<VersionsManifest> {
	fetch_json(fetcher, url).await
		.with_context(|| anyhow!("failed to get version manifest from {url:?}"))
}

pub(crate) async fn fetch_version_details(fetcher: &impl Fetcher, url: &str) -> Result<VersionDetails> {
	fetch_json(fetcher, url).await
		.with_context(|| anyhow!("failed to get version details from {url:?}"))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DownloadOutcome {
	Downloaded { bytes: u64 },
	/// There already was a file, nothing was requested.
	Skipped,
}

/// The file the download is written to before it's renamed to `dest`.
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
	let mut path = OsString::from(dest);
	path.push(".partial");
	PathBuf::from(path)
}

/// Downloads `url` to `dest`, unless there already is a file at `dest`.
///
/// The body is first written to [partial_path] and only renamed to `dest` once it's complete, so `dest` never
/// holds a truncated file. A leftover partial file from an earlier run is overwritten.
///
/// If `expected` is given, the size and sha1 of the download are checked against it before the rename.
pub(crate) async fn download_artifact(fetcher: &impl Fetcher, url: &str, dest: &Path, expected: Option<&DownloadInfo>)
		-> Result<DownloadOutcome> {
	if tokio::fs::metadata(dest).await.is_ok_and(|metadata| metadata.is_file()) {
		debug!("{dest:?} already exists, not downloading it again");
		return Ok(DownloadOutcome::Skipped);
	}

	if let Some(parent) = dest.parent() {
		tokio::fs::create_dir_all(parent).await
			.with_context(|| anyhow!("failed to create directory {parent:?}"))?;
	}

	let partial = partial_path(dest);
	let mut file = File::create(&partial).await
		.with_context(|| anyhow!("failed to create {partial:?}"))?;

	let bytes = fetcher.get_to_file(url, &mut file).await
		.with_context(|| anyhow!("failed to download {url:?} to {partial:?}"))?;
	file.flush().await
		.with_context(|| anyhow!("failed to write {partial:?}"))?;
	drop(file);

	trace!("got {bytes} bytes from {url:?}");

	if let Some(expected) = expected {
		if let Err(e) = verify(&partial, bytes, expected).await {
			if let Err(remove_error) = tokio::fs::remove_file(&partial).await {
				warn!("failed to remove {partial:?}: {remove_error}");
			}
			return Err(e.context(format!("downloaded file from {url:?} is broken")));
		}
	}

	tokio::fs::rename(&partial, dest).await
		.with_context(|| anyhow!("failed to move {partial:?} to {dest:?}"))?;

	Ok(DownloadOutcome::Downloaded { bytes })
}

async fn verify(path: &Path, size: u64, expected: &DownloadInfo) -> Result<()> {
	if size != expected.size {
		bail!("expected {} bytes, got {size}", expected.size);
	}

	let mut file = File::open(path).await
		.with_context(|| anyhow!("failed to open {path:?}"))?;
	let mut hasher = Sha1::new();
	let mut buffer = vec![0u8; 64 * 1024];
	loop {
		let n = file.read(&mut buffer).await
			.with_context(|| anyhow!("failed to read {path:?}"))?;
		if n == 0 {
			break;
		}
		hasher.update(&buffer[..n]);
	}

	let sha1 = hex::encode(hasher.finalize());
	if !sha1.eq_ignore_ascii_case(&expected.sha1) {
		bail!("expected sha1 {}, got {sha1}", expected.sha1);
	}

	trace!("sha1 of {path:?} is {sha1}");
	Ok(())
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use std::path::Path;
	use anyhow::Result;
	use sha1::{Digest, Sha1};
	use crate::download::{download_artifact, fetch_manifest, fetch_version_details, partial_path, DownloadOutcome};
	use crate::download::stub::{Reply, StubFetcher};
	use crate::download::version_details::DownloadInfo;

	const JAR_URL: &str = "https://x/client.jar";
	const JAR: &[u8] = b"PK\x03\x04 not really a jar, but close enough";

	fn jar_info() -> DownloadInfo {
		DownloadInfo {
			sha1: hex::encode(Sha1::digest(JAR)),
			size: JAR.len() as u64,
			url: JAR_URL.to_owned(),
		}
	}

	#[tokio::test]
	async fn manifest_and_details() -> Result<()> {
		let fetcher = StubFetcher::default()
			.with("https://x/manifest.json", Reply::Body(br#"{"latest":{"release":"1.20.2"},"versions":[{"id":"1.20.2","url":"https://x/1.20.2.json"}]}"#.to_vec()))
			.with("https://x/1.20.2.json", Reply::Body(br#"{"id":"1.20.2","assets":"8","downloads":{"client":{"sha1":"abc","size":3,"url":"https://x/client.jar"}}}"#.to_vec()));

		let manifest = fetch_manifest(&fetcher, "https://x/manifest.json").await?;
		assert_eq!(manifest.latest.release, "1.20.2");
		assert_eq!(manifest.versions.len(), 1);

		let details = fetch_version_details(&fetcher, &manifest.versions[0].url).await?;
		assert_eq!(details.downloads.client.url, "https://x/client.jar");
		assert_eq!(details.downloads.client.size, 3);
		Ok(())
	}

	#[tokio::test]
	async fn manifest_bad_status() {
		let fetcher = StubFetcher::default()
			.with("https://x/manifest.json", Reply::Status(404));

		let error = fetch_manifest(&fetcher, "https://x/manifest.json").await.unwrap_err();
		assert!(format!("{error:#}").contains("404"));
	}

	#[tokio::test]
	async fn manifest_bad_json() {
		let fetcher = StubFetcher::default()
			.with("https://x/manifest.json", Reply::Body(b"{\"latest\": ".to_vec()));

		let error = fetch_manifest(&fetcher, "https://x/manifest.json").await.unwrap_err();
		assert!(format!("{error:#}").contains("failed to parse json"));
	}

	#[tokio::test]
	async fn download_creates_directories() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let dest = dir.path().join("versions/1.20.2/1.20.2.jar");
		let fetcher = StubFetcher::default()
			.with(JAR_URL, Reply::Body(JAR.to_vec()));

		let outcome = download_artifact(&fetcher, JAR_URL, &dest, Some(&jar_info())).await?;

		assert_eq!(outcome, DownloadOutcome::Downloaded { bytes: JAR.len() as u64 });
		assert_eq!(std::fs::read(&dest)?, JAR);
		assert!(!partial_path(&dest).exists());
		Ok(())
	}

	#[tokio::test]
	async fn download_skips_existing_file() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let dest = dir.path().join("1.20.2.jar");
		let fetcher = StubFetcher::default()
			.with(JAR_URL, Reply::Body(JAR.to_vec()));

		download_artifact(&fetcher, JAR_URL, &dest, None).await?;
		assert_eq!(fetcher.requests(), [JAR_URL]);

		let outcome = download_artifact(&fetcher, JAR_URL, &dest, None).await?;
		assert_eq!(outcome, DownloadOutcome::Skipped);
		assert_eq!(fetcher.requests(), [JAR_URL]);
		Ok(())
	}

	#[tokio::test]
	async fn download_skips_existing_file_without_checking_it() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let dest = dir.path().join("1.20.2.jar");
		std::fs::write(&dest, b"stale")?;
		let fetcher = StubFetcher::default();

		let outcome = download_artifact(&fetcher, JAR_URL, &dest, Some(&jar_info())).await?;

		assert_eq!(outcome, DownloadOutcome::Skipped);
		assert_eq!(std::fs::read(&dest)?, b"stale");
		assert!(fetcher.requests().is_empty());
		Ok(())
	}

	#[tokio::test]
	async fn interrupted_download_leaves_no_file() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let dest = dir.path().join("1.20.2.jar");
		let fetcher = StubFetcher::default()
			.with(JAR_URL, Reply::CutOff(JAR[..10].to_vec()));

		assert!(download_artifact(&fetcher, JAR_URL, &dest, None).await.is_err());

		assert!(!dest.exists());
		assert_eq!(std::fs::read(partial_path(&dest))?, &JAR[..10]);
		Ok(())
	}

	#[tokio::test]
	async fn bad_status_leaves_partial_file() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let dest = dir.path().join("1.20.2.jar");
		let fetcher = StubFetcher::default()
			.with(JAR_URL, Reply::Status(503));

		let error = download_artifact(&fetcher, JAR_URL, &dest, None).await.unwrap_err();

		assert!(format!("{error:#}").contains("503"));
		assert!(!dest.exists());
		assert!(partial_path(&dest).exists());
		Ok(())
	}

	#[tokio::test]
	async fn stale_partial_file_is_overwritten() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let dest = dir.path().join("1.20.2.jar");
		std::fs::write(partial_path(&dest), b"left over from a crash, and longer than the jar itself is")?;
		let fetcher = StubFetcher::default()
			.with(JAR_URL, Reply::Body(JAR.to_vec()));

		download_artifact(&fetcher, JAR_URL, &dest, Some(&jar_info())).await?;

		assert_eq!(std::fs::read(&dest)?, JAR);
		Ok(())
	}

	#[tokio::test]
	async fn sha1_mismatch() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let dest = dir.path().join("1.20.2.jar");
		let fetcher = StubFetcher::default()
			.with(JAR_URL, Reply::Body(JAR.to_vec()));
		let expected = DownloadInfo {
			sha1: "0000000000000000000000000000000000000000".to_owned(),
			..jar_info()
		};

		let error = download_artifact(&fetcher, JAR_URL, &dest, Some(&expected)).await.unwrap_err();

		assert!(format!("{error:#}").contains("expected sha1"));
		assert!(!dest.exists());
		assert!(!partial_path(&dest).exists());
		Ok(())
	}

	#[tokio::test]
	async fn size_mismatch() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let dest = dir.path().join("1.20.2.jar");
		let fetcher = StubFetcher::default()
			.with(JAR_URL, Reply::Body(JAR[..4].to_vec()));

		let error = download_artifact(&fetcher, JAR_URL, &dest, Some(&jar_info())).await.unwrap_err();

		assert!(format!("{error:#}").contains("bytes"));
		assert!(!dest.exists());
		Ok(())
	}

	#[test]
	fn partial_path_appends_suffix() {
		assert_eq!(
			partial_path(Path::new("/games/versions/1.20.2/1.20.2.jar")),
			Path::new("/games/versions/1.20.2/1.20.2.jar.partial"),
		);
	}
}
