use serde::{Deserialize, Serialize};

/// The per version json, as linked from the [`VersionsManifest`](super::versions_manifest::VersionsManifest).
///
/// Only the parts needed for getting the client jar are read, everything else in there is ignored.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct VersionDetails {
	pub(crate) id: String,
	#[serde(default)]
	pub(crate) assets: String,
	pub(crate) downloads: DownloadsInfo,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct DownloadsInfo {
	pub(crate) client: DownloadInfo,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct DownloadInfo {
	pub(crate) sha1: String,
	pub(crate) size: u64,
	pub(crate) url: String,
}
