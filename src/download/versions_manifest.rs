use std::error::Error;
use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// The top level `version_manifest.json`, listing all known versions.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct VersionsManifest {
	pub(crate) latest: Latest,
	pub(crate) versions: Vec<VersionInfo>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct Latest {
	pub(crate) release: String,
	// not needed for anything, some mirrors leave it out
	#[serde(default)]
	pub(crate) snapshot: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct VersionInfo {
	pub(crate) id: String,
	/// Where to get the [`VersionDetails`](super::version_details::VersionDetails) from.
	pub(crate) url: String,
}

impl VersionsManifest {
	/// Looks up the version with the given id.
	///
	/// `None` or an empty id select the latest release. If the manifest lists an id more than once, the
	/// first entry wins.
	pub(crate) fn resolve(&self, requested: Option<&str>) -> Result<&VersionInfo, VersionNotFound> {
		let id = requested
			.filter(|id| !id.is_empty())
			.unwrap_or(&self.latest.release);

		self.versions.iter()
			.find(|it| it.id == id)
			.ok_or_else(|| VersionNotFound { id: id.to_owned() })
	}
}

/// The requested version id isn't listed in the manifest.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VersionNotFound {
	pub(crate) id: String,
}

impl Display for VersionNotFound {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "version {:?} not found in manifest", self.id)
	}
}

impl Error for VersionNotFound {}
