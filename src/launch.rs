use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use anyhow::{anyhow, bail, Context, Result};
use log::{error, info, trace, warn};

/// Starts a downloaded client jar.
pub(crate) trait Launcher {
	/// Runs the jar, blocking until it exits. Output goes to our stdout and stderr.
	fn launch(&self, jar: &Path) -> Result<ExitStatus>;
}

#[derive(Debug)]
pub(crate) struct JavaLauncher {
	java_command: OsString,
}

impl Default for JavaLauncher {
	fn default() -> Self {
		JavaLauncher { java_command: "java".into() }
	}
}

impl JavaLauncher {
	pub(crate) fn new(java_command: &(impl AsRef<OsStr> + ?Sized)) -> JavaLauncher {
		JavaLauncher { java_command: OsString::from(java_command) }
	}

	/// Uses `$JAVA_HOME/bin/java` if `JAVA_HOME` is set, and `java` from the `PATH` otherwise.
	pub(crate) fn locate() -> JavaLauncher {
		const JAVA_HOME: &str = "JAVA_HOME";

		match std::env::var_os(JAVA_HOME) {
			Some(java_home) if !java_home.is_empty() => {
				// PathBuf takes care of a slash at the end
				let java_command = PathBuf::from(java_home).join("bin").join("java");

				trace!("located java via env var as {java_command:?}");

				JavaLauncher::new(&java_command)
			},
			_ => JavaLauncher::default(),
		}
	}

	/// Gets the major version by running `java -version`.
	pub(crate) fn java_version(&self) -> Result<u16> {
		let mut command = Command::new(&self.java_command);
		command.arg("-version");

		trace!("running {command:?} to get java version");
		let output = command.output()
			.with_context(|| anyhow!("failed to run {command:?}"))?;

		// `java -version` writes to stderr
		let stderr = String::from_utf8_lossy(&output.stderr);

		parse_java_version(&stderr)
			.with_context(|| anyhow!("failed to get java version from {output:?}"))
	}
}

impl Launcher for JavaLauncher {
	fn launch(&self, jar: &Path) -> Result<ExitStatus> {
		let mut command = Command::new(&self.java_command);
		command.arg("-jar").arg(jar);

		trace!("run: {command:?}");

		command.status()
			.with_context(|| anyhow!("failed to start {:?}, is java installed?", self.java_command))
	}
}

/// Parses the major version out of what `java -version` writes to stderr.
///
/// The line looked at is the first one having the version in quotes, like
/// ```text
/// openjdk version "1.8.0_412"
/// openjdk version "17.0.11" 2024-04-16
/// java version "22" 2024-03-19
/// ```
/// Before java 9 the versions started with `1.`, so the `1.8.0_412` above is java 8. The others are
/// java 17 and 22.
fn parse_java_version(stderr: &str) -> Result<u16> {
	// a `JAVA_TOOL_OPTIONS` makes java print a "Picked up ..." line first
	let line = stderr.lines()
		.find(|line| line.contains(" version \""))
		.with_context(|| anyhow!("expected a line containing the version, got {stderr:?}"))?;

	let version = line.split('"').nth(1)
		.with_context(|| anyhow!("expected the version to be quoted in {line:?}"))?;

	let mut parts = version.split(['.', '_', '-', '+']);
	let major = match parts.next() {
		Some("1") => parts.next(),
		first => first,
	}.with_context(|| anyhow!("expected a major version in {version:?}"))?;

	major.parse()
		.with_context(|| anyhow!("failed to parse {major:?} of java version {version:?}"))
}

/// Runs the client jar, for seeing if the download worked.
///
/// This isn't a real launch: the libraries, natives and account needed for a full game aren't set up, so
/// most versions won't get far.
pub(crate) fn run_client(launcher: &impl Launcher, jar: &Path) -> Result<()> {
	info!("Attempting to run the jar offline (minimal test). You must have Java installed and on PATH.");

	let result = launcher.launch(jar)
		.and_then(|status| {
			if status.success() {
				trace!("java exited with {status:?}");
				Ok(())
			} else {
				bail!("java exited with {status}")
			}
		});

	if result.is_err() {
		error!("For a real launcher you must build the full classpath (libraries), extract natives, and pass proper \
			args like --username, --version, --gameDir, --assetsDir, --accessToken, etc.");
	}

	result.with_context(|| anyhow!("failed to run {jar:?}"))
}

/// Logs the java version, if it can be found.
pub(crate) fn log_java_version(launcher: &JavaLauncher) {
	match launcher.java_version() {
		Ok(version) => info!("Using java {version}"),
		Err(e) => warn!("couldn't determine the java version: {e:#}"),
	}
}
