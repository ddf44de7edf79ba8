use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use anyhow::{bail, Context, Result};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use crate::download::Fetcher;

pub(crate) enum Reply {
	Body(Vec<u8>),
	Status(u16),
	/// Sends these bytes, and then the connection breaks.
	CutOff(Vec<u8>),
}

/// A [Fetcher] answering from a map, and remembering what was asked for.
#[derive(Default)]
pub(crate) struct StubFetcher {
	replies: HashMap<String, Reply>,
	requests: Mutex<Vec<String>>,
}

impl StubFetcher {
	pub(crate) fn with(mut self, url: &str, reply: Reply) -> StubFetcher {
		self.replies.insert(url.to_owned(), reply);
		self
	}

	pub(crate) fn requests(&self) -> Vec<String> {
		self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
	}

	fn reply(&self, url: &str) -> Result<&Reply> {
		if let Ok(mut requests) = self.requests.lock() {
			requests.push(url.to_owned());
		}
		self.replies.get(url)
			.with_context(|| format!("Got a \"404 Not Found\" for {url:?}"))
	}
}

impl Fetcher for StubFetcher {
	#[allow(clippy::manual_async_fn)]
	fn get_text(&self, url: &str) -> impl Future<Output = Result<String>> + Send {
		async move {
			match self.reply(url)? {
				Reply::Body(body) => Ok(String::from_utf8(body.clone())?),
				Reply::Status(status) => bail!("Got a \"{status}\" for {url:?}"),
				Reply::CutOff(_) => bail!("connection reset while reading {url:?}"),
			}
		}
	}

	#[allow(clippy::manual_async_fn)]
	fn get_to_file(&self, url: &str, file: &mut File) -> impl Future<Output = Result<u64>> + Send {
		async move {
			match self.reply(url)? {
				Reply::Body(body) => {
					file.write_all(body).await?;
					Ok(body.len() as u64)
				},
				Reply::Status(status) => bail!("Got a \"{status}\" for {url:?}"),
				Reply::CutOff(body) => {
					file.write_all(body).await?;
					file.flush().await?;
					bail!("connection reset while reading {url:?}")
				},
			}
		}
	}
}
