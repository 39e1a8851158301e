use std::{future::Future, time::Duration};

use log::trace;

use crate::error::Error;

/// Network collaborator: fetches one AssistNow batch.
pub trait Downloader: Send + Sync + 'static {
    /// Downloads `url`, failing with [Error::Oversize] when the response
    /// exceeds `max_size` bytes.
    fn download(
        &self,
        url: &str,
        max_size: usize,
    ) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

/// [Downloader] over HTTPS
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, max_size: usize) -> Result<Vec<u8>, Error> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;

        if let Some(length) = response.content_length() {
            if length > max_size as u64 {
                return Err(Error::Oversize { max_size });
            }
        }

        let mut buffer = Vec::with_capacity(
            response
                .content_length()
                .map(|len| len as usize)
                .unwrap_or(4096),
        );

        while let Some(chunk) = response.chunk().await? {
            if buffer.len() + chunk.len() > max_size {
                return Err(Error::Oversize { max_size });
            }
            buffer.extend_from_slice(&chunk);
        }

        trace!("downloaded {} bytes", buffer.len());
        Ok(buffer)
    }
}
