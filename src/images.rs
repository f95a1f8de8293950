use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use reqwest::Client;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::ImageSettings;
use crate::record::ImageSlot;

const THUMBNAIL_SUFFIX: &str = "-2.jpg";
const FULL_SIZE_SUFFIX: &str = "-1.jpg";

/// Thumbnail URL -> full-size URL.
pub fn full_size_url(url: &str) -> String {
    url.replace(THUMBNAIL_SUFFIX, FULL_SIZE_SUFFIX)
}

/// Last path segment of `url`, without query or fragment.
pub fn file_name(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .map(str::to_string)
}

/// Where a download is written before it is renamed into place, so an interrupted run
/// never leaves a truncated file under the final name.
fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

/// Downloads listing images into a per-listing directory, skipping files already there.
pub struct ImageFetcher {
    client: Client,
    settings: ImageSettings,
}

impl ImageFetcher {
    pub fn new(client: Client, settings: ImageSettings) -> Self {
        Self { client, settings }
    }

    /// One slot per source URL, in order. A failed download leaves `local_path` empty
    /// and does not stop the rest.
    pub async fn download_all(&self, dir: &Path, urls: &[String]) -> Vec<ImageSlot> {
        if let Err(e) = fs::create_dir_all(dir).await {
            warn!(dir = %dir.display(), error = %e, "cannot create image directory");
            return urls
                .iter()
                .map(|url| ImageSlot {
                    local_path: None,
                    source_url: url.clone(),
                })
                .collect();
        }

        let mut slots = Vec::with_capacity(urls.len());
        let mut downloaded = 0usize;
        for (index, url) in urls.iter().enumerate() {
            let full_url = full_size_url(url);
            let name = file_name(&full_url).unwrap_or_else(|| format!("image_{}.jpg", index + 1));
            let target = dir.join(name);

            let local_path = if fs::try_exists(&target).await.unwrap_or(false) {
                debug!(path = %target.display(), "image already on disk");
                Some(target)
            } else {
                let result = self.download(&full_url, &target).await;
                tokio::time::sleep(self.settings.delay_for(index)).await;
                match result {
                    Ok(()) => {
                        downloaded += 1;
                        Some(target)
                    }
                    Err(e) => {
                        warn!(url = %full_url, error = %e, "image download failed");
                        None
                    }
                }
            };
            slots.push(ImageSlot {
                local_path,
                source_url: url.clone(),
            });
        }

        info!(
            dir = %dir.display(),
            total = urls.len(),
            downloaded,
            "images ready"
        );
        slots
    }

    async fn download(&self, url: &str, target: &Path) -> Result<()> {
        let res = self
            .client
            .get(url)
            .timeout(self.settings.timeout())
            .send()
            .await?;
        if !res.status().is_success() {
            bail!("HTTP {}", res.status());
        }
        let bytes = res.bytes().await?;
        let partial = partial_path(target);
        let written = match fs::write(&partial, &bytes).await {
            Ok(()) => fs::rename(&partial, target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_delay() -> ImageSettings {
        ImageSettings {
            delay_ms: 0,
            even_extra_delay_ms: 0,
            ..ImageSettings::default()
        }
    }

    #[test]
    fn thumbnail_becomes_full_size() {
        assert_eq!(
            full_size_url("https://images.cdn-cian.ru/images/2412345678-2.jpg"),
            "https://images.cdn-cian.ru/images/2412345678-1.jpg"
        );
        assert_eq!(full_size_url("https://x/a.png"), "https://x/a.png");
    }

    #[test]
    fn names_from_last_segment() {
        assert_eq!(file_name("https://x/images/1-1.jpg?v=2").as_deref(), Some("1-1.jpg"));
        assert_eq!(file_name("https://x/images/"), None);
    }

    #[tokio::test]
    async fn second_call_hits_no_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/images/77-1.jpg")
            .with_status(200)
            .with_body("jpegbytes")
            .expect(1)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let urls = vec![format!("{}/images/77-2.jpg", server.url())];
        let fetcher = ImageFetcher::new(Client::new(), no_delay());

        let first = fetcher.download_all(dir.path(), &urls).await;
        let second = fetcher.download_all(dir.path(), &urls).await;

        mock.assert_async().await;
        let expected = dir.path().join("77-1.jpg");
        assert_eq!(first[0].local_path.as_ref(), Some(&expected));
        assert_eq!(second[0].local_path.as_ref(), Some(&expected));
        assert_eq!(std::fs::read(&expected).unwrap(), b"jpegbytes");
    }

    #[test]
    fn partial_file_sits_next_to_target() {
        assert_eq!(partial_path(Path::new("/d/77-1.jpg")), Path::new("/d/77-1.jpg.part"));
    }

    #[tokio::test]
    async fn interrupted_download_is_redone_and_cleaned_up() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/images/5-1.jpg")
            .with_status(200)
            .with_body("whole")
            .expect(1)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let partial = dir.path().join("5-1.jpg.part");
        std::fs::write(&partial, "wh").unwrap();
        let urls = vec![format!("{}/images/5-2.jpg", server.url())];

        let slots = ImageFetcher::new(Client::new(), no_delay())
            .download_all(dir.path(), &urls)
            .await;

        mock.assert_async().await;
        let target = dir.path().join("5-1.jpg");
        assert_eq!(slots[0].local_path.as_ref(), Some(&target));
        assert_eq!(std::fs::read(&target).unwrap(), b"whole");
        assert!(!partial.exists());
    }

    #[tokio::test]
    async fn failure_leaves_gap_and_continues() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server.mock("GET", "/images/1-1.jpg").with_status(404).create_async().await;
        let _ok = server
            .mock("GET", "/images/2-1.jpg")
            .with_status(200)
            .with_body("b")
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let urls = vec![
            format!("{}/images/1-2.jpg", server.url()),
            format!("{}/images/2-2.jpg", server.url()),
        ];
        let fetcher = ImageFetcher::new(Client::new(), no_delay());

        let slots = fetcher.download_all(dir.path(), &urls).await;
        assert_eq!(slots.len(), 2);
        assert!(slots[0].local_path.is_none());
        assert!(!dir.path().join("1-1.jpg").exists());
        assert!(!dir.path().join("1-1.jpg.part").exists());
        assert_eq!(slots[0].source_url, urls[0]);
        assert_eq!(slots[1].local_path.as_deref(), Some(dir.path().join("2-1.jpg").as_path()));
    }
}
