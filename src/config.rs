use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "listing_report.toml";
const ENV_PREFIX: &str = "LISTING";

/// Runtime settings: optional TOML file, then `LISTING__*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub downloads_dir: PathBuf,
    /// Directory holding `report.html`, `header.html`, `footer.html`. Built-in copies otherwise.
    pub templates_dir: Option<PathBuf>,
    pub http: HttpProfile,
    pub images: ImageSettings,
    pub pdf: PdfSettings,
    pub realtor: RealtorSettings,
    pub telegram: TelegramSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            templates_dir: None,
            http: HttpProfile::default(),
            images: ImageSettings::default(),
            pdf: PdfSettings::default(),
            realtor: RealtorSettings::default(),
            telegram: TelegramSettings::default(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let settings = config::Config::builder()
            .add_source(config::File::from(file).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load settings from {}", file.display()))?;
        settings
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn listing_dir(&self, listing_id: &str) -> PathBuf {
        self.downloads_dir.join(listing_id)
    }
}

/// Static browser identity sent with every page request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpProfile {
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

impl Default for HttpProfile {
    fn default() -> Self {
        let headers = [
            ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"),
            ("accept-language", "ru,en;q=0.9"),
            ("cache-control", "max-age=0"),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "same-origin"),
            ("upgrade-insecure-requests", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36".to_string(),
            headers,
            cookies: BTreeMap::new(),
            timeout_secs: 30,
        }
    }
}

impl HttpProfile {
    /// `name=value; name=value` or `None` when no cookies are configured.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// How many images go into the rendered report.
    pub embed_limit: usize,
    pub delay_ms: u64,
    /// Added to the delay for even-indexed images.
    pub even_extra_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            embed_limit: 3,
            delay_ms: 900,
            even_extra_delay_ms: 400,
            timeout_secs: 15,
        }
    }
}

impl ImageSettings {
    pub fn delay_for(&self, index: usize) -> Duration {
        let extra = if index % 2 == 0 { self.even_extra_delay_ms } else { 0 };
        Duration::from_millis(self.delay_ms + extra)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    pub binary: PathBuf,
    pub page_size: String,
    pub margin_top: String,
    pub margin_right: String,
    pub margin_bottom: String,
    pub margin_left: String,
    pub footer_font_size: u32,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("wkhtmltopdf"),
            page_size: "A4".to_string(),
            margin_top: "0.60in".to_string(),
            margin_right: "0.30in".to_string(),
            margin_bottom: "0.5in".to_string(),
            margin_left: "0.30in".to_string(),
            footer_font_size: 9,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RealtorSettings {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub token: Option<String>,
    pub admin_chat_id: Option<i64>,
    pub api_base: String,
    pub bot_username: String,
    pub bot_link: Option<String>,
    pub poll_timeout_secs: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            token: None,
            admin_chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            bot_username: "listing_report_bot".to_string(),
            bot_link: None,
            poll_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_report_layout() {
        let s = Settings::default();
        assert_eq!(s.images.embed_limit, 3);
        assert_eq!(s.pdf.page_size, "A4");
        assert_eq!(s.listing_dir("312256069"), PathBuf::from("downloads/312256069"));
    }

    #[test]
    fn delay_alternates_by_parity() {
        let images = ImageSettings::default();
        assert_eq!(images.delay_for(0), Duration::from_millis(1300));
        assert_eq!(images.delay_for(1), Duration::from_millis(900));
        assert_eq!(images.delay_for(2), Duration::from_millis(1300));
    }

    #[test]
    fn cookie_header_joins_pairs() {
        let mut profile = HttpProfile::default();
        assert!(profile.cookie_header().is_none());
        profile.cookies.insert("_CIAN_GK".into(), "abc".into());
        profile.cookies.insert("login_mro_popup".into(), "1".into());
        assert_eq!(profile.cookie_header().as_deref(), Some("_CIAN_GK=abc; login_mro_popup=1"));
    }

    #[test]
    fn loads_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "downloads_dir = \"/tmp/reports\"\n[images]\nembed_limit = 5\n[http.cookies]\nsession = \"xyz\"\n",
        )
        .unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.downloads_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(s.images.embed_limit, 5);
        assert_eq!(s.images.delay_ms, 900);
        assert_eq!(s.http.cookies.get("session").map(String::as_str), Some("xyz"));
    }
}
