use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::PdfSettings;
use crate::error::ConversionError;
use crate::report::ReportFiles;

/// Turns a written report into a PDF next to it.
pub trait PdfConverter {
    fn convert(
        &self,
        files: &ReportFiles,
        output: &Path,
    ) -> impl Future<Output = Result<PathBuf, ConversionError>> + Send;
}

/// `report_YYYYmmddHHMMSS.pdf` inside `dir`.
pub fn output_path(dir: &Path, at: NaiveDateTime) -> PathBuf {
    dir.join(format!("report_{}.pdf", at.format("%Y%m%d%H%M%S")))
}

/// Shells out to `wkhtmltopdf`.
#[derive(Debug, Clone)]
pub struct WkHtmlToPdf {
    settings: PdfSettings,
}

impl WkHtmlToPdf {
    pub fn new(settings: PdfSettings) -> Self {
        Self { settings }
    }

    pub fn args(&self, files: &ReportFiles, output: &Path) -> Vec<OsString> {
        let s = &self.settings;
        let mut args: Vec<OsString> = [
            "--page-size",
            s.page_size.as_str(),
            "--margin-top",
            s.margin_top.as_str(),
            "--margin-right",
            s.margin_right.as_str(),
            "--margin-bottom",
            s.margin_bottom.as_str(),
            "--margin-left",
            s.margin_left.as_str(),
            "--encoding",
            "UTF-8",
            "--print-media-type",
            "--enable-local-file-access",
            "--footer-center",
            "[page] / [topage]",
            "--footer-font-size",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(s.footer_font_size.to_string().into());
        args.push("--header-html".into());
        args.push(files.header.clone().into());
        args.push("--footer-html".into());
        args.push(files.footer.clone().into());
        args.push(files.html.clone().into());
        args.push(output.into());
        args
    }
}

impl PdfConverter for WkHtmlToPdf {
    async fn convert(&self, files: &ReportFiles, output: &Path) -> Result<PathBuf, ConversionError> {
        let args = self.args(files, output);
        debug!(binary = %self.settings.binary.display(), ?args, "running pdf converter");
        let result = Command::new(&self.settings.binary).args(&args).output().await?;

        if !result.status.success() {
            return Err(ConversionError::Failed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(ConversionError::MissingOutput(output.to_path_buf()));
        }
        info!(path = %output.display(), "pdf written");
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn files(dir: &Path) -> ReportFiles {
        ReportFiles {
            html: dir.join("index.html"),
            header: dir.join("header.html"),
            footer: dir.join("footer.html"),
        }
    }

    #[test]
    fn timestamped_name() {
        let at = NaiveDate::from_ymd_opt(2025, 5, 11).unwrap().and_hms_opt(9, 3, 7).unwrap();
        assert_eq!(
            output_path(Path::new("downloads/1"), at),
            PathBuf::from("downloads/1/report_20250511090307.pdf")
        );
    }

    #[test]
    fn argument_layout() {
        let converter = WkHtmlToPdf::new(PdfSettings::default());
        let dir = Path::new("/d");
        let args = converter.args(&files(dir), &dir.join("out.pdf"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        let after = |flag: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            args[i + 1].clone()
        };
        assert_eq!(after("--page-size"), "A4");
        assert_eq!(after("--margin-top"), "0.60in");
        assert_eq!(after("--margin-bottom"), "0.5in");
        assert_eq!(after("--footer-font-size"), "9");
        assert_eq!(after("--header-html"), "/d/header.html");
        assert_eq!(after("--footer-html"), "/d/footer.html");
        assert!(args.contains(&"--enable-local-file-access".to_string()));
        assert_eq!(&args[args.len() - 2..], ["/d/index.html", "/d/out.pdf"]);
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let converter = WkHtmlToPdf::new(PdfSettings {
            binary: PathBuf::from("/nonexistent/wkhtmltopdf"),
            ..PdfSettings::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let err = converter
            .convert(&files(dir.path()), &dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Spawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_binary_reports_exit() {
        let converter = WkHtmlToPdf::new(PdfSettings {
            binary: PathBuf::from("false"),
            ..PdfSettings::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let err = converter
            .convert(&files(dir.path()), &dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Failed { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn success_without_file_is_missing_output() {
        let converter = WkHtmlToPdf::new(PdfSettings {
            binary: PathBuf::from("true"),
            ..PdfSettings::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pdf");
        let err = converter.convert(&files(dir.path()), &out).await.unwrap_err();
        assert!(matches!(err, ConversionError::MissingOutput(p) if p == out));
    }
}
