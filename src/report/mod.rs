pub mod caption;
pub mod rows;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::RealtorSettings;
use crate::error::RenderError;
use crate::parser::extract::description::LINE_BREAK;
use crate::parser::extract::price::{format_price, PRICE_NOT_SPECIFIED};
use crate::record::ListingRecord;
use crate::text::{escape_html, is_absent};
use rows::{render_rows, table_row, APARTMENT_ROWS, BUILDING_ROWS, ROSREESTR_ROWS, SUMMARY_ROWS};

const REPORT_TEMPLATE: &str = include_str!("../../templates/report.html");
const HEADER_TEMPLATE: &str = include_str!("../../templates/header.html");
const FOOTER_TEMPLATE: &str = include_str!("../../templates/footer.html");

pub const REPORT_FILE: &str = "index.html";
pub const HEADER_FILE: &str = "header.html";
pub const FOOTER_FILE: &str = "footer.html";

const NO_TITLE: &str = "Без названия";
const NO_ADDRESS: &str = "Адрес не указан";
const NO_REALTOR_NAME: &str = "Имя не указано";
const NO_REALTOR_PHONE: &str = "Телефон не указан";

#[derive(Debug, Clone)]
pub struct Templates {
    pub report: String,
    pub header: String,
    pub footer: String,
}

impl Templates {
    pub fn builtin() -> Self {
        Self {
            report: REPORT_TEMPLATE.to_string(),
            header: HEADER_TEMPLATE.to_string(),
            footer: FOOTER_TEMPLATE.to_string(),
        }
    }

    /// Templates from `dir` when given, built-in copies otherwise.
    pub fn load(dir: Option<&Path>) -> Result<Self, RenderError> {
        let Some(dir) = dir else {
            return Ok(Self::builtin());
        };
        Ok(Self {
            report: std::fs::read_to_string(dir.join("report.html"))?,
            header: std::fs::read_to_string(dir.join(HEADER_FILE))?,
            footer: std::fs::read_to_string(dir.join(FOOTER_FILE))?,
        })
    }
}

/// Renderer inputs that do not come from the page.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub realtor: RealtorSettings,
    pub embed_limit: usize,
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub html: String,
    pub header: String,
    pub footer: String,
}

/// Paths of a report written to its listing directory.
#[derive(Debug, Clone)]
pub struct ReportFiles {
    pub html: PathBuf,
    pub header: PathBuf,
    pub footer: PathBuf,
}

impl RenderedReport {
    pub fn write_to(&self, dir: &Path) -> std::io::Result<ReportFiles> {
        std::fs::create_dir_all(dir)?;
        let files = ReportFiles {
            html: dir.join(REPORT_FILE),
            header: dir.join(HEADER_FILE),
            footer: dir.join(FOOTER_FILE),
        };
        std::fs::write(&files.html, &self.html)?;
        std::fs::write(&files.header, &self.header)?;
        std::fs::write(&files.footer, &self.footer)?;
        Ok(files)
    }
}

pub fn render_report(
    record: &ListingRecord,
    templates: &Templates,
    ctx: &ReportContext,
) -> Result<RenderedReport, RenderError> {
    let values = report_values(record, ctx);
    let report = RenderedReport {
        html: substitute(&templates.report, &values)?,
        header: substitute(&templates.header, &values)?,
        footer: substitute(&templates.footer, &values)?,
    };
    debug!(listing_id = %record.id, bytes = report.html.len(), "report rendered");
    Ok(report)
}

/// Replace every `{{NAME}}` in one pass. Substituted text is never rescanned.
/// Names missing from `values` are collected into [`RenderError::Unreplaced`].
pub fn substitute(template: &str, values: &HashMap<&'static str, String>) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len() * 2);
    let mut unknown = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = after[..end].trim();
        match values.get(name) {
            Some(value) => out.push_str(value),
            None => {
                unknown.push(name.to_string());
                out.push_str(&rest[start..start + 2 + end + 2]);
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);

    if unknown.is_empty() {
        Ok(out)
    } else {
        Err(RenderError::Unreplaced(unknown))
    }
}

fn report_values(record: &ListingRecord, ctx: &ReportContext) -> HashMap<&'static str, String> {
    let price = record.price.as_deref().unwrap_or(PRICE_NOT_SPECIFIED);
    let text = |value: Option<&str>, fallback: &str| escape_html(value.filter(|v| !v.trim().is_empty()).unwrap_or(fallback));

    let mut values = HashMap::new();
    values.insert("LISTING_ID", escape_html(&record.id));
    values.insert("LISTING_URL", escape_html(&record.url));
    values.insert("TITLE", text(record.title.as_deref(), NO_TITLE));
    values.insert("ADDRESS", text(record.address.as_deref(), NO_ADDRESS));
    values.insert("PRICE", escape_html(&format_price(price)));
    values.insert("REALTOR_NAME", text(ctx.realtor.name.as_deref(), NO_REALTOR_NAME));
    values.insert("REALTOR_PHONE", text(ctx.realtor.phone.as_deref(), NO_REALTOR_PHONE));
    values.insert("SUMMARY_ROWS", render_rows(SUMMARY_ROWS, record));
    values.insert("METRO_SECTION", metro_section(record));
    values.insert("PHOTOS_SECTION", photos_section(record, ctx.embed_limit));
    values.insert("APARTMENT_SECTION", table_section("О квартире", &render_rows(APARTMENT_ROWS, record)));
    values.insert("BUILDING_SECTION", table_section("О доме", &render_rows(BUILDING_ROWS, record)));
    values.insert("ROSREESTR_SECTION", table_section("Данные Росреестра", &render_rows(ROSREESTR_ROWS, record)));
    values.insert("DEVELOPER_SECTION", developer_section(record));
    values.insert("AGENT_SECTION", agent_section(record));
    values.insert("DESCRIPTION_SECTION", description_section(record));
    values.insert("META_SECTION", meta_section(record));
    values
}

fn table_section(title: &str, rows: &str) -> String {
    if rows.is_empty() {
        return String::new();
    }
    format!(
        "<section class=\"block\">\n<h2>{}</h2>\n<table class=\"details\">\n{}\n</table>\n</section>",
        escape_html(title),
        rows
    )
}

fn metro_section(record: &ListingRecord) -> String {
    let Some(stops) = record.metro.as_deref().filter(|s| !s.is_empty()) else {
        return String::new();
    };
    let items: Vec<String> = stops
        .iter()
        .map(|stop| {
            format!(
                "<li><span class=\"station\">{}</span> ({} {})</li>",
                escape_html(&stop.station),
                stop.access,
                escape_html(&stop.duration)
            )
        })
        .collect();
    format!("<ul class=\"metro\">\n{}\n</ul>", items.join("\n"))
}

fn photos_section(record: &ListingRecord, limit: usize) -> String {
    let cells: Vec<String> = record
        .local_images()
        .take(limit)
        .enumerate()
        .map(|(i, path)| {
            let path = std::path::absolute(path).unwrap_or_else(|_| path.clone());
            let src = format!("file://{}", path.to_string_lossy().replace('\\', "/"));
            format!(
                "<td class=\"photo\"><img src=\"{}\" alt=\"Фото {}\"></td>",
                escape_html(&src),
                i + 1
            )
        })
        .collect();
    if cells.is_empty() {
        return String::new();
    }
    format!(
        "<section class=\"block photos\">\n<table><tr>\n{}\n</tr></table>\n</section>",
        cells.join("\n")
    )
}

fn present(value: &str) -> bool {
    !is_absent(Some(value))
}

fn developer_section(record: &ListingRecord) -> String {
    let rows = record
        .developer_info
        .iter()
        .flat_map(|info| info.iter())
        .filter(|(_, v)| present(v))
        .map(|(k, v)| table_row(k, v))
        .collect::<Vec<_>>()
        .join("\n");
    table_section("Застройщик", &rows)
}

fn agent_section(record: &ListingRecord) -> String {
    let mut rows: Vec<String> = record
        .agent_info
        .iter()
        .flat_map(|info| info.iter())
        .filter(|(_, v)| present(v))
        .map(|(k, v)| table_row(k, v))
        .collect();
    if let Some(brand) = &record.author_branding {
        let named = [
            ("Агентство", &brand.agency_name),
            ("Тип агентства", &brand.agency_type),
            ("Риелтор", &brand.realtor_name),
            ("Статус риелтора", &brand.realtor_type),
        ];
        for (label, value) in named {
            if let Some(value) = value.as_deref().filter(|v| present(v)) {
                rows.push(table_row(label, value));
            }
        }
        let labels: Vec<&str> = brand.agency_labels.iter().map(String::as_str).filter(|l| present(l)).collect();
        if !labels.is_empty() {
            rows.push(table_row("Отметки", &labels.join(", ")));
        }
    }
    table_section("Автор объявления", &rows.join("\n"))
}

fn description_section(record: &ListingRecord) -> String {
    let Some(description) = record.description.as_deref() else {
        return String::new();
    };
    let body = description
        .split(LINE_BREAK)
        .map(escape_html)
        .collect::<Vec<_>>()
        .join(LINE_BREAK);
    format!(
        "<section class=\"block\">\n<h2>Описание</h2>\n<p class=\"description\">{}</p>\n</section>",
        body
    )
}

fn meta_section(record: &ListingRecord) -> String {
    let Some(meta) = &record.offer_metadata else {
        return String::new();
    };
    let mut rows = Vec::new();
    if let Some(updated) = meta.updated_date.as_deref().filter(|v| present(v)) {
        rows.push(table_row("Обновлено", updated));
    }
    if let Some(views) = meta.views_stats.as_deref().filter(|v| present(v)) {
        rows.push(table_row("Просмотры", views));
    }
    table_section("Статистика объявления", &rows.join("\n"))
}
