//! Telegram Markdown (v1) texts: the short caption sent with the PDF and the full
//! message used when there is no PDF to send.

use crate::parser::extract::description::LINE_BREAK;
use crate::parser::extract::price::{format_price, PRICE_NOT_SPECIFIED};
use crate::record::{FieldMap, ListingRecord};

pub const MAX_CAPTION: usize = 1024;
pub const MAX_MESSAGE: usize = 4096;

const ELLIPSIS: &str = "...";
const TRUNCATED: &str = "\n...";
const NO_TITLE: &str = "Без заголовка";
const NO_ADDRESS: &str = "Адрес не указан";

/// How the bot signs its captions.
#[derive(Debug, Clone)]
pub struct Attribution {
    pub username: String,
    pub link: Option<String>,
}

impl Attribution {
    fn line(&self) -> String {
        let prefix = "\n\nОтчёт сформирован автоматически при помощи Телеграм бота: ";
        match self.link.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            Some(link) => {
                let text = self.username.replace('\\', "\\\\").replace(']', "\\]");
                format!("{}[{}]({})", prefix, text, link_target(link))
            }
            None => format!("{}@{}", prefix, escape_markdown(self.username.trim_start_matches('@'))),
        }
    }
}

/// Backslash-escape `\ * _ ` [ ]`.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// At most `max` characters, ending in `...` when cut.
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Escape `text`, cutting it so the escaped form plus `...` fits in `budget` characters.
fn escape_within(text: &str, budget: usize) -> String {
    let limit = budget.saturating_sub(ELLIPSIS.len());
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let escaped = escape_markdown(c.encode_utf8(&mut [0; 4]));
        let width = escaped.chars().count();
        if used + width > limit {
            break;
        }
        out.push_str(&escaped);
        used += width;
    }
    out.push_str(ELLIPSIS);
    out
}

/// URL safe to put inside `[text](...)`: a literal `)` would close the link early.
fn link_target(url: &str) -> String {
    url.trim().replace(')', "%29")
}

/// Whether every Markdown marker in `line` is escaped, so the line may be cut anywhere
/// outside an escape pair.
fn is_plain(line: &str) -> bool {
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '*' | '_' | '`' | '[' => return false,
            _ => {}
        }
    }
    true
}

/// At most `max` characters of an escaped line, never splitting `\x`.
fn cut_escaped(line: &str, max: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        let pair = if c == '\\' { chars.next() } else { None };
        let width = 1 + usize::from(pair.is_some());
        if used + width > max {
            break;
        }
        out.push(c);
        out.extend(pair);
        used += width;
    }
    out
}

/// Joins `lines` and, when over [`MAX_MESSAGE`], keeps whole lines up to the limit so no
/// bold span or escape is left open. A plain line that straddles the limit is cut inside.
fn fit_message(lines: &[String]) -> String {
    let text = lines.join("\n");
    if text.chars().count() <= MAX_MESSAGE {
        return text;
    }
    let budget = MAX_MESSAGE - TRUNCATED.chars().count();
    let mut out = String::new();
    let mut used = 0;
    for (i, line) in text.split('\n').enumerate() {
        let sep = usize::from(i > 0);
        let width = line.chars().count();
        if used + sep + width > budget {
            if is_plain(line) && used + sep < budget {
                if sep == 1 {
                    out.push('\n');
                }
                out.push_str(&cut_escaped(line, budget - used - sep));
            }
            break;
        }
        if sep == 1 {
            out.push('\n');
        }
        out.push_str(line);
        used += sep + width;
    }
    out.push_str(TRUNCATED);
    out
}

fn price_display(record: &ListingRecord) -> String {
    format_price(record.price.as_deref().unwrap_or(PRICE_NOT_SPECIFIED))
}

fn area_and_floor(record: &ListingRecord) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(area) = record.param("Общая площадь") {
        parts.push(format!("Общ.пл: {} м²", area));
    }
    if let Some(floor) = record.param("Этаж") {
        parts.push(format!("Этаж: {}", floor));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Title, address, price, area and floor, plus the bot signature. Never longer than
/// [`MAX_CAPTION`]: an oversized caption drops its formatting and is cut.
pub fn short_caption(record: &ListingRecord, attribution: &Attribution) -> String {
    let title = record.title.as_deref().unwrap_or(NO_TITLE);
    let address = record.address.as_deref().unwrap_or(NO_ADDRESS);
    let price = price_display(record);
    let details = area_and_floor(record);
    let signature = attribution.line();
    let signature_len = signature.chars().count();

    let mut lines = vec![
        format!("*{}*", escape_markdown(title)),
        format!("📍 {}", escape_markdown(address)),
        format!("💰 {}", escape_markdown(&price)),
    ];
    if let Some(details) = &details {
        lines.push(format!("📏 {}", escape_markdown(details)));
    }
    let formatted = lines.join("\n");
    if formatted.chars().count() + signature_len <= MAX_CAPTION {
        return formatted + &signature;
    }

    let mut plain = vec![title.to_string(), format!("📍 {}", address), format!("💰 {}", price)];
    if let Some(details) = details {
        plain.push(format!("📏 {}", details));
    }
    let budget = MAX_CAPTION.saturating_sub(signature_len);
    let body = if budget < 10 + ELLIPSIS.len() {
        "Инфо...".to_string()
    } else {
        escape_within(&plain.join("\n"), budget)
    };
    body + &signature
}

fn bullet_list(lines: &mut Vec<String>, heading: &str, map: &FieldMap) {
    lines.push(heading.to_string());
    for (key, value) in map.iter() {
        lines.push(format!("  • {}: {}", escape_markdown(key), escape_markdown(value)));
    }
    lines.push(String::new());
}

/// Every extracted section as one Markdown message, cut to [`MAX_MESSAGE`] at a line
/// boundary.
pub fn full_text(record: &ListingRecord) -> String {
    let mut lines = vec![
        format!("*{}*", escape_markdown(record.title.as_deref().unwrap_or(NO_TITLE))),
        format!("🔗 [Открыть на Циан]({})\n", link_target(&record.url)),
        format!("🏷️ *Цена*: {}", escape_markdown(&price_display(record))),
    ];
    if let Some(per_metre) = record.offer("Цена за метр") {
        lines.push(format!("м²: {}", escape_markdown(per_metre)));
    }
    if let Some(mortgage) = record.offer("Ипотека") {
        lines.push(format!("Ипотека: {}", escape_markdown(mortgage)));
    }
    lines.push(format!(
        "📍 *Адрес*: {}\n",
        escape_markdown(record.address.as_deref().unwrap_or(NO_ADDRESS))
    ));

    if let Some(params) = &record.parameters {
        lines.push("📋 *Параметры квартиры:*".to_string());
        for (key, value) in params.iter() {
            let unit = match key {
                "Общая площадь" | "Жилая площадь" | "Площадь кухни" => " м²",
                "Высота потолков" => " м",
                _ => "",
            };
            lines.push(format!("  • {}: {}{}", escape_markdown(key), escape_markdown(value), unit));
        }
        lines.push(String::new());
    }

    if let Some(metro) = &record.metro {
        lines.push("🚇 *Метро рядом:*".to_string());
        for stop in metro {
            lines.push(format!(
                "  • {} ({} {})",
                escape_markdown(&stop.station),
                stop.access,
                escape_markdown(&stop.duration)
            ));
        }
        lines.push(String::new());
    }

    if let Some(description) = &record.description {
        lines.push("📝 *Описание:*".to_string());
        lines.push(escape_markdown(&description.replace(LINE_BREAK, "\n")));
        lines.push(String::new());
    }

    if let Some(agent) = &record.agent_info {
        bullet_list(&mut lines, "👤 *Автор объявления:*", agent);
    }

    if let Some(brand) = &record.author_branding {
        lines.push("🏢 *Агентство/Риелтор:*".to_string());
        if let Some(name) = &brand.agency_name {
            lines.push(format!("  • Агентство: {}", escape_markdown(name)));
        }
        if let Some(name) = &brand.realtor_name {
            lines.push(format!("  • Риелтор: {}", escape_markdown(name)));
        }
        lines.push(String::new());
    }

    if let Some(developer) = &record.developer_info {
        bullet_list(&mut lines, "🏗️ *Застройщик:*", developer);
    }
    if let Some(rosreestr) = &record.rosreestr_info {
        bullet_list(&mut lines, "📜 *Данные Росреестра:*", rosreestr);
    }

    if let Some(meta) = &record.offer_metadata {
        lines.push("📊 *Статистика объявления:*".to_string());
        if let Some(updated) = &meta.updated_date {
            lines.push(format!("  • Обновлено: {}", escape_markdown(updated)));
        }
        if let Some(at) = meta.updated_at {
            lines.push(format!("  • Дата обновления: {}", at.format("%Y-%m-%d %H:%M:%S")));
        }
        if let Some(views) = &meta.views_stats {
            lines.push(format!("  • Просмотры: {}", escape_markdown(views)));
        }
    }

    fit_message(&lines)
}
