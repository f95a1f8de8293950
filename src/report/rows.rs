//! Display table for the report's detail rows.

use crate::parser::extract::params::split_floor;
use crate::record::ListingRecord;
use crate::text::{capitalize, escape_html, is_absent};

#[derive(Debug, Clone, Copy)]
pub enum Source {
    Param,
    Offer,
    Rosreestr,
}

#[derive(Debug, Clone, Copy)]
pub enum Display {
    Plain,
    Unit(&'static str),
    /// `X из Y`, total `?` when unknown.
    Floor,
    Capitalize,
}

/// One table row: shown label, candidate lookups (first present wins) and transform.
pub struct RowSpec {
    pub label: &'static str,
    pub lookups: &'static [(Source, &'static str)],
    pub display: Display,
}

const fn row(label: &'static str, lookups: &'static [(Source, &'static str)], display: Display) -> RowSpec {
    RowSpec {
        label,
        lookups,
        display,
    }
}

pub const SUMMARY_ROWS: &[RowSpec] = &[
    row("Тип жилья", &[(Source::Param, "Тип жилья")], Display::Plain),
    row("Цена за метр", &[(Source::Offer, "Цена за метр")], Display::Plain),
    row(
        "Условия сделки",
        &[(Source::Offer, "Условия сделки"), (Source::Param, "Дом")],
        Display::Capitalize,
    ),
    row("Ипотека", &[(Source::Offer, "Ипотека")], Display::Plain),
    row(
        "Год постройки",
        &[(Source::Param, "Год постройки"), (Source::Param, "Год сдачи")],
        Display::Plain,
    ),
];

pub const APARTMENT_ROWS: &[RowSpec] = &[
    row("Общая площадь", &[(Source::Param, "Общая площадь")], Display::Unit("м²")),
    row("Жилая площадь", &[(Source::Param, "Жилая площадь")], Display::Unit("м²")),
    row("Площадь кухни", &[(Source::Param, "Площадь кухни")], Display::Unit("м²")),
    row("Высота потолков", &[(Source::Param, "Высота потолков")], Display::Unit("м")),
    row("Этаж", &[(Source::Param, "Этаж")], Display::Floor),
    row(
        "Отделка/Ремонт",
        &[(Source::Param, "Отделка"), (Source::Param, "Ремонт")],
        Display::Plain,
    ),
    row("Санузел", &[(Source::Param, "Санузел")], Display::Plain),
    row("Вид из окон", &[(Source::Param, "Вид из окон")], Display::Plain),
];

pub const BUILDING_ROWS: &[RowSpec] = &[
    row("Тип дома", &[(Source::Param, "Тип дома")], Display::Plain),
    row("Тип перекрытий", &[(Source::Param, "Тип перекрытий")], Display::Plain),
    row("Строительная серия", &[(Source::Param, "Строительная серия")], Display::Plain),
    row("Лифт", &[(Source::Param, "Количество лифтов")], Display::Plain),
    row("Подъезды", &[(Source::Param, "Подъезды")], Display::Plain),
    row("Парковка", &[(Source::Param, "Парковка")], Display::Plain),
    row("Отопление", &[(Source::Param, "Отопление")], Display::Plain),
    row("Аварийность", &[(Source::Param, "Аварийность")], Display::Plain),
    row("Газоснабжение", &[(Source::Param, "Газоснабжение")], Display::Plain),
];

pub const ROSREESTR_ROWS: &[RowSpec] = &[
    row("Собственников", &[(Source::Rosreestr, "Собственников")], Display::Plain),
    row("Обременения", &[(Source::Rosreestr, "Обременения")], Display::Plain),
    row("Кадастровый номер", &[(Source::Rosreestr, "Кадастровый номер")], Display::Plain),
];

impl RowSpec {
    /// Display value, or `None` when every lookup is absent.
    pub fn value(&self, record: &ListingRecord) -> Option<String> {
        let raw = self
            .lookups
            .iter()
            .map(|(source, key)| match source {
                Source::Param => record.param(key),
                Source::Offer => record.offer(key),
                Source::Rosreestr => record.rosreestr(key),
            })
            .find(|v| !is_absent(*v))
            .flatten()?;
        Some(match self.display {
            Display::Plain => raw.to_string(),
            Display::Unit(unit) => format!("{} {}", raw, unit),
            Display::Floor => {
                let (floor, total) = split_floor(raw);
                format!("{} из {}", floor, total)
            }
            Display::Capitalize => capitalize(raw),
        })
    }
}

pub fn table_row(label: &str, value: &str) -> String {
    format!(
        r#"<tr class="detail-item"><td class="label-cell"><span class="label">{}</span></td><td class="value-cell"><span class="value">{}</span></td></tr>"#,
        escape_html(label),
        escape_html(value)
    )
}

/// Rendered rows that have a value; empty string when none.
pub fn render_rows(specs: &[RowSpec], record: &ListingRecord) -> String {
    specs
        .iter()
        .filter_map(|spec| spec.value(record).map(|v| table_row(spec.label, &v)))
        .collect::<Vec<_>>()
        .join("\n")
}
