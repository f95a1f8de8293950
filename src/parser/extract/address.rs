use tracing::warn;

use crate::parser::anchors::Anchor;
use crate::parser::{all_in, text_fragments, text_of, Page};

/// Address parts joined with `", "`.
///
/// Current pages mark every part with `AddressItem`. Older pages put bare text in the
/// container followed by a map link; there only the two fragments before that link
/// (street and house) are kept.
pub fn extract(page: &Page) -> Option<String> {
    let container = page.first(Anchor::AddressContainer)?;

    let items: Vec<String> = all_in(container, Anchor::AddressItem)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect();
    if !items.is_empty() {
        return Some(items.join(", "));
    }

    let fallback = legacy(&text_fragments(container));
    if fallback.is_none() {
        warn!("address container has no usable text");
    }
    fallback
}

fn legacy(fragments: &[String]) -> Option<String> {
    let parts: Vec<&str> = fragments
        .iter()
        .map(|f| f.trim_matches(|c: char| c == ',' || c.is_whitespace()))
        .filter(|f| !f.is_empty())
        .collect();

    let street = match parts.len() {
        0 => return None,
        1 | 2 => parts[0].to_string(),
        n => parts[n - 3..n - 1].join(" "),
    };

    if street.contains(" ул. ") {
        return Some(format!("ул. {}", street.replace(" ул. ", " д.")));
    }
    Some(street)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frags(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn items_joined_in_order() {
        let page = Page::parse(
            r#"<div data-name="AddressContainer">
                 <a data-name="AddressItem">Москва</a>, <a data-name="AddressItem">ЗАО</a>,
                 <a data-name="AddressItem">Кутузовский просп.</a>
                 <a href="/map">На карте</a>
               </div>"#,
        );
        assert_eq!(extract(&page).as_deref(), Some("Москва, ЗАО, Кутузовский просп."));
    }

    #[test]
    fn legacy_keeps_street_and_house() {
        let f = frags(&["Москва", ", ", "ЗАО", ", ", "Кутузовский просп.", ", ", "26К1", "На карте"]);
        assert_eq!(legacy(&f).as_deref(), Some("Кутузовский просп. 26К1"));
    }

    #[test]
    fn legacy_rewrites_street_suffix() {
        let f = frags(&["Москва", "ЗАО", "Дорогомиловская ул.", "9", "На карте"]);
        assert_eq!(legacy(&f).as_deref(), Some("ул. Дорогомиловская д.9"));
    }

    #[test]
    fn empty_container_is_absent() {
        let page = Page::parse(r#"<div data-name="AddressContainer"> , </div>"#);
        assert!(extract(&page).is_none());
        assert!(page.first(Anchor::AddressContainer).is_some());
    }
}
