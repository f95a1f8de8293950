use crate::parser::anchors::Anchor;
use crate::parser::{all_in, descendants_by_tag, first_in, text_of, Page};
use crate::record::FieldMap;
use crate::text::strip_unit;

/// Registry check block: owners, encumbrances, cadastral number, registered area.
pub fn extract(page: &Page) -> Option<FieldMap> {
    let section = page.first(Anchor::RosreestrSection)?;
    let mut map = FieldMap::new();
    for item in all_in(section, Anchor::NameValueItem) {
        let Some(key) = descendants_by_tag(item, "dt").next().map(text_of) else {
            continue;
        };
        let Some(container) = first_in(item, Anchor::RosreestrValue) else {
            continue;
        };
        let value = first_in(container, Anchor::TextBlock)
            .map(text_of)
            .unwrap_or_else(|| text_of(container));
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let value = if key.to_lowercase().contains("площадь") {
            strip_unit(&value, "м²")
        } else {
            value
        };
        map.insert(key, value);
    }
    map.non_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_value_items() {
        let page = Page::parse(
            r#"<div data-name="RosreestrSection">
                 <div data-name="NameValueListItem"><dt>Общая площадь</dt>
                   <div data-name="RosreestrItemValue"><div class="z_text--1">86,2 м²</div></div></div>
                 <div data-name="NameValueListItem"><dt>Собственников</dt>
                   <div data-name="RosreestrItemValue">1</div></div>
                 <div data-name="NameValueListItem"><dt>Обременения</dt></div>
               </div>"#,
        );
        let info = extract(&page).unwrap();
        assert_eq!(info.get("Общая площадь"), Some("86,2"));
        assert_eq!(info.get("Собственников"), Some("1"));
        assert!(!info.contains_key("Обременения"));
    }
}
