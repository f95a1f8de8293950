pub mod anchors;
pub mod extract;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::text::collapse_whitespace;
use anchors::Anchor;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Parsed listing page. Only answers anchor lookups.
pub struct Page {
    html: Html,
}

impl Page {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// True when the document has neither elements nor text in its body.
    pub fn is_empty(&self) -> bool {
        match self.html.select(&BODY).next() {
            None => true,
            Some(body) => {
                body.children().filter_map(ElementRef::wrap).next().is_none()
                    && body.text().all(|t| t.trim().is_empty())
            }
        }
    }

    pub fn first(&self, anchor: Anchor) -> Option<ElementRef<'_>> {
        self.html.select(anchor.selector()).next()
    }

    pub fn all(&self, anchor: Anchor) -> impl Iterator<Item = ElementRef<'_>> {
        self.html.select(anchor.selector())
    }
}

pub fn first_in(scope: ElementRef<'_>, anchor: Anchor) -> Option<ElementRef<'_>> {
    scope.select(anchor.selector()).next()
}

pub fn all_in(scope: ElementRef<'_>, anchor: Anchor) -> impl Iterator<Item = ElementRef<'_>> {
    scope.select(anchor.selector())
}

/// Element children of `scope` that match `anchor` (no deeper descendants).
pub fn children_matching(scope: ElementRef<'_>, anchor: Anchor) -> impl Iterator<Item = ElementRef<'_>> {
    scope
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| anchor.selector().matches(el))
}

pub fn children_by_tag<'a>(scope: ElementRef<'a>, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    scope
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}

pub fn descendants_by_tag<'a>(scope: ElementRef<'a>, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    scope
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}

/// All text under `el`, joined and whitespace-collapsed.
pub fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text nodes under `el`, each collapsed, empty ones dropped.
pub fn text_fragments(el: ElementRef<'_>) -> Vec<String> {
    el.text()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_documents() {
        assert!(Page::parse("").is_empty());
        assert!(Page::parse("<html><body>  \n </body></html>").is_empty());
        assert!(!Page::parse("<p>x</p>").is_empty());
        assert!(!Page::parse("<body><img src=a.jpg></body>").is_empty());
    }

    #[test]
    fn anchor_lookup_ignores_class_churn() {
        let page = Page::parse(
            r#"<div class="x1--title--AAA" data-name="OfferTitleNew"><h1>Продается  квартира</h1></div>"#,
        );
        let el = page.first(Anchor::OfferTitle).unwrap();
        assert_eq!(text_of(el), "Продается квартира");
    }

    #[test]
    fn children_are_not_descendants() {
        let page = Page::parse(
            r#"<ul data-name="NewbuildingSpecifications">
                 <li class="a--item--1"><ul><li class="a--item--2">nested</li></ul></li>
                 <li class="a--item--3">second</li>
               </ul>"#,
        );
        let list = page.first(Anchor::NewbuildingSpecs).unwrap();
        assert_eq!(children_matching(list, Anchor::SpecItem).count(), 2);
        assert_eq!(all_in(list, Anchor::SpecItem).count(), 3);
    }

    #[test]
    fn fragments_skip_blank_nodes() {
        let page = Page::parse(r#"<div data-name="AddressContainer"><a>Москва</a>, <a>ЗАО</a> </div>"#);
        let el = page.first(Anchor::AddressContainer).unwrap();
        assert_eq!(text_fragments(el), vec!["Москва", ",", "ЗАО"]);
    }
}
