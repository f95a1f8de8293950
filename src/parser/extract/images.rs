use crate::parser::anchors::Anchor;
use crate::parser::Page;

/// Gallery thumbnail sources in page order.
pub fn extract(page: &Page) -> Vec<String> {
    page.all(Anchor::Thumbnail)
        .filter_map(|img| {
            let attrs = img.value();
            attrs.attr("src").or_else(|| attrs.attr("data-src"))
        })
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .collect()
}
