use scraper::ElementRef;

use crate::parser::anchors::Anchor;
use crate::parser::{all_in, descendants_by_tag, first_in, text_of, Page};
use crate::record::AuthorBranding;

struct Brand {
    kind: Option<String>,
    name: Option<String>,
    link: Option<String>,
}

/// Agency and realtor cards from the author aside.
pub fn extract(page: &Page) -> Option<AuthorBranding> {
    let aside = page.first(Anchor::AuthorBrand)?;

    let agency_block = first_in(aside, Anchor::AgencyBrand);
    let agency = agency_block.map(brand);
    let agency_labels = agency_block
        .map(|block| {
            all_in(block, Anchor::BrandLabel)
                .map(text_of)
                .filter(|l| !l.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let realtor = first_in(aside, Anchor::RealtorBrand).map(brand);

    let (agency_type, agency_name, agency_link) = split(agency);
    let (realtor_type, realtor_name, realtor_link) = split(realtor);
    let branding = AuthorBranding {
        agency_type,
        agency_name,
        agency_link,
        agency_labels,
        realtor_type,
        realtor_name,
        realtor_link,
    };
    (branding != AuthorBranding::default()).then_some(branding)
}

fn brand(block: ElementRef<'_>) -> Brand {
    let non_empty = |s: String| (!s.is_empty()).then_some(s);
    let anchor = first_in(block, Anchor::BrandName).or_else(|| descendants_by_tag(block, "a").next());
    Brand {
        kind: first_in(block, Anchor::BrandKind).map(text_of).and_then(non_empty),
        name: anchor.map(text_of).and_then(non_empty),
        link: anchor
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .and_then(non_empty),
    }
}

fn split(brand: Option<Brand>) -> (Option<String>, Option<String>, Option<String>) {
    match brand {
        Some(b) => (b.kind, b.name, b.link),
        None => (None, None, None),
    }
}
