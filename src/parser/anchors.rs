//! Semantic anchors: every structural marker the extractors rely on, in one table.
//!
//! Most anchors key on `data-name` / `data-testid` attributes. A few still need a
//! fragment of a generated CSS class (`[class*=...]`); those are the first to break
//! when the site ships new markup, and this is the only place to fix them.

use std::sync::LazyLock;

use scraper::Selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    OfferTitle,
    LegacyTitle,
    AddressContainer,
    AddressItem,
    PriceAmount,
    OfferFacts,
    OfferFactItem,
    UndergroundList,
    UndergroundItem,
    UndergroundStation,
    UndergroundTime,
    Factoids,
    FactoidItem,
    FactoidLabel,
    FactoidValue,
    SummaryLayout,
    SummaryGroup,
    SummaryItem,
    SummaryLabel,
    SummaryValue,
    NewbuildingSpecs,
    SpecItem,
    SpecTitle,
    DeveloperLayout,
    DeveloperLogo,
    DeveloperLogoLink,
    BrandText,
    DeveloperStat,
    RosreestrSection,
    NameValueItem,
    RosreestrValue,
    TextBlock,
    AgentInfo,
    AgentName,
    AgentLifeTimeContainer,
    AgentLifeTime,
    MoreOffers,
    AuthorBrand,
    AgencyBrand,
    RealtorBrand,
    BrandKind,
    BrandName,
    BrandLabel,
    OfferMeta,
    MetaUpdated,
    MetaViews,
    DescriptionContent,
    DescriptionText,
    Thumbnail,
}

impl Anchor {
    /// Every anchor in declaration order; index equals discriminant.
    pub const ALL: &'static [Anchor] = &[
        Anchor::OfferTitle,
        Anchor::LegacyTitle,
        Anchor::AddressContainer,
        Anchor::AddressItem,
        Anchor::PriceAmount,
        Anchor::OfferFacts,
        Anchor::OfferFactItem,
        Anchor::UndergroundList,
        Anchor::UndergroundItem,
        Anchor::UndergroundStation,
        Anchor::UndergroundTime,
        Anchor::Factoids,
        Anchor::FactoidItem,
        Anchor::FactoidLabel,
        Anchor::FactoidValue,
        Anchor::SummaryLayout,
        Anchor::SummaryGroup,
        Anchor::SummaryItem,
        Anchor::SummaryLabel,
        Anchor::SummaryValue,
        Anchor::NewbuildingSpecs,
        Anchor::SpecItem,
        Anchor::SpecTitle,
        Anchor::DeveloperLayout,
        Anchor::DeveloperLogo,
        Anchor::DeveloperLogoLink,
        Anchor::BrandText,
        Anchor::DeveloperStat,
        Anchor::RosreestrSection,
        Anchor::NameValueItem,
        Anchor::RosreestrValue,
        Anchor::TextBlock,
        Anchor::AgentInfo,
        Anchor::AgentName,
        Anchor::AgentLifeTimeContainer,
        Anchor::AgentLifeTime,
        Anchor::MoreOffers,
        Anchor::AuthorBrand,
        Anchor::AgencyBrand,
        Anchor::RealtorBrand,
        Anchor::BrandKind,
        Anchor::BrandName,
        Anchor::BrandLabel,
        Anchor::OfferMeta,
        Anchor::MetaUpdated,
        Anchor::MetaViews,
        Anchor::DescriptionContent,
        Anchor::DescriptionText,
        Anchor::Thumbnail,
    ];

    pub fn css(self) -> &'static str {
        match self {
            Anchor::OfferTitle => r#"div[data-name="OfferTitleNew"]"#,
            Anchor::LegacyTitle => r#"[data-name="OfferTitle"] h1"#,
            Anchor::AddressContainer => r#"div[data-name="AddressContainer"]"#,
            Anchor::AddressItem => r#"a[data-name="AddressItem"]"#,
            Anchor::PriceAmount => r#"[data-testid="price-amount"]"#,
            Anchor::OfferFacts => r#"div[data-name="OfferFactsInSidebar"][data-testid="offer-facts"]"#,
            Anchor::OfferFactItem => r#"div[data-name="OfferFactItem"]"#,
            Anchor::UndergroundList => r#"ul[data-name="UndergroundList"]"#,
            Anchor::UndergroundItem => r#"li[data-name="UndergroundItem"]"#,
            Anchor::UndergroundStation => r#"a[class*="underground_link"]"#,
            Anchor::UndergroundTime => r#"span[class*="underground_time"]"#,
            Anchor::Factoids => r#"div[data-name="ObjectFactoids"]"#,
            Anchor::FactoidItem => r#"div[data-name="ObjectFactoidsItem"]"#,
            Anchor::FactoidLabel => r#"span[class*="color_gray60_100"]"#,
            Anchor::FactoidValue => r#"span[class*="color_text-primary-default"]"#,
            Anchor::SummaryLayout => r#"div[data-name="OfferSummaryInfoLayout"]"#,
            Anchor::SummaryGroup => r#"div[data-name="OfferSummaryInfoGroup"]"#,
            Anchor::SummaryItem => r#"div[data-name="OfferSummaryInfoItem"]"#,
            Anchor::SummaryLabel => r#"p[class*="color_gray60_100"]"#,
            Anchor::SummaryValue => r#"p[class*="color_text-primary-default"]"#,
            Anchor::NewbuildingSpecs => r#"ul[data-name="NewbuildingSpecifications"]"#,
            Anchor::SpecItem => r#"li[class*="--item--"]"#,
            Anchor::SpecTitle => r#"div[class*="--title--"]"#,
            Anchor::DeveloperLayout => r#"div[data-name="DeveloperLayout"]"#,
            Anchor::DeveloperLogo => r#"div[data-name="DeveloperLogo"]"#,
            Anchor::DeveloperLogoLink => r#"a[data-testid="developer-logo-link"]"#,
            Anchor::BrandText => r#"span[class*="text--"]"#,
            Anchor::DeveloperStat => r#"div[data-testid*="stat"], a[data-testid*="stat"]"#,
            Anchor::RosreestrSection => r#"div[data-name="RosreestrSection"]"#,
            Anchor::NameValueItem => r#"div[data-name="NameValueListItem"]"#,
            Anchor::RosreestrValue => r#"div[data-name="RosreestrItemValue"]"#,
            Anchor::TextBlock => r#"div[class*="text--"]"#,
            Anchor::AgentInfo => r#"div[data-name="AgentInfo"]"#,
            Anchor::AgentName => r#"a[class*="agent-name"]"#,
            Anchor::AgentLifeTimeContainer => r#"li[data-name="AgentLifeTimeContainer"]"#,
            Anchor::AgentLifeTime => r#"span[data-name="AgentLifeTime"]"#,
            Anchor::MoreOffers => r#"li[data-name="MoreOffers"]"#,
            Anchor::AuthorBrand => r#"[data-name="AuthorAsideBrand"]"#,
            Anchor::AgencyBrand => r#"[data-name="AgencyBrand"]"#,
            Anchor::RealtorBrand => r#"[data-name="RealtorBrand"]"#,
            Anchor::BrandKind => r#"[data-name="BrandKind"]"#,
            Anchor::BrandName => r#"a[data-name="BrandName"]"#,
            Anchor::BrandLabel => r#"[data-name="BrandLabel"]"#,
            Anchor::OfferMeta => r#"[data-name="OfferMeta"]"#,
            Anchor::MetaUpdated => r#"[data-testid="metadata-updated-date"]"#,
            Anchor::MetaViews => r#"[data-name="OfferStats"]"#,
            Anchor::DescriptionContent => r#"div[data-id="content"]"#,
            Anchor::DescriptionText => r#"span[class*="text_whiteSpace__pre-wrap"]"#,
            Anchor::Thumbnail => r#"img[data-name="ThumbComponent"]"#,
        }
    }

    pub fn selector(self) -> &'static Selector {
        &SELECTORS[self as usize]
    }
}

static SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    Anchor::ALL
        .iter()
        .map(|a| Selector::parse(a.css()).unwrap())
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_discriminants() {
        for (i, anchor) in Anchor::ALL.iter().enumerate() {
            assert_eq!(*anchor as usize, i, "{:?} out of place", anchor);
        }
    }

    #[test]
    fn every_anchor_parses() {
        for anchor in Anchor::ALL {
            assert!(Selector::parse(anchor.css()).is_ok(), "bad selector for {:?}", anchor);
        }
        assert_eq!(SELECTORS.len(), Anchor::ALL.len());
    }
}
