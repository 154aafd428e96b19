//! Normalize raw provider records into the canonical [`Company`] shape.
//!
//! [`merge`] is total: any record, however sparse, yields a company. Missing
//! inputs become absent fields, except where a default is part of the
//! contract (empty domain, "Bootstrapped" funding).

use url::Url;

use crate::model::{
    BusinessModel, Company, Contact, DiscoveryCandidate, FirmographicRecord, FundingStage,
    Location, RawRecord, Social, TargetMarket, collapse,
};

/// Turn one raw record into a company.
pub fn merge(raw: RawRecord) -> Company {
    match raw {
        RawRecord::Discovery(candidate) => merge_candidate(candidate),
        RawRecord::Firmographic(record) => merge_firmographic(record),
    }
}

fn merge_candidate(c: DiscoveryCandidate) -> Company {
    Company {
        name: c.name.map(|n| n.trim().to_string()).unwrap_or_default(),
        domain: parse_domain(c.url.as_deref()),
        website: c.url,
        description: c.description,
        raw_enrichment: Some(c.payload),
        ..Company::default()
    }
}

fn merge_firmographic(r: FirmographicRecord) -> Company {
    let funding_stage = funding_stage(r.is_public, r.last_funding_round.as_deref());

    let location = collapse(Location {
        address: r.address,
        city: r.city,
        region: r.region,
        country: r.country,
    });
    let contact = collapse(Contact {
        email: r.email,
        phone: r.phone,
    });
    let social = collapse(Social {
        linkedin: r.linkedin_url,
        twitter: r.twitter_url,
        facebook: r.facebook_url,
    });

    Company {
        name: r.name.unwrap_or_default(),
        domain: parse_domain(r.website.as_deref()),
        website: r.website,
        logo: r.logo,
        description: r.description,
        industry: r.industry,
        business_model: business_model(r.is_b2b),
        target_market: r.employee_count.map(TargetMarket::from_employee_count),
        founded_year: r.founded_year,
        location,
        contact,
        social,
        employee_count: r.employee_count,
        revenue: r.revenue,
        funding_stage,
        total_funding: r.total_funding,
        technologies: r.technologies,
        customers: r.customers,
        partners: r.partners,
        competitors: r.competitors,
        enrichment_id: r.id,
        raw_enrichment: Some(r.payload),
        ..Company::default()
    }
}

/// Host of a website URL without a leading `www.`; empty when the URL is
/// missing or unparseable. A bare host like `acme.com` is accepted.
pub fn parse_domain(website: Option<&str>) -> String {
    let Some(website) = website.map(str::trim).filter(|w| !w.is_empty()) else {
        return String::new();
    };

    let parsed = if website.contains("://") {
        Url::parse(website)
    } else {
        Url::parse(&format!("https://{website}"))
    };

    parsed
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .filter(|h| h.contains('.'))
        .map(|h| h.strip_prefix("www.").map(str::to_string).unwrap_or(h))
        .unwrap_or_default()
}

/// `Some(false)` and "unknown" are different answers.
pub fn business_model(is_b2b: Option<bool>) -> Option<BusinessModel> {
    match is_b2b {
        Some(true) => Some(BusinessModel::B2B),
        Some(false) => Some(BusinessModel::B2C),
        None => None,
    }
}

/// Public wins over any round name. With no round at all the company is
/// assumed bootstrapped; an unrecognized round name stays unknown.
pub fn funding_stage(is_public: Option<bool>, round: Option<&str>) -> Option<FundingStage> {
    if is_public == Some(true) {
        return Some(FundingStage::Public);
    }
    let Some(round) = round else {
        return Some(FundingStage::Bootstrapped);
    };

    let round = round.to_lowercase();
    [
        ("seed", FundingStage::Seed),
        ("series a", FundingStage::SeriesA),
        ("series b", FundingStage::SeriesB),
        ("series c", FundingStage::SeriesC),
    ]
    .into_iter()
    .find(|(needle, _)| round.contains(needle))
    .map(|(_, stage)| stage)
}

