//! HTML extraction for the site's listing widgets and detail pages.
//!
//! Everything here is pure: strings in, records out. The browser session
//! captures page HTML and hands it over, so parsing stays testable without
//! Chrome.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use scraper::{ElementRef, Html, Selector};

use crate::models::{MetadataRecord, OfferingRecord, StateRecord};

const COUNT: &str = "#SubNavigationContentContainer strong span";
const ITEM: &str = "div.ObjektListItem";
const NAME: &str = "h4.ObjektAdress a";
const KIND: &str = "h3.ObjektTyp a";
const ZONE: &str = "dd.ObjektOmrade a";
const RENT: &str = "dd.ObjektHyra";
const TAGS: &str = "dd.ObjektEgenskaper span";
const APPLICANTS: &str = "dd.ObjektIntresse";
const CREDIT: &str = "dd.ObjektKredit";
const DETAIL_NAME: &str = "#SubNavigationContentContainer h1";
const DETAIL_OFFERING: &str = "div.ObjektErbjudande";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// The item card at 1-based `position`, if it has rendered.
fn item_at(document: &Html, position: u32) -> Option<ElementRef<'_>> {
    let index = position.checked_sub(1)? as usize;
    document.select(&selector(ITEM)).nth(index)
}

fn text_in(scope: &ElementRef<'_>, css: &str) -> Option<String> {
    let sel = selector(css);
    let text = scope.select(&sel).next()?.text().collect::<String>();
    non_empty(&text)
}

/// Treat whitespace and bare dashes as "no value", the way the site renders
/// missing fields.
fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.trim_matches('-').is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Keep only digits and parse; handles "3 950 kr/mån" and "1 034" alike.
fn digits(text: &str) -> Option<i64> {
    let filtered: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    filtered.parse().ok()
}

/// The listed-apartment count from the listing-summary element.
pub fn listing_count(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let sel = selector(COUNT);
    let text = document.select(&sel).next()?.text().collect::<String>();
    text.trim().parse().ok()
}

/// Descriptive fields of the item at 1-based `position` on the listing page.
/// `None` means the item has not rendered (yet).
pub fn metadata_at(html: &str, position: u32) -> Option<MetadataRecord> {
    let document = Html::parse_document(html);
    let item = item_at(&document, position)?;

    let name = text_in(&item, NAME)?;
    let kind = text_in(&item, KIND).unwrap_or_default();
    let zone = text_in(&item, ZONE).unwrap_or_default();
    let price = text_in(&item, RENT).and_then(|t| digits(&t)).unwrap_or(0);

    let mut furnished = false;
    let mut electricity_included = false;
    let mut short_term = false;
    let tag_sel = selector(TAGS);
    for tag in item.select(&tag_sel) {
        let text = tag.text().collect::<String>().to_lowercase();
        if text.contains("möbler") {
            furnished = true;
        }
        if text.contains("el ingår") {
            electricity_included = true;
        }
        if text.contains("10 månader") {
            short_term = true;
        }
    }

    Some(MetadataRecord {
        name,
        kind,
        zone,
        price,
        furnished,
        electricity_included,
        short_term,
    })
}

/// Applicant pressure of the item at 1-based `position`, stamped with
/// `observed_at`.
pub fn state_at(html: &str, position: u32, observed_at: DateTime<Utc>) -> Option<StateRecord> {
    let document = Html::parse_document(html);
    let item = item_at(&document, position)?;

    let name = text_in(&item, NAME)?;
    let applicants = text_in(&item, APPLICANTS).and_then(|t| digits(&t))?;
    let top_credit = text_in(&item, CREDIT).and_then(|t| digits(&t))?;

    Some(StateRecord {
        observed_at,
        name,
        applicants: applicants as i32,
        top_credit: top_credit as i32,
    })
}

/// Name and end-of-validity from an apartment detail page.
pub fn detail_offering(html: &str) -> Option<OfferingRecord> {
    let document = Html::parse_document(html);

    let name_sel = selector(DETAIL_NAME);
    let name = document.select(&name_sel).next()?.text().collect::<String>();
    let name = non_empty(&name)?;

    let offering_sel = selector(DETAIL_OFFERING);
    let offering = document
        .select(&offering_sel)
        .next()?
        .text()
        .collect::<String>();
    let ends_at = end_of_validity(&offering)?;

    Some(OfferingRecord { name, ends_at })
}

/// Pull the end-of-validity timestamp out of the offering line, e.g.
/// "Offer valid until 2024-01-08 at 10:00". The line is scanned for the
/// first date-shaped and first time-shaped tokens, so surrounding wording
/// can change without breaking the scrape.
pub fn end_of_validity(text: &str) -> Option<DateTime<Utc>> {
    let mut date = None;
    let mut time = None;
    for token in text.split_whitespace() {
        if date.is_none()
            && NaiveDateTime::parse_from_str(
                &format!("{token} 00:00:00"),
                "%Y-%m-%d %H:%M:%S",
            )
            .is_ok()
        {
            date = Some(token);
        } else if time.is_none() && NaiveTime::parse_from_str(token, "%H:%M").is_ok() {
            time = Some(token);
        }
    }

    let stamp = format!("{} {}:00", date?, time?);
    NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <div id="SubNavigationContentContainer">
          <div class="summary"><strong>Available: <span>2</span></strong></div>
          <div class="items">
            <div class="ObjektListItem">
              <h4 class="ObjektAdress"><a href="/apt/1">Körsbärsvägen 4 / 0902</a></h4>
              <h3 class="ObjektTyp"><a href="/type/1">Single room</a></h3>
              <dl>
                <dd class="ObjektOmrade"><a href="/zone/1">Lappkärrsberget</a></dd>
                <dd class="ObjektHyra">3 950 kr/mån</dd>
                <dd class="ObjektEgenskaper"><span>Möblerad</span><span>El ingår</span></dd>
                <dd class="ObjektIntresse">12 st</dd>
                <dd class="ObjektKredit">1 034</dd>
              </dl>
            </div>
            <div class="ObjektListItem">
              <h4 class="ObjektAdress"><a href="/apt/2">Amanuensvägen 8 / 1103</a></h4>
              <h3 class="ObjektTyp"><a href="/type/2">Studio</a></h3>
              <dl>
                <dd class="ObjektOmrade"><a href="/zone/2">Strix</a></dd>
                <dd class="ObjektHyra">5 210 kr/mån</dd>
                <dd class="ObjektEgenskaper"><span>10 månader</span></dd>
                <dd class="ObjektIntresse">3 st</dd>
                <dd class="ObjektKredit">480</dd>
              </dl>
            </div>
          </div>
        </div>
    "#;

    const DETAIL: &str = r#"
        <div id="SubNavigationContentContainer">
          <h1>Körsbärsvägen 4 / 0902</h1>
          <div class="ObjektErbjudande">Offer valid until 2024-01-08 at 10:00</div>
        </div>
    "#;

    #[test]
    fn count_is_read_from_summary() {
        assert_eq!(listing_count(LISTING), Some(2));
        assert_eq!(listing_count("<div>no summary</div>"), None);
    }

    #[test]
    fn metadata_fields_are_extracted() {
        let record = metadata_at(LISTING, 1).unwrap();
        assert_eq!(record.name, "Körsbärsvägen 4 / 0902");
        assert_eq!(record.kind, "Single room");
        assert_eq!(record.zone, "Lappkärrsberget");
        assert_eq!(record.price, 3950);
        assert!(record.furnished);
        assert!(record.electricity_included);
        assert!(!record.short_term);
    }

    #[test]
    fn tags_do_not_bleed_between_items() {
        let record = metadata_at(LISTING, 2).unwrap();
        assert!(!record.furnished);
        assert!(!record.electricity_included);
        assert!(record.short_term);
    }

    #[test]
    fn metadata_out_of_range_is_not_ready() {
        assert!(metadata_at(LISTING, 3).is_none());
        assert!(metadata_at(LISTING, 0).is_none());
    }

    #[test]
    fn state_fields_are_extracted() {
        let now = Utc::now();
        let record = state_at(LISTING, 1, now).unwrap();
        assert_eq!(record.name, "Körsbärsvägen 4 / 0902");
        assert_eq!(record.applicants, 12);
        assert_eq!(record.top_credit, 1034);
        assert_eq!(record.observed_at, now);
    }

    #[test]
    fn detail_page_yields_offering_record() {
        let record = detail_offering(DETAIL).unwrap();
        assert_eq!(record.name, "Körsbärsvägen 4 / 0902");
        assert_eq!(
            record.ends_at,
            NaiveDateTime::parse_from_str("2024-01-08 10:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap()
                .and_utc()
        );
    }

    #[test]
    fn end_of_validity_survives_wording_changes() {
        assert!(end_of_validity("Anmälan senast 2024-01-08 kl 10:00").is_some());
        assert!(end_of_validity("no timestamps here").is_none());
        assert!(end_of_validity("date only 2024-01-08").is_none());
    }

    #[test]
    fn dashes_count_as_missing() {
        assert_eq!(non_empty("  -  "), None);
        assert_eq!(non_empty("--"), None);
        assert_eq!(non_empty(" Strix "), Some("Strix".to_string()));
    }
}
