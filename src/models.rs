//! Core data types.
//!
//! [`Row`] is what the spreadsheet store hands back; everything else is a
//! typed view model produced by [`crate::normalize`] and serialized as the
//! JSON the site's client code consumes.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One spreadsheet record, keyed by column header.
pub type Row = BTreeMap<String, String>;

/// A journey from the `Website_Journeys` sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub slug: String,
    pub title: String,
    /// `"{n}-Day"`, or empty when the sheet has no duration.
    pub duration: String,
    pub duration_days: i64,
    pub description: String,
    pub short_description: String,
    pub arc_description: String,
    pub hero_image: String,
    pub price: i64,
    pub start_city: String,
    pub focus: String,
    pub category: String,
    pub journey_id: String,
    pub destinations: String,
    pub journey_type: String,
    pub epic_price: Option<i64>,
    pub hidden: bool,
}

/// A journey from the accessibility-focused `Gentle_Journeys` sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GentleJourney {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub hero_image: String,
    pub tagline: String,
    pub description: String,
    pub duration: i64,
    pub price: i64,
    pub cities: String,
    pub highlights: Vec<String>,
    pub accessibility_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub role: String,
    pub quote: String,
    pub bio: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitledNote {
    pub title: String,
    pub description: String,
}

/// Key/value settings of the gentle-journeys landing page, defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GentleSettings {
    pub hero_title: String,
    pub hero_subtitle: String,
    pub hero_tagline: String,
    pub founder_note_title: String,
    pub founder_note_body: String,
    pub whatsapp_url: String,
    pub whatsapp_number: String,
    pub contact_email: String,
    pub requirements: Vec<TitledNote>,
    pub promises: Vec<TitledNote>,
}

/// Hero banner for a page. Field names are snake_case on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageBanner {
    pub page_slug: String,
    pub hero_image_url: String,
    pub midjourney: String,
    pub title: String,
    pub subtitle: String,
    pub label_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub slug: String,
    pub title: String,
    pub subtitle: String,
    pub category: String,
    pub mood: String,
    pub source_type: String,
    pub hero_image: String,
    pub hero_caption: String,
    pub excerpt: String,
    pub body: String,
    pub read_time: String,
    pub year: String,
    pub text_by: String,
    pub images_by: String,
    pub sources: String,
    #[serde(rename = "the_facts")]
    pub the_facts: String,
    pub tags: String,
    pub region: String,
    pub order: i64,
    pub featured: bool,
    pub published: bool,
}

/// Compact story shape used in related-content lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryCard {
    pub slug: String,
    pub title: String,
    pub region: String,
    pub tags: String,
    pub category: String,
    pub hero_image: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryImage {
    pub story_slug: String,
    pub image_order: i64,
    pub image_url: String,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub slug: String,
    pub title: String,
    pub destination: String,
    pub category: String,
    pub hero_image: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTrip {
    pub slug: String,
    pub title: String,
    pub short_description: String,
    pub hero_image: String,
    pub duration_hours: i64,
    pub departure_city: String,
    #[serde(rename = "priceEUR")]
    pub price_eur: i64,
    pub category: String,
}

/// Payload of `POST /api/stories/add`. Column order of the `Stories` sheet
/// is fixed by [`StoryInput::COLUMNS`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoryInput {
    pub slug: String,
    pub title: String,
    pub subtitle: String,
    pub category: String,
    pub source_type: String,
    pub hero_image: String,
    pub hero_caption: String,
    pub excerpt: String,
    pub body: String,
    pub read_time: String,
    pub year: String,
    pub text_by: String,
    pub images_by: String,
    pub sources: String,
    #[serde(rename = "the_facts")]
    pub the_facts: String,
    pub tags: String,
    pub region: String,
    pub published: String,
    pub order: String,
    pub featured: String,
    #[serde(rename = "midjourney_prompt")]
    pub midjourney_prompt: String,
}

impl StoryInput {
    pub const COLUMNS: [&'static str; 21] = [
        "slug",
        "title",
        "subtitle",
        "category",
        "sourceType",
        "heroImage",
        "heroCaption",
        "excerpt",
        "body",
        "readTime",
        "year",
        "textBy",
        "imagesBy",
        "sources",
        "the_facts",
        "tags",
        "region",
        "published",
        "order",
        "featured",
        "midjourney_prompt",
    ];

    /// Positional row matching [`Self::COLUMNS`].
    pub fn to_row(&self) -> Vec<String> {
        [
            &self.slug,
            &self.title,
            &self.subtitle,
            &self.category,
            &self.source_type,
            &self.hero_image,
            &self.hero_caption,
            &self.excerpt,
            &self.body,
            &self.read_time,
            &self.year,
            &self.text_by,
            &self.images_by,
            &self.sources,
            &self.the_facts,
            &self.tags,
            &self.region,
            &self.published,
            &self.order,
            &self.featured,
            &self.midjourney_prompt,
        ]
        .into_iter()
        .cloned()
        .collect()
    }
}

/// Payload of `POST /api/overnight-booking`. Money fields are passed through
/// as the client sent them. Text fields take any JSON scalar, so a numeric
/// `transactionId` or a `null` phone still deserializes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRequest {
    #[serde(deserialize_with = "lenient_text")]
    pub experience_title: String,
    #[serde(deserialize_with = "lenient_text")]
    pub trip_date: String,
    #[serde(deserialize_with = "lenient_text")]
    pub guest_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub guest_email: String,
    #[serde(deserialize_with = "lenient_text")]
    pub guest_phone: String,
    #[serde(deserialize_with = "lenient_text")]
    pub pickup_location: String,
    #[serde(deserialize_with = "lenient_text")]
    pub notes: String,
    #[serde(rename = "subtotalEUR")]
    pub subtotal_eur: serde_json::Value,
    #[serde(rename = "handlingFeeEUR")]
    pub handling_fee_eur: serde_json::Value,
    #[serde(rename = "totalEUR")]
    pub total_eur: serde_json::Value,
    #[serde(deserialize_with = "lenient_text")]
    pub transaction_id: String,
}

/// Sheet cell text for a JSON value: `null` is empty, strings are taken as
/// is, anything else keeps its JSON spelling.
pub fn cell_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(|v| cell_text(&v))
}
