//! Row normalizers.
//!
//! Spreadsheet cells arrive as free text. Every function here is total: bad
//! or missing input falls back to a default rather than failing, so one
//! malformed row never takes a listing down.

use std::collections::HashMap;

use crate::models::{
    DayTrip, GentleJourney, GentleSettings, Journey, PageBanner, Place, Row, Story, StoryCard,
    StoryImage, TeamMember, TitledNote,
};

/// Sort position given to rows with a missing or unparsable `Order`.
pub const DEFAULT_ORDER: i64 = 99;

// ============ Field helpers ============

/// `"true"`, `"yes"` and `"1"` (any case, surrounding whitespace ignored).
pub fn is_truthy(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

/// Leading-integer parse: optional sign then digits, anything after the
/// digits is ignored (`"12.5"` → 12, `"7 days"` → 7). `None` when no digits
/// lead the string.
pub fn parse_int_opt(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    rest[..digits_end].parse::<i64>().ok().map(|n| sign * n)
}

pub fn parse_int_or(s: &str, fallback: i64) -> i64 {
    parse_int_opt(s).unwrap_or(fallback)
}

/// Split on `sep`, trim each piece, drop empties.
pub fn split_list(s: &str, sep: char) -> Vec<String> {
    s.split(sep)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// First non-empty value among alternative column names.
pub fn field(row: &Row, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn published(row: &Row) -> bool {
    is_truthy(&field(row, &["Published", "published"]))
}

fn order(row: &Row) -> i64 {
    parse_int_or(&field(row, &["Order", "order"]), DEFAULT_ORDER)
}

/// Stable sort by the `Order` column, missing orders last-ish at 99.
pub fn sort_by_order(rows: &mut [Row]) {
    rows.sort_by_key(order);
}

/// Rewrite a Google Drive share link into a directly embeddable URL.
///
/// Handles `/file/d/{id}/...`, `open?id={id}` and `uc?id={id}`. Anything
/// else comes back unchanged.
pub fn convert_drive_url(url: &str) -> String {
    let trimmed = url.trim();
    if !trimmed.contains("drive.google.com") {
        return trimmed.to_string();
    }

    let id = if let Some(pos) = trimmed.find("/file/d/") {
        trimmed[pos + "/file/d/".len()..]
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
    } else if let Some(pos) = trimmed.find("?id=").or_else(|| trimmed.find("&id=")) {
        trimmed[pos + "?id=".len()..]
            .split(['&', '#'])
            .next()
            .unwrap_or_default()
    } else {
        ""
    };

    if id.is_empty() {
        trimmed.to_string()
    } else {
        format!("https://drive.google.com/uc?export=view&id={}", id)
    }
}

/// Percent-encode like ECMAScript `encodeURIComponent`.
pub fn encode_uri_component(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => result.push(byte as char),
            _ => result.push_str(&format!("%{:02X}", byte)),
        }
    }
    result
}

// ============ Website_Journeys ============

pub fn journey(row: &Row) -> Journey {
    let duration_raw = field(row, &["Duration_Days"]);
    let short = field(row, &["Short_Description"]);
    let epic = field(row, &["Epic_Price_EUR"]);

    Journey {
        slug: field(row, &["Slug"]),
        title: field(row, &["Title"]),
        duration: if duration_raw.is_empty() {
            String::new()
        } else {
            format!("{}-Day", duration_raw)
        },
        duration_days: parse_int_or(&duration_raw, 0),
        description: short.clone(),
        short_description: short,
        arc_description: field(row, &["Arc_Description"]),
        hero_image: convert_drive_url(&field(row, &["Hero_Image_URL"])),
        price: parse_int_or(&field(row, &["Price_EUR"]), 0),
        start_city: field(row, &["Start_City"]),
        focus: field(row, &["Focus_Type"]),
        category: field(row, &["Category"]),
        journey_id: field(row, &["Journey_ID"]),
        destinations: field(row, &["Destinations"]),
        journey_type: match field(row, &["Journey_Type"]) {
            t if t.is_empty() => "regular".to_string(),
            t => t,
        },
        epic_price: if epic.is_empty() {
            None
        } else {
            parse_int_opt(&epic)
        },
        hidden: !published(row),
    }
}

/// Journeys for the public listing. Hidden ones are kept (flagged) only when
/// `include_hidden` is set.
pub fn journeys(rows: &[Row], include_hidden: bool) -> Vec<Journey> {
    rows.iter()
        .filter(|r| include_hidden || published(r))
        .map(journey)
        .collect()
}

// ============ Gentle_Journeys / Website_Team / Gentle_Settings ============

pub fn gentle_journey(row: &Row) -> GentleJourney {
    GentleJourney {
        id: field(row, &["Journey_ID"]),
        title: field(row, &["Title"]),
        slug: field(row, &["Slug"]),
        hero_image: convert_drive_url(&field(row, &["Hero_Image_URL"])),
        tagline: field(row, &["Tagline"]),
        description: field(row, &["Description"]),
        duration: parse_int_or(&field(row, &["Duration_Days"]), 0),
        price: parse_int_or(&field(row, &["Price_EUR"]), 0),
        cities: field(row, &["Route_Cities"]),
        highlights: split_list(&field(row, &["Highlights"]), '|'),
        accessibility_notes: split_list(&field(row, &["Accessibility_Notes"]), '|'),
    }
}

/// Published gentle journeys in `Order` order.
pub fn gentle_journeys(rows: &[Row]) -> Vec<GentleJourney> {
    let mut published_rows: Vec<Row> = rows.iter().filter(|r| published(r)).cloned().collect();
    sort_by_order(&mut published_rows);
    published_rows.iter().map(gentle_journey).collect()
}

pub fn team_member(row: &Row) -> TeamMember {
    TeamMember {
        id: field(row, &["Team_ID"]),
        name: field(row, &["Name"]),
        role: field(row, &["Role"]),
        quote: field(row, &["Quote"]),
        bio: field(row, &["Bio"]),
        image: convert_drive_url(&field(row, &["Image_URL"])),
    }
}

/// Team members that are published and flagged for the gentle page.
pub fn gentle_team(rows: &[Row]) -> Vec<TeamMember> {
    let mut shown: Vec<Row> = rows
        .iter()
        .filter(|r| published(r) && is_truthy(&field(r, &["Show_On_Gentle"])))
        .cloned()
        .collect();
    sort_by_order(&mut shown);
    shown.iter().map(team_member).collect()
}

const DEFAULT_WHATSAPP_NUMBER: &str = "+212618070450";
const DEFAULT_WHATSAPP_MESSAGE: &str = "Hello, I'd like to talk about travelling to Morocco";

pub fn gentle_settings(rows: &[Row]) -> GentleSettings {
    let mut kv: HashMap<String, String> = HashMap::new();
    for row in rows {
        let key = field(row, &["Key"]);
        if !key.is_empty() {
            kv.insert(key, field(row, &["Value"]));
        }
    }
    let get = |key: &str| kv.get(key).cloned().unwrap_or_default();
    let get_or = |key: &str, default: &str| match kv.get(key) {
        Some(v) if !v.is_empty() => v.clone(),
        _ => default.to_string(),
    };

    let whatsapp_number = get_or("whatsapp_number", DEFAULT_WHATSAPP_NUMBER);
    let digits: String = whatsapp_number
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let message = get_or("whatsapp_message", DEFAULT_WHATSAPP_MESSAGE);

    let notes = |pairs: [(&str, &str); 3]| -> Vec<TitledNote> {
        pairs
            .into_iter()
            .map(|(title, key)| TitledNote {
                title: title.to_string(),
                description: get(key),
            })
            .filter(|n| !n.description.is_empty())
            .collect()
    };

    GentleSettings {
        hero_title: get_or("hero_title", "Built for you. Not adapted."),
        hero_subtitle: get("hero_subtitle"),
        hero_tagline: get_or("hero_tagline", "A Slow Morocco Collection"),
        founder_note_title: get_or("founder_note_title", "Why I built this"),
        founder_note_body: get("founder_note_body"),
        whatsapp_url: format!(
            "https://wa.me/{}?text={}",
            digits,
            encode_uri_component(&message)
        ),
        whatsapp_number,
        contact_email: get_or("contact_email", "hello@slowmorocco.com"),
        requirements: notes([
            ("Travel insurance", "requirement_insurance"),
            ("Doctor's clearance", "requirement_doctor"),
            ("Honest conversation", "requirement_honesty"),
        ]),
        promises: notes([
            ("Medical care within reach", "promise_medical"),
            ("A dedicated team", "promise_team"),
            ("Complete honesty", "promise_honesty"),
        ]),
    }
}

// ============ Page_Banners ============

pub fn page_banner(row: &Row) -> PageBanner {
    PageBanner {
        page_slug: field(row, &["page_slug", "Page_Slug"]),
        hero_image_url: convert_drive_url(&field(row, &["hero_image_url", "Hero_Image_URL"])),
        midjourney: field(row, &["midjourney", "Midjourney"]),
        title: field(row, &["title", "Title"]),
        subtitle: field(row, &["subtitle", "Subtitle"]),
        label_text: field(row, &["label_text", "Label_Text"]),
    }
}

// ============ Stories / Story_Images ============

pub fn story(row: &Row) -> Story {
    Story {
        slug: field(row, &["slug", "Slug"]),
        title: field(row, &["title", "Title"]),
        subtitle: field(row, &["subtitle", "Subtitle"]),
        category: field(row, &["category", "Category"]),
        mood: field(row, &["mood", "Mood"]),
        source_type: field(row, &["sourceType", "source_type", "Source_Type"]),
        hero_image: convert_drive_url(&field(
            row,
            &["heroImage", "heroimage", "hero_image", "HeroImage"],
        )),
        hero_caption: field(row, &["heroCaption", "hero_caption", "HeroCaption"]),
        excerpt: field(row, &["excerpt", "Excerpt"]),
        body: field(row, &["body", "Body"]),
        read_time: field(row, &["readTime", "read_time", "ReadTime"]),
        year: field(row, &["year", "Year"]),
        text_by: field(row, &["textBy", "text_by", "TextBy"]),
        images_by: field(row, &["imagesBy", "images_by", "ImagesBy"]),
        sources: field(row, &["sources", "Sources"]),
        the_facts: field(row, &["the_facts", "The_Facts"]),
        tags: field(row, &["tags", "Tags"]),
        region: field(row, &["region", "Region"]),
        order: order(row),
        featured: is_truthy(&field(row, &["featured", "Featured"])),
        published: published(row),
    }
}

/// Published stories in `Order` order.
pub fn published_stories(rows: &[Row]) -> Vec<Story> {
    let mut stories: Vec<Story> = rows.iter().map(story).filter(|s| s.published).collect();
    stories.sort_by_key(|s| s.order);
    stories
}

impl From<&Story> for StoryCard {
    fn from(s: &Story) -> Self {
        StoryCard {
            slug: s.slug.clone(),
            title: s.title.clone(),
            region: s.region.clone(),
            tags: s.tags.clone(),
            category: s.category.clone(),
            hero_image: s.hero_image.clone(),
            excerpt: s.excerpt.clone(),
        }
    }
}

pub fn story_image(row: &Row) -> StoryImage {
    StoryImage {
        story_slug: field(row, &["story_slug", "Story_Slug"]),
        image_order: parse_int_or(&field(row, &["image_order", "Image_Order"]), DEFAULT_ORDER),
        image_url: convert_drive_url(&field(row, &["image_url", "Image_URL"])),
        caption: field(row, &["caption", "Caption"]),
    }
}

/// Images belonging to `slug`, in `image_order` order.
pub fn story_images_for(rows: &[Row], slug: &str) -> Vec<StoryImage> {
    let mut images: Vec<StoryImage> = rows
        .iter()
        .map(story_image)
        .filter(|i| i.story_slug == slug && !i.image_url.is_empty())
        .collect();
    images.sort_by_key(|i| i.image_order);
    images
}

// ============ Places / DayTrips ============

pub fn place(row: &Row) -> Place {
    Place {
        slug: field(row, &["Slug", "slug"]),
        title: field(row, &["Title", "title"]),
        destination: field(row, &["Destination", "destination"]),
        category: field(row, &["Category", "category"]),
        hero_image: convert_drive_url(&field(row, &["HeroImage", "Hero_Image_URL", "heroImage"])),
        body: field(row, &["Body", "body"]),
    }
}

pub fn published_places(rows: &[Row]) -> Vec<Place> {
    rows.iter().filter(|r| published(r)).map(place).collect()
}

pub fn day_trip(row: &Row) -> DayTrip {
    DayTrip {
        slug: field(row, &["Slug", "slug"]),
        title: field(row, &["Title", "title"]),
        short_description: field(row, &["Short_Description", "Description", "Narrative"]),
        hero_image: convert_drive_url(&field(
            row,
            &["HeroImage", "Hero_Image_URL", "Route_Image_URL"],
        )),
        duration_hours: parse_int_or(&field(row, &["Duration_Hours", "Duration"]), 0),
        departure_city: field(row, &["Departure_City", "FromCity"]),
        price_eur: parse_int_or(&field(row, &["Price_EUR", "Price"]), 0),
        category: field(row, &["Category", "category"]),
    }
}

pub fn published_day_trips(rows: &[Row]) -> Vec<DayTrip> {
    rows.iter().filter(|r| published(r)).map(day_trip).collect()
}
