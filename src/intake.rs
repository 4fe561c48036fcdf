//! Write paths: overnight bookings and story batches.
//!
//! Both append to the content store. Validation failures come back as
//! [`IntakeError::Invalid`] so the HTTP layer can answer 400; everything
//! else is a store failure.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

use crate::models::{cell_text, BookingRequest, StoryInput};
use crate::store::{collections, normalize_row, ContentStore};

#[derive(Debug)]
pub enum IntakeError {
    /// The request itself is unusable.
    Invalid(String),
    Store(anyhow::Error),
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeError::Invalid(msg) => f.write_str(msg),
            IntakeError::Store(e) => write!(f, "{:#}", e),
        }
    }
}

impl std::error::Error for IntakeError {}

impl From<anyhow::Error> for IntakeError {
    fn from(e: anyhow::Error) -> Self {
        IntakeError::Store(e)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub success: bool,
    pub booking_ref: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StoriesAdded {
    pub success: bool,
    pub message: String,
    pub slugs: Vec<String>,
}

/// `ON-{unix millis}`
pub fn booking_ref(at: DateTime<Utc>) -> String {
    format!("ON-{}", at.timestamp_millis())
}

/// Positional `Overnight_Bookings` row for `req`.
pub fn booking_row(req: &BookingRequest, reference: &str, at: DateTime<Utc>) -> Vec<String> {
    vec![
        reference.to_string(),
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        req.experience_title.clone(),
        req.trip_date.clone(),
        req.guest_name.clone(),
        req.guest_email.clone(),
        req.guest_phone.clone(),
        req.pickup_location.clone(),
        req.notes.clone(),
        cell_text(&req.subtotal_eur),
        cell_text(&req.handling_fee_eur),
        cell_text(&req.total_eur),
        req.transaction_id.clone(),
        "confirmed".to_string(),
    ]
}

fn validate_booking(req: &BookingRequest) -> Result<(), IntakeError> {
    let missing = [
        &req.experience_title,
        &req.trip_date,
        &req.guest_name,
        &req.guest_email,
    ]
    .iter()
    .any(|v| v.trim().is_empty());
    if missing {
        return Err(IntakeError::Invalid("Missing required fields".to_string()));
    }
    Ok(())
}

/// Record a paid overnight booking.
pub async fn record_booking(
    store: &dyn ContentStore,
    req: &BookingRequest,
) -> Result<BookingConfirmation, IntakeError> {
    validate_booking(req)?;

    let now = Utc::now();
    let reference = booking_ref(now);
    store
        .append_rows(
            collections::OVERNIGHT_BOOKINGS,
            vec![booking_row(req, &reference, now)],
        )
        .await?;

    info!(booking_ref = %reference, experience = %req.experience_title, "overnight booking recorded");

    Ok(BookingConfirmation {
        success: true,
        booking_ref: reference,
        message: "Booking confirmed".to_string(),
    })
}

/// Keep stories that carry a slug and title and whose slug is not taken,
/// either by `existing` or by an earlier story in the same batch.
pub fn accept_stories<'a>(
    stories: &'a [StoryInput],
    existing: &HashSet<String>,
) -> Vec<&'a StoryInput> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut accepted = Vec::new();

    for story in stories {
        let slug = story.slug.trim();
        if slug.is_empty() || story.title.trim().is_empty() {
            warn!(slug, "skipping story without slug or title");
            continue;
        }
        if existing.contains(slug) || !seen.insert(slug) {
            warn!(slug, "skipping story with duplicate slug");
            continue;
        }
        accepted.push(story);
    }
    accepted
}

/// Append a batch of new stories to the `Stories` collection.
pub async fn add_stories(
    store: &dyn ContentStore,
    stories: &[StoryInput],
) -> Result<StoriesAdded, IntakeError> {
    if stories.is_empty() {
        return Err(IntakeError::Invalid("stories array is required".to_string()));
    }

    let existing: HashSet<String> = store
        .fetch_rows(collections::STORIES)
        .await?
        .iter()
        .map(normalize_row)
        .filter_map(|row| row.get("slug").map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect();

    let accepted = accept_stories(stories, &existing);
    if accepted.is_empty() {
        return Err(IntakeError::Invalid(
            "No new stories to add (all slugs already exist or are invalid)".to_string(),
        ));
    }

    let slugs: Vec<String> = accepted.iter().map(|s| s.slug.trim().to_string()).collect();
    let rows: Vec<Vec<String>> = accepted
        .iter()
        .zip(&slugs)
        .map(|(s, slug)| {
            let mut row = s.to_row();
            row[0] = slug.clone();
            row
        })
        .collect();
    store.append_rows(collections::STORIES, rows).await?;

    info!(count = slugs.len(), "stories added");

    Ok(StoriesAdded {
        success: true,
        message: format!("Added {} stories", slugs.len()),
        slugs,
    })
}
