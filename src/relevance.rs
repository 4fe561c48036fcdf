//! Related-content ranking.
//!
//! Candidates are scored by how much they overlap a target profile: shared
//! regions, shared tags, and a matching category each add one point. The
//! ranking is a stable sort on that score, so ties keep the candidates'
//! input order (which is the sheet's editorial order).
//!
//! Guarantees, for any input:
//! - at most `limit` results,
//! - a candidate with more overlap never ranks below one with less,
//! - the item identified by `exclude_key` never appears,
//! - no candidates in, no candidates out.

use std::collections::BTreeSet;

use crate::models::{Journey, Story, StoryCard};

/// What a piece of content is "about", lowercased and trimmed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchProfile {
    pub regions: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub category: Option<String>,
}

impl MatchProfile {
    pub fn new(regions: &str, tags: &str, category: &str) -> Self {
        let category = category.trim().to_lowercase();
        Self {
            regions: terms(regions),
            tags: terms(tags),
            category: (!category.is_empty()).then_some(category),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.tags.is_empty() && self.category.is_none()
    }
}

/// Split a comma/pipe separated field into a lowercase term set.
fn terms(s: &str) -> BTreeSet<String> {
    s.split([',', '|'])
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Content that can be ranked against a [`MatchProfile`].
pub trait Matchable {
    /// Identity used to keep an item out of its own related list.
    fn key(&self) -> &str;
    fn profile(&self) -> MatchProfile;
}

impl Matchable for Story {
    fn key(&self) -> &str {
        &self.slug
    }

    fn profile(&self) -> MatchProfile {
        MatchProfile::new(&self.region, &self.tags, &self.category)
    }
}

impl Matchable for StoryCard {
    fn key(&self) -> &str {
        &self.slug
    }

    fn profile(&self) -> MatchProfile {
        MatchProfile::new(&self.region, &self.tags, &self.category)
    }
}

impl Matchable for Journey {
    fn key(&self) -> &str {
        &self.slug
    }

    /// A journey's destinations are its regions; its focus doubles as a tag.
    fn profile(&self) -> MatchProfile {
        MatchProfile::new(&self.destinations, &self.focus, &self.category)
    }
}

/// Overlap between a target and a candidate.
///
/// Target regions also count when they show up among the candidate's tags,
/// since destination names are routinely used as tags.
pub fn score(target: &MatchProfile, candidate: &MatchProfile) -> usize {
    let regions = target
        .regions
        .iter()
        .filter(|r| candidate.regions.contains(*r) || candidate.tags.contains(*r))
        .count();
    let tags = target
        .tags
        .iter()
        .filter(|t| candidate.tags.contains(*t) && !target.regions.contains(*t))
        .count();
    let category = match (&target.category, &candidate.category) {
        (Some(a), Some(b)) if a == b => 1,
        _ => 0,
    };
    regions + tags + category
}

/// Rank `candidates` against `target`, best first.
///
/// Zero-overlap candidates are dropped.
pub fn rank_related<T: Matchable>(
    target: &MatchProfile,
    exclude_key: Option<&str>,
    candidates: Vec<T>,
    limit: usize,
) -> Vec<T> {
    if limit == 0 || target.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, T)> = candidates
        .into_iter()
        .filter(|c| exclude_key.map_or(true, |k| c.key() != k))
        .map(|c| (score(target, &c.profile()), c))
        .filter(|(s, _)| *s > 0)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(limit);
    scored.into_iter().map(|(_, c)| c).collect()
}

/// Stories related to a journey, given its destinations and focus.
pub fn related_stories(
    destinations: &str,
    focus: &str,
    stories: Vec<StoryCard>,
    limit: usize,
) -> Vec<StoryCard> {
    let target = MatchProfile::new(destinations, focus, focus);
    rank_related(&target, None, stories, limit)
}

/// Journeys related to a story, given its region, tags and category.
pub fn related_journeys(
    region: &str,
    tags: &str,
    category: &str,
    journeys: Vec<Journey>,
    limit: usize,
) -> Vec<Journey> {
    let target = MatchProfile::new(region, tags, category);
    rank_related(&target, None, journeys, limit)
}

/// Other stories related to `story`.
pub fn related_to_story(story: &Story, stories: Vec<Story>, limit: usize) -> Vec<StoryCard> {
    rank_related(&story.profile(), Some(&story.slug), stories, limit)
        .iter()
        .map(StoryCard::from)
        .collect()
}
