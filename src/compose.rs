//! Composition of resolved shows: taping merges, partial broadcasts and
//! squashed match ranges.
//!
//! Positions given by directives are 1-based and always refer to the match
//! list as it was before the directive ran. They are converted to 0-based
//! indices here and nowhere else.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::descriptor::SquashRange;
use crate::schema::{Match, Show, Wrestler};

/// Merge the parts of a taping into the first part.
///
/// Ids and matches of later parts are appended in order. Everything else
/// comes from the first part.
pub fn merge_taping(mut first: Show, rest: Vec<Show>, name: Option<&str>) -> Show {
    first.name = match name {
        Some(name) => name.to_string(),
        None => format!("{} Taping", first.name),
    };
    for part in rest {
        first.id.extend(part.id);
        first.matches.extend(part.matches);
    }
    first
}

/// Drop the matches at the given 1-based positions and mark the show partial.
pub fn apply_partial(mut show: Show, excluded: &[i64], exclude_from_count: bool) -> Show {
    let len = show.matches.len();
    let mut removed = BTreeSet::new();
    for &position in excluded {
        match to_index(position, len) {
            Some(idx) => {
                removed.insert(idx);
            }
            None => warn!(
                "Ignoring exclusion of match {} in show {} ({} matches)",
                position,
                show.file_stem(),
                len
            ),
        }
    }

    show.matches = show
        .matches
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !removed.contains(idx))
        .map(|(_, m)| m)
        .collect();
    show.partial = true;
    show.exclude = exclude_from_count;
    show
}

/// Combine each range of matches into a single match placed at the start of
/// the range.
pub fn squash(mut show: Show, ranges: &[SquashRange]) -> Show {
    let len = show.matches.len();
    let mut replacements: BTreeMap<usize, Match> = BTreeMap::new();
    let mut removed = BTreeSet::new();

    for range in ranges {
        let Some((start, end)) = range_indices(range, len) else {
            warn!(
                "Ignoring squash range {}-{} in show {} ({} matches)",
                range.start,
                range.end,
                show.file_stem(),
                len
            );
            continue;
        };
        debug!("Squashing matches {}-{} of {}", start + 1, end + 1, show.file_stem());
        replacements.insert(start, squash_matches(&show.matches[start..=end]));
        removed.extend(start + 1..=end);
    }

    show.matches = show
        .matches
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !removed.contains(idx))
        .map(|(idx, m)| replacements.remove(&idx).unwrap_or(m))
        .collect();
    show
}

/// Synthesize one match from a contiguous run of matches.
fn squash_matches(slice: &[Match]) -> Match {
    let mut wrestlers = Participants::default();
    let mut teams = Participants::default();
    let mut appearances = Participants::default();

    for m in slice {
        wrestlers.extend(&m.wrestlers);
        teams.extend(&m.teams);
        appearances.extend(&m.appearances);
    }

    Match {
        match_type: String::new(),
        result: slice
            .iter()
            .map(|m| m.result.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        won_rating: None,
        cagematch_rating: None,
        wrestlers: wrestlers.into_vec(),
        teams: teams.into_vec(),
        appearances: appearances.into_vec(),
    }
}

/// Participants keyed by id. Keeps first-seen order; a repeated id replaces
/// the stored entry.
#[derive(Default)]
struct Participants {
    order: Vec<Wrestler>,
    index: HashMap<String, usize>,
}

impl Participants {
    fn extend(&mut self, wrestlers: &[Wrestler]) {
        for w in wrestlers {
            match self.index.get(&w.id) {
                Some(&i) => self.order[i] = w.clone(),
                None => {
                    self.index.insert(w.id.clone(), self.order.len());
                    self.order.push(w.clone());
                }
            }
        }
    }

    fn into_vec(self) -> Vec<Wrestler> {
        self.order
    }
}

fn to_index(position: i64, len: usize) -> Option<usize> {
    let idx = usize::try_from(position).ok()?.checked_sub(1)?;
    (idx < len).then_some(idx)
}

/// Inclusive 0-based bounds of a range; the end is clamped to the list.
fn range_indices(range: &SquashRange, len: usize) -> Option<(usize, usize)> {
    let start = range.start.checked_sub(1)?;
    let end = range.end.checked_sub(1)?.min(len.checked_sub(1)?);
    (start <= end).then_some((start, end))
}
