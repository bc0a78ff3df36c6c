//! Show record types.
//!
//! These serialize to the per-show JSON records consumed by the dashboard,
//! so field names follow that shape (`won`, `cagematch`).

use serde::{Deserialize, Serialize};

/// A linked participant: a wrestler, tag team or stable.
///
/// Identity is the database number in `id`; `text` is the name as printed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wrestler {
    pub id: String,
    pub text: String,
}

impl Wrestler {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// The promotion running a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: u64,
    pub name: String,
}

/// One match on a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(rename = "type")]
    pub match_type: String,
    pub result: String,
    /// Wrestling Observer star rating.
    #[serde(rename = "won")]
    pub won_rating: Option<f64>,
    /// Matchguide user rating.
    #[serde(rename = "cagematch")]
    pub cagematch_rating: Option<f64>,
    pub wrestlers: Vec<Wrestler>,
    pub teams: Vec<Wrestler>,
    pub appearances: Vec<Wrestler>,
}

/// A resolved show.
///
/// `matches` is in card order; partial and squash directives address it
/// with 1-based positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: Vec<String>,
    pub name: String,
    pub promotion: Option<Promotion>,
    pub arena: String,
    pub date: String, // YYYY-MM-DD
    pub matches: Vec<Match>,
    #[serde(default)]
    pub partial: bool,
    #[serde(default)]
    pub exclude: bool,
}

impl Show {
    /// File stem used for the output record, e.g. `12345-12346`.
    pub fn file_stem(&self) -> String {
        self.id.join("-")
    }
}
