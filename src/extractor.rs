//! HTML extraction of a single event page into a [`Show`].
//!
//! The page is read in two passes: the information box (name, promotion,
//! arena, date) and the list of match blocks in card order. Missing
//! information box entries are fatal; anything missing inside a match block
//! degrades to an empty or absent value.

use std::borrow::Cow;
use std::collections::HashMap;

use encoding_rs::{Encoding, WINDOWS_1252};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{ResolveError, Result};
use crate::names::Translations;
use crate::schema::{Match, Promotion, Show, Wrestler};

/// Query keys in database URLs.
///
/// `id` names the content type and `nr` the item number. This looks wrong
/// but is the site's scheme.
const URL_TYPE: &str = "id";
const URL_ID: &str = "nr";

/// How far into a page a `<meta charset>` declaration is looked for.
const META_PRESCAN_BYTES: usize = 4096;

const INFO_NAME: &str = "Name of the event:";
const INFO_PROMOTION: &str = "Promotion:";
const INFO_ARENA: &str = "Arena:";
const INFO_DATE: &str = "Date:";

/// Content types, the database a linked item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Event,
    Wrestler,
    Title,
    Promotion,
    TagTeam,
    Stable,
}

impl ContentType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Event),
            2 => Some(Self::Wrestler),
            5 => Some(Self::Title),
            8 => Some(Self::Promotion),
            28 => Some(Self::TagTeam),
            29 => Some(Self::Stable),
            _ => None,
        }
    }

    /// Content type named by a link's query parameters.
    fn of_link(params: &HashMap<String, String>) -> Option<Self> {
        params
            .get(URL_TYPE)
            .and_then(|code| code.trim().parse::<u32>().ok())
            .and_then(Self::from_code)
    }
}

/// Compiled selectors and patterns for event pages.
pub struct ShowExtractor {
    info_table: Selector,
    info_title: Selector,
    info_contents: Selector,
    match_block: Selector,
    match_type: Selector,
    match_results: Selector,
    recommended_line: Selector,
    won: Selector,
    star_rating: Selector,
    link: Selector,
    cagematch_rating: Regex,
    with_block: Regex,
    meta_charset: regex::bytes::Regex,
    translations: Translations,
}

impl ShowExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            info_table: selector("div.InformationBoxTable")?,
            info_title: selector("div.InformationBoxTitle")?,
            info_contents: selector("div.InformationBoxContents")?,
            match_block: selector("div.Match")?,
            match_type: selector("div.MatchType")?,
            match_results: selector("div.MatchResults")?,
            recommended_line: selector("div.MatchRecommendedLine")?,
            won: selector("span.MatchRecommendedWON")?,
            star_rating: selector("span.starRating")?,
            link: selector("a")?,
            cagematch_rating: Regex::new(r"Matchguide Rating: (.+) based on ")?,
            with_block: Regex::new(r"\(w/([^)]+)")?,
            meta_charset: regex::bytes::Regex::new(
                r#"(?i)<meta[^>]*?charset\s*=\s*["']?([a-z0-9_:.\-]+)"#,
            )?,
            translations: Translations::new()?,
        })
    }

    /// Build a show from the raw page fetched from `url`.
    pub fn extract(&self, raw_html: &[u8], url: &str) -> Result<Show> {
        let show_id = show_id_from_url(url)?;
        let document = Html::parse_document(&self.decode(raw_html));

        let info = self.show_info(&document, url)?;
        let required = |key: &str| {
            info.get(key)
                .copied()
                .ok_or_else(|| ResolveError::malformed(url, format!("missing '{key}' entry")))
        };

        let name = self.translations.apply(lead_text(required(INFO_NAME)?).trim());
        let promotion = html_to_promotion(required(INFO_PROMOTION)?);
        let arena = lead_text(required(INFO_ARENA)?).trim().to_string();
        let date_text = lead_text(required(INFO_DATE)?);
        let date = reformat_date(&date_text)
            .ok_or_else(|| ResolveError::malformed(url, format!("unreadable date '{date_text}'")))?;

        let matches = self.html_to_matches(&document);
        debug!("Extracted '{}' ({}) with {} matches", name, show_id, matches.len());

        Ok(Show {
            id: vec![show_id],
            name,
            promotion,
            arena,
            date,
            matches,
            partial: false,
            exclude: false,
        })
    }

    /// Decode the page as UTF-8 when it is valid UTF-8 (pages the HTTP
    /// fetcher transcoded included), otherwise by its `<meta>` charset,
    /// falling back to windows-1252.
    fn decode<'a>(&self, raw_html: &'a [u8]) -> Cow<'a, str> {
        if let Some((encoding, _)) = Encoding::for_bom(raw_html) {
            return encoding.decode_with_bom_removal(raw_html).0;
        }
        if let Ok(text) = std::str::from_utf8(raw_html) {
            return Cow::Borrowed(text);
        }
        let head = &raw_html[..raw_html.len().min(META_PRESCAN_BYTES)];
        let encoding = self
            .meta_charset
            .captures(head)
            .and_then(|cap| cap.get(1))
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(WINDOWS_1252);
        debug!("Decoding page as {}", encoding.name());
        encoding.decode_without_bom_handling(raw_html).0
    }

    /// Treat the information box as a table: the i-th title is the key of
    /// the i-th contents block.
    fn show_info<'a>(
        &self,
        document: &'a Html,
        url: &str,
    ) -> Result<HashMap<String, ElementRef<'a>>> {
        let table = document
            .select(&self.info_table)
            .next()
            .ok_or_else(|| ResolveError::malformed(url, "no information box"))?;

        let keys = table
            .select(&self.info_title)
            .map(|title| title.text().collect::<String>().trim().to_string());
        let values = table.select(&self.info_contents);

        Ok(keys.zip(values).collect())
    }

    fn html_to_matches(&self, document: &Html) -> Vec<Match> {
        document
            .select(&self.match_block)
            .map(|block| self.html_to_match(block))
            .collect()
    }

    fn html_to_match(&self, block: ElementRef<'_>) -> Match {
        let (won_rating, cagematch_rating) = match block.select(&self.recommended_line).next() {
            Some(line) => (self.won_rating(line), self.cagematch_rating(line)),
            None => (None, None),
        };

        let match_type = block
            .select(&self.match_type)
            .next()
            .map(|e| e.text().collect::<String>())
            .unwrap_or_default();

        let mut m = Match {
            match_type,
            result: String::new(),
            won_rating,
            cagematch_rating,
            wrestlers: Vec::new(),
            teams: Vec::new(),
            appearances: Vec::new(),
        };

        if let Some(result) = block.select(&self.match_results).next() {
            m.result = result.text().collect();
            self.classify_participants(result, &mut m);
        }

        m
    }

    /// Sort every profile link in the result into wrestlers, teams or
    /// appearances. A link whose markup sits inside a `(w/ ...)` block is an
    /// appearance regardless of its content type.
    fn classify_participants(&self, result: ElementRef<'_>, m: &mut Match) {
        let raw = result.html();
        let with_blocks: Vec<&str> = if raw.contains("w/") {
            self.with_block
                .captures_iter(&raw)
                .filter_map(|cap| cap.get(1))
                .map(|g| g.as_str())
                .collect()
        } else {
            Vec::new()
        };

        for link in result.select(&self.link) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let params = query_params(href);
            let Some(id) = params.get(URL_ID) else {
                debug!("Skipping link without item number: {}", href);
                continue;
            };
            let wrestler = Wrestler::new(id.clone(), link.text().collect::<String>().trim());

            let anchor = link.html();
            if with_blocks.iter().any(|block| block.contains(&anchor)) {
                m.appearances.push(wrestler);
                continue;
            }

            match ContentType::of_link(&params) {
                Some(ContentType::Wrestler) => m.wrestlers.push(wrestler),
                Some(ContentType::Stable | ContentType::TagTeam) => m.teams.push(wrestler),
                _ => {}
            }
        }
    }

    fn won_rating(&self, line: ElementRef<'_>) -> Option<f64> {
        let won = line.select(&self.won).next()?;
        let stars = won.select(&self.star_rating).next()?;
        Some(parse_star_rating(&stars.text().collect::<String>()))
    }

    fn cagematch_rating(&self, line: ElementRef<'_>) -> Option<f64> {
        let text: String = line.text().collect();
        let cap = self.cagematch_rating.captures(&text)?;
        cap.get(1)?.as_str().trim().parse().ok()
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ResolveError::Selector(format!("{css}: {e:?}")))
}

/// Query parameters of a possibly relative link.
fn query_params(href: &str) -> HashMap<String, String> {
    let query = href.split_once('?').map(|(_, q)| q).unwrap_or("");
    let query = query.split('#').next().unwrap_or("");
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn show_id_from_url(url: &str) -> Result<String> {
    query_params(url)
        .remove(URL_ID)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ResolveError::InvalidDescriptor(format!("no '{URL_ID}' parameter in {url}")))
}

/// Text of the first child of an information box entry.
fn lead_text(contents: ElementRef<'_>) -> String {
    let Some(node) = contents.first_child() else {
        return String::new();
    };
    if let Some(text) = node.value().as_text() {
        return text.to_string();
    }
    ElementRef::wrap(node)
        .map(|el| el.text().collect())
        .unwrap_or_default()
}

/// A promotion is only recognised when the entry leads with a link into
/// the promotion database.
fn html_to_promotion(contents: ElementRef<'_>) -> Option<Promotion> {
    let link = ElementRef::wrap(contents.first_child()?)?;
    if link.value().name() != "a" {
        return None;
    }
    let params = query_params(link.value().attr("href")?);
    if ContentType::of_link(&params) != Some(ContentType::Promotion) {
        return None;
    }
    let id = params.get(URL_ID)?.trim().parse().ok()?;
    Some(Promotion {
        id,
        name: link.text().collect(),
    })
}

/// `DD.MM.YYYY` to `YYYY-MM-DD`.
pub fn reformat_date(date: &str) -> Option<String> {
    let parts: Vec<&str> = date.trim().split('.').collect();
    let [dd, mm, yyyy] = parts.as_slice() else {
        return None;
    };
    if is_digits(dd, 2) && is_digits(mm, 2) && is_digits(yyyy, 4) {
        Some(format!("{yyyy}-{mm}-{dd}"))
    } else {
        None
    }
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// Convert a WON star rating such as `***1/2` or `-*` to a number.
pub fn parse_star_rating(rating: &str) -> f64 {
    let rating = rating.trim();
    let (negate, rest) = match rating.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, rating),
    };

    let stars = if rest.starts_with('*') {
        rest.matches('*').count()
    } else {
        0
    };
    let fraction = match rest.replace('*', "").trim() {
        "1/4" => 0.25,
        "1/2" => 0.5,
        "3/4" => 0.75,
        _ => 0.0,
    };

    let value = stars as f64 + fraction;
    if negate {
        -value
    } else {
        value
    }
}
