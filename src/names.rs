//! Text substitutions applied to event names.

use regex::Regex;

/// Compiled name translations.
///
/// Currently only `Tag <n>` becomes `Day <n>`; the database titles multi-day
/// events in German.
pub struct Translations {
    tag_day: Regex,
}

impl Translations {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            tag_day: Regex::new(r"(Tag)( [0-9]+)")?,
        })
    }

    pub fn apply(&self, name: &str) -> String {
        self.tag_day.replace_all(name, "Day$2").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_becomes_day() {
        let t = Translations::new().unwrap();
        assert_eq!(t.apply("WWE Tag 3"), "WWE Day 3");
        assert_eq!(t.apply("G1 Climax 33 - Tag 12"), "G1 Climax 33 - Day 12");
    }

    #[test]
    fn test_tag_without_number_untouched() {
        let t = Translations::new().unwrap();
        assert_eq!(t.apply("Tagteam Night"), "Tagteam Night");
        assert_eq!(t.apply("Tag Team Turmoil"), "Tag Team Turmoil");
    }
}
