//! Ban list parsing
//!
//! The service only exposes the ban list as an HTML fragment with one
//! `<label>` per entry. The text is parsed in the Tatar locale, whose
//! layout is the most stable of the available translations:
//!
//! `Fluffy дат(тан) 12/31/16 12:50 AM чаклы (120 минут) модераторларга
//! EvilModerator, комментарий: I banned you`

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::warn;

use crate::error::BanParseError;
use crate::time::twelve_to_24_clock;

static LABEL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("label").expect("valid label selector"));

static BAN_ENTRY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input.banEntry").expect("valid ban entry selector"));

static BAN_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<nickname>.{1,25}?) \S+ ",
        r"(?P<month>\d{1,2})\D(?P<day>\d{1,2})\D(?P<year>\d{1,4}) ",
        r"(?P<hour>\d{1,2})\D(?P<minute>\d{1,2}) (?P<period>AM|PM) \S+ ",
        r"\((?P<duration>[\d,]+) \w+\) \S+ ",
        r"(?P<author>.{1,25}?), комментарий: ",
        r"(?P<comment>(?s:.*))$",
    ))
    .expect("valid ban text regex")
});

/// One entry of the chat ban list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanEntry {
    /// Ban id, used to lift the ban
    pub id: u64,
    /// Banned nickname
    pub nickname: String,
    /// Moderator who issued the ban
    pub author: String,
    /// Ban length in minutes
    pub duration: u32,
    /// Expiry time as shown by the service
    pub until: NaiveDateTime,
    pub comment: String,
}

impl BanEntry {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.until <= now
    }
}

/// Parse every ban entry in an HTML ban list
///
/// Labels without a ban checkbox are ignored; entries whose text does not
/// match the expected layout are skipped with a warning.
pub fn parse_ban_list(html: &str) -> Vec<BanEntry> {
    let document = Html::parse_fragment(html);

    document
        .select(&LABEL_SELECTOR)
        .filter_map(|label| {
            let id = label
                .select(&BAN_ENTRY_SELECTOR)
                .next()?
                .value()
                .attr("value")?
                .to_string();
            let text: String = label.text().collect();

            match parse_ban_entry(&id, &text) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping ban entry {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

/// Parse the text of a single ban entry
pub fn parse_ban_entry(id: &str, text: &str) -> Result<BanEntry, BanParseError> {
    let caps = BAN_TEXT_RE
        .captures(text.trim())
        .ok_or(BanParseError::Format)?;
    let field = |name: &str| capture(&caps, name);

    let mut year: i32 = number("year", field("year"))?;
    if year < 100 {
        year += 2000;
    }
    let hour = twelve_to_24_clock(number("hour", field("hour"))?, field("period"))?;
    let minute = number("minute", field("minute"))?;

    let until = NaiveDate::from_ymd_opt(
        year,
        number("month", field("month"))?,
        number("day", field("day"))?,
    )
    .and_then(|date| date.and_hms_opt(hour, minute, 0))
    .ok_or(BanParseError::InvalidDate)?;

    Ok(BanEntry {
        id: number("id", id.trim())?,
        nickname: field("nickname").trim().to_string(),
        author: field("author").trim().to_string(),
        duration: number("duration", &join_all_numbers(field("duration")))?,
        until,
        comment: field("comment").trim().to_string(),
    })
}

/// Keep only the digits of a string ("44,640" → "44640")
pub fn join_all_numbers(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn capture<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map(|m| m.as_str()).unwrap_or_default()
}

fn number<T: FromStr>(field: &'static str, value: &str) -> Result<T, BanParseError> {
    value.parse().map_err(|_| BanParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    const HEADER: &str = "    <p><input type=\"button\" class=\"refresh\" value=\"Яңартырга\"/> <input type=\"button\" class=\"unban\" value=\"Билгеләнгәннәрне банга кую\"/></p>\r\n";

    const ENTRIES: [&str; 3] = [
        "    <p><label><input type=\"checkbox\" class=\"banEntry\" value=\"2479317\"/> P&atilde;o Macio дат(тан) 6/26/17 7:27 PM чаклы (44,640 минут) модераторларга Kryptonite, комментарий: &lt;label&gt;&lt;/label&gt;&lt;/html&gt;</label></p>\r\n",
        "    <p><label><input type=\"checkbox\" class=\"banEntry\" value=\"2477617\"/> Test ban дат(тан) 6/1/17 8:49 PM чаклы (10,080 минут) модераторларга Kryptonite, комментарий: afsfsafsafs@$@$</label></p>\r\n",
        "    <p><label><input type=\"checkbox\" class=\"banEntry\" value=\"2477613\"/> bah64 дат(тан) 6/25/17 8:49 PM чаклы (44,640 минут) модераторларга Kryptonite, комментарий: test</label></p>\r\n",
    ];

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
    }

    #[test]
    fn test_parse_ban_list_size() {
        let html = format!("{}{}", HEADER, ENTRIES.concat());
        assert_eq!(parse_ban_list(&html).len(), 3);
    }

    #[test]
    fn test_parse_ban_entry_with_entities() {
        let bans = parse_ban_list(ENTRIES[0]);

        assert_eq!(
            bans,
            vec![BanEntry {
                id: 2479317,
                nickname: "Pão Macio".to_string(),
                author: "Kryptonite".to_string(),
                duration: 44640,
                until: at(2017, 6, 26, 19, 27),
                comment: "<label></label></html>".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_all_entries() {
        let html = format!("{}{}", HEADER, ENTRIES.concat());
        let bans = parse_ban_list(&html);

        let ids: Vec<u64> = bans.iter().map(|ban| ban.id).collect();
        assert_eq!(ids, vec![2479317, 2477617, 2477613]);
        assert_eq!(bans[1].nickname, "Test ban");
        assert_eq!(bans[1].duration, 10080);
        assert_eq!(bans[1].until, at(2017, 6, 1, 20, 49));
        assert_eq!(bans[1].comment, "afsfsafsafs@$@$");
        assert_eq!(bans[2].nickname, "bah64");
        assert_eq!(bans[2].comment, "test");
    }

    #[test]
    fn test_morning_ban_expiry() {
        let entry = parse_ban_entry(
            "1",
            "Fluffy дат(тан) 12/31/16 12:50 AM чаклы (120 минут) модераторларга EvilModerator, комментарий: I banned you",
        )
        .unwrap();

        assert_eq!(entry.until, at(2016, 12, 31, 0, 50));
        assert_eq!(entry.author, "EvilModerator");
        assert!(entry.is_expired(at(2017, 1, 1, 0, 0)));
    }

    #[test]
    fn test_unmatched_entry_skipped() {
        let html = "<label><input class=\"banEntry\" value=\"5\"/> garbage</label>";
        assert!(parse_ban_list(html).is_empty());
        assert_eq!(
            parse_ban_entry("5", "garbage").unwrap_err(),
            BanParseError::Format
        );
    }

    #[test]
    fn test_label_without_checkbox_ignored() {
        assert!(parse_ban_list("<label>Refresh</label>").is_empty());
    }

    #[test]
    fn test_join_all_numbers() {
        assert_eq!(join_all_numbers("10,000"), "10000");
    }
}
