use chrono::{DateTime, Utc};

use crate::domain::email::{DailyCounts, DatedRecord, MessageRecord};

/// Outcome of aggregating one request's records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// Records with a valid date, in input order.
    pub rows: Vec<DatedRecord>,
    /// Records whose date could not be parsed.
    pub dropped: Vec<MessageRecord>,
    pub counts: DailyCounts,
}

/// Formats tried after strict RFC 2822, applied to the normalised text.
const LENIENT_FORMATS: [&str; 2] = ["%d %b %Y %H:%M:%S %z", "%d %b %Y %H:%M %z"];

/// Collapses whitespace and strips the weekday, a trailing `(comment)`
/// and a `UTC` zone name, which strict RFC 2822 parsing rejects.
fn normalise_mail_date(raw: &str) -> String {
    let without_comment = match raw.find('(') {
        Some(i) => &raw[..i],
        None => raw,
    };
    let mut s = without_comment.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some((weekday, rest)) = s.split_once(',')
        && weekday.len() == 3
        && weekday.chars().all(|c| c.is_ascii_alphabetic())
    {
        s = rest.trim_start().to_string();
    }
    if let Some(stripped) = s.strip_suffix(" UTC") {
        s = format!("{stripped} +0000");
    }
    s
}

/// Parses a `Date` header value into UTC.
///
/// Strict RFC 2822 is tried first, then the same text without weekday,
/// comments or doubled spaces. Anything that does not carry a full
/// day, month, year and time is rejected.
pub fn parse_mail_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(d) = DateTime::parse_from_rfc2822(raw) {
        return Some(d.with_timezone(&Utc));
    }

    let s = normalise_mail_date(raw);
    DateTime::parse_from_rfc2822(&s)
        .ok()
        .or_else(|| {
            LENIENT_FORMATS
                .iter()
                .find_map(|f| DateTime::parse_from_str(&s, f).ok())
        })
        .map(|d| d.with_timezone(&Utc))
}

/// Groups records by UTC calendar day. Pure: the same input always yields
/// the same output.
pub fn aggregate(records: &[MessageRecord]) -> Aggregation {
    let mut out = Aggregation::default();

    for record in records {
        match parse_mail_date(&record.date) {
            Some(timestamp) => {
                let dated = DatedRecord {
                    record: record.clone(),
                    timestamp,
                };
                *out.counts.entry(dated.day()).or_insert(0) += 1;
                out.rows.push(dated);
            }
            None => out.dropped.push(record.clone()),
        }
    }

    if !out.dropped.is_empty() {
        log::debug!("Dropped {} rows with unparseable dates", out.dropped.len());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn rec(id: u32, date: &str) -> MessageRecord {
        MessageRecord {
            id,
            date: date.to_string(),
            subject: format!("subject {id}"),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_day_rows_are_counted_and_invalid_dropped() {
        let records = vec![
            rec(1, "Mon, 1 Jan 2024 10:00:00 +0000"),
            rec(2, "Mon, 1 Jan 2024 15:00:00 +0000"),
            rec(3, "not-a-date"),
        ];

        let agg = aggregate(&records);

        assert_eq!(agg.counts.len(), 1);
        assert_eq!(agg.counts.get(&day(2024, 1, 1)), Some(&2));
        assert_eq!(agg.rows.len(), 2);
        assert_eq!(agg.dropped, vec![rec(3, "not-a-date")]);
    }

    #[test]
    fn days_are_normalised_to_utc() {
        // 23:30 at -0300 is already the next day in UTC
        let records = vec![rec(1, "Sun, 31 Dec 2023 23:30:00 -0300")];
        let agg = aggregate(&records);
        assert_eq!(agg.counts.keys().next(), Some(&day(2024, 1, 1)));
    }

    #[test]
    fn lenient_formats_are_accepted() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        for raw in [
            "1 Jan 2024 10:00:00 +0000",
            "Mon,  1 Jan 2024 10:00:00 +0000",
            "Mon, 1 Jan 2024 10:00:00 +0000 (UTC)",
            "Mon, 1 Jan 2024 10:00:00 UTC",
            "Wed, 1 Jan 2024 10:00:00 +0000",
            "Mon, 1 Jan 2024 10:00 +0000",
        ] {
            assert_eq!(parse_mail_date(raw), Some(expected), "{raw}");
        }
    }

    #[test]
    fn text_without_a_date_is_rejected() {
        for raw in ["", "   ", "not-a-date", "garbage", "hello world", "32 Foo 2024", "1 Jan 2024"] {
            assert_eq!(parse_mail_date(raw), None, "{raw}");
        }
    }

    #[test]
    fn garbage_never_lands_on_the_epoch() {
        let records = vec![rec(1, "garbage"), rec(2, "hello world"), rec(3, "not-a-date")];
        let agg = aggregate(&records);
        assert!(agg.counts.is_empty());
        assert!(agg.rows.is_empty());
        assert_eq!(agg.dropped.len(), 3);
    }

    #[test]
    fn keys_are_strictly_increasing() {
        let records = vec![
            rec(1, "Wed, 3 Jan 2024 09:00:00 +0000"),
            rec(2, "Mon, 1 Jan 2024 09:00:00 +0000"),
            rec(3, "Tue, 2 Jan 2024 09:00:00 +0000"),
            rec(4, "Mon, 1 Jan 2024 18:00:00 +0000"),
        ];
        let agg = aggregate(&records);
        let keys: Vec<_> = agg.counts.keys().copied().collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(keys, vec![day(2024, 1, 1), day(2024, 1, 2), day(2024, 1, 3)]);
    }

    #[test]
    fn sum_matches_parseable_rows_and_is_idempotent() {
        let records = vec![
            rec(1, "Mon, 1 Jan 2024 10:00:00 +0000"),
            rec(2, "garbage"),
            rec(3, "Fri, 5 Jan 2024 10:00:00 +0100"),
            rec(4, "Fri, 5 Jan 2024 11:00:00 +0100"),
            rec(5, "32 Foo 2024"),
        ];

        let first = aggregate(&records);
        let second = aggregate(&records);

        assert_eq!(first, second);
        assert_eq!(first.counts.values().sum::<usize>(), first.rows.len());
        assert_eq!(first.rows.len() + first.dropped.len(), records.len());
    }

    #[test]
    fn empty_input_is_empty_output() {
        let agg = aggregate(&[]);
        assert!(agg.counts.is_empty());
        assert!(agg.rows.is_empty());
        assert!(agg.dropped.is_empty());
    }
}
