use chrono::{DateTime, Utc};
use interim::{parse_date_string, Dialect};

/// Extract a natural-language date expression from free text.
///
/// The underlying parser consumes a date expression rather than scanning
/// prose, so the text is retried from each word boundary, left to right; the
/// first successful parse wins. Disambiguation between multiple candidate
/// expressions is the parser's own policy. Returns `None` when no part of
/// the text parses as a date.
pub fn extract_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    for start in word_starts(text) {
        if let Ok(date) = parse_date_string(&text[start..], now, Dialect::Us) {
            return Some(date);
        }
    }
    None
}

fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut previous_was_space = true;
    for (index, character) in text.char_indices() {
        if previous_was_space && !character.is_whitespace() {
            starts.push(index);
        }
        previous_was_space = character.is_whitespace();
    }
    starts
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone, Utc};

    use super::{extract_date, word_starts};

    fn reference_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn unit_word_starts_skips_runs_of_whitespace() {
        assert_eq!(word_starts("a  bc \t d"), vec![0, 3, 8]);
        assert!(word_starts("   ").is_empty());
    }

    #[test]
    fn functional_extract_date_finds_expression_inside_prose() {
        let date = extract_date("Remind me to do this on March 29th", reference_now())
            .expect("date expression");
        assert_eq!(date.month(), 3);
        assert_eq!(date.day(), 29);
    }

    #[test]
    fn functional_extract_date_accepts_bare_expressions() {
        let date = extract_date("tomorrow", reference_now()).expect("relative date");
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 16);
    }

    #[test]
    fn unit_extract_date_returns_none_without_a_date() {
        assert!(extract_date("no dates to be found here", reference_now()).is_none());
        assert!(extract_date("", reference_now()).is_none());
        assert!(extract_date("   ", reference_now()).is_none());
    }
}
