use crate::{error::Error, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Month (1-12) at which a new season begins when deriving seasons from dates.
pub const DEFAULT_CUTOVER_MONTH: u32 = 8;

/// A basketball season, labelled `"YYYY-YY"` after the calendar year it starts in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Season {
    start_year: i32,
}

impl Season {
    pub fn new(start_year: i32) -> Self {
        Season { start_year }
    }

    pub fn start_year(self) -> i32 {
        self.start_year
    }

    /// Games played in or after `cutover_month` belong to the season starting
    /// that year; earlier months close out the previous season.
    pub fn from_date(date: NaiveDate, cutover_month: u32) -> Self {
        if date.month() >= cutover_month {
            Season::new(date.year())
        } else {
            Season::new(date.year() - 1)
        }
    }

    /// Parses the leading `YYYY-MM-DD` of a date or timestamp string.
    pub fn from_date_str(date: &str, cutover_month: u32) -> Result<Self> {
        let day = date.trim().get(..10).unwrap_or(date);
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|_| Error::InvalidSeason(format!("unparseable game date {date}")))?;
        Ok(Season::from_date(date, cutover_month))
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

impl FromStr for Season {
    type Err = Error;

    /// Accepts `"2020-21"` or a bare start year such as `"2020"`.
    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim();
        let invalid = || Error::InvalidSeason(s.to_string());

        let (start, end) = match label.split_once('-') {
            Some((start, end)) => (start, Some(end)),
            None => (label, None),
        };
        if start.len() != 4 {
            return Err(invalid());
        }
        let start_year: i32 = start.parse().map_err(|_| invalid())?;
        if let Some(end) = end {
            let end: i32 = end.parse().map_err(|_| invalid())?;
            if end.to_string().len() > 2 || end != (start_year + 1).rem_euclid(100) {
                return Err(invalid());
            }
        }
        Ok(Season::new(start_year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips() {
        let season: Season = "2020-21".parse().unwrap();
        assert_eq!(season.start_year(), 2020);
        assert_eq!(season.to_string(), "2020-21");
        assert_eq!(Season::new(1999).to_string(), "1999-00");
    }

    #[test]
    fn bare_year_is_normalized() {
        assert_eq!("2020".parse::<Season>().unwrap().to_string(), "2020-21");
    }

    #[test]
    fn mismatched_or_garbage_labels_fail() {
        assert!("2020-22".parse::<Season>().is_err());
        assert!("20-21".parse::<Season>().is_err());
        assert!("season".parse::<Season>().is_err());
    }

    #[test]
    fn cutover_month_splits_calendar_year() {
        let fall = Season::from_date_str("2020-12-25", DEFAULT_CUTOVER_MONTH).unwrap();
        let spring = Season::from_date_str("2021-04-01T19:30:00", DEFAULT_CUTOVER_MONTH).unwrap();
        let august = Season::from_date_str("2021-08-01", DEFAULT_CUTOVER_MONTH).unwrap();
        assert_eq!(fall.to_string(), "2020-21");
        assert_eq!(spring, fall);
        assert_eq!(august.to_string(), "2021-22");
    }

    #[test]
    fn bad_date_is_an_error() {
        assert!(Season::from_date_str("yesterday", DEFAULT_CUTOVER_MONTH).is_err());
    }
}
