//! Calendar view over archived sessions.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::core::aggregator::ArchivedRoutine;

/// One archived session shown on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub name: String,
    /// `name-<completedAt millis>-<position in the input>`, unique per listing.
    pub unique_id: String,
}

/// Group archived sessions by the UTC date of `completed_at`.
///
/// Entries within a day keep input order.
pub fn group_by_day(routines: &[ArchivedRoutine]) -> BTreeMap<NaiveDate, Vec<CalendarEntry>> {
    let mut days: BTreeMap<NaiveDate, Vec<CalendarEntry>> = BTreeMap::new();
    for (index, routine) in routines.iter().enumerate() {
        let unique_id = format!(
            "{}-{}-{}",
            routine.name,
            routine.completed_at.timestamp_millis(),
            index
        );
        days.entry(routine.completed_at.date_naive())
            .or_default()
            .push(CalendarEntry {
                name: routine.name.clone(),
                unique_id,
            });
    }
    days
}

/// Days with at least one session, ascending.
pub fn marked_days(days: &BTreeMap<NaiveDate, Vec<CalendarEntry>>) -> Vec<NaiveDate> {
    days.iter()
        .filter(|(_, entries)| !entries.is_empty())
        .map(|(day, _)| *day)
        .collect()
}

/// Timestamp used when a routine is logged for a whole day.
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::archived;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn groups_sessions_by_completion_date() {
        let routines = vec![
            archived("Leg Day", "2026-03-02T18:30:00Z"),
            archived("Push", "2026-03-04T07:00:00Z"),
            archived("Leg Day", "2026-03-02T06:00:00Z"),
        ];

        let days = group_by_day(&routines);

        assert_eq!(marked_days(&days), vec![day("2026-03-02"), day("2026-03-04")]);
        let monday = &days[&day("2026-03-02")];
        assert_eq!(monday.len(), 2);
        assert!(monday[0].unique_id.starts_with("Leg Day-"));
        assert!(monday[0].unique_id.ends_with("-0"));
        assert!(monday[1].unique_id.ends_with("-2"));
        assert_ne!(monday[0].unique_id, monday[1].unique_id);
    }

    #[test]
    fn start_of_day_is_midnight_utc() {
        let stamp = start_of_day(day("2026-03-02"));
        assert_eq!(stamp.to_rfc3339(), "2026-03-02T00:00:00+00:00");
        assert_eq!(stamp.date_naive(), day("2026-03-02"));
    }
}
