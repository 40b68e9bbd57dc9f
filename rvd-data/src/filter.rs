//! Record selection: region and ward filters, date windows, and the
//! distinct-value lists the selection controls are built from.

use chrono::NaiveDate;
use itertools::Itertools;
use rvd_core::{calendar_week::CalendarWeek, region::NATIONAL_CODE, sari::SariRecord};

/// Value meaning "no filter" for any categorical selection.
pub const ALL: &str = "ALL";

/// Age groups from youngest to oldest. Groups not listed here sort after
/// these, alphabetically.
pub const AGE_GROUP_ORDER: [&str; 8] = [
    "0-4", "5-9", "10-14", "15-19", "20-39", "40-59", "60-79", "80+",
];

/// A categorical filter: everything, or one exact value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// `ALL` (any case) or an empty value select everything.
    pub fn from_arg(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
            Selection::All
        } else {
            Selection::Only(value.to_string())
        }
    }

    /// Region selection: the national code means no regional filter.
    pub fn region(value: &str) -> Self {
        match Self::from_arg(value) {
            Selection::Only(code) if code.eq_ignore_ascii_case(NATIONAL_CODE) => Selection::All,
            other => other,
        }
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => value == Some(wanted.as_str()),
        }
    }
}

/// Filters applied to SARI records before any grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub region: Selection,
    pub ward: Selection,
    /// Inclusive bounds on the record date (the Monday of its week).
    pub dates: Option<(NaiveDate, NaiveDate)>,
}

impl RecordFilter {
    pub fn matches(&self, record: &SariRecord) -> bool {
        let in_range = match self.dates {
            Some((start, end)) => (start..=end).contains(&record.date()),
            None => true,
        };
        in_range
            && self.region.matches(Some(record.region.as_str()))
            && self.ward.matches(record.ward.as_deref())
    }

    pub fn apply<'a>(&self, records: &'a [SariRecord]) -> Vec<&'a SariRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Sorted distinct weeks of a dataset, addressed by ordinal index the way
/// the time window slider selects them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekIndex {
    weeks: Vec<CalendarWeek>,
}

impl WeekIndex {
    pub fn new<I: IntoIterator<Item = CalendarWeek>>(weeks: I) -> Self {
        Self {
            weeks: weeks.into_iter().sorted().dedup().collect(),
        }
    }

    pub fn from_records(records: &[SariRecord]) -> Self {
        Self::new(records.iter().map(|r| r.week))
    }

    /// Date bounds from optional index bounds; `None` when neither is set.
    pub fn bounds(&self, start: Option<usize>, end: Option<usize>) -> Option<(NaiveDate, NaiveDate)> {
        if start.is_none() && end.is_none() {
            return None;
        }
        self.window(start.unwrap_or(0), end.unwrap_or(usize::MAX))
    }

    pub fn weeks(&self) -> &[CalendarWeek] {
        &self.weeks
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn position(&self, week: &CalendarWeek) -> Option<usize> {
        self.weeks.binary_search(week).ok()
    }

    /// Inclusive date bounds, Monday of the first to Sunday of the last week,
    /// for the weeks at `start..=end`. Indices past the end are clamped and
    /// swapped bounds are reordered.
    pub fn window(&self, start: usize, end: usize) -> Option<(NaiveDate, NaiveDate)> {
        let last = self.weeks.len().checked_sub(1)?;
        let (lo, hi) = (start.min(end).min(last), start.max(end).min(last));
        Some((self.weeks[lo].monday(), self.weeks[hi].sunday()))
    }
}

/// Sort key placing known age groups in [`AGE_GROUP_ORDER`].
pub fn age_group_rank(group: &str) -> (usize, String) {
    let rank = AGE_GROUP_ORDER
        .iter()
        .position(|g| *g == group)
        .unwrap_or(AGE_GROUP_ORDER.len());
    (rank, group.to_string())
}

pub fn distinct_regions(records: &[SariRecord]) -> Vec<String> {
    records.iter().map(|r| r.region.clone()).sorted().dedup().collect()
}

pub fn distinct_wards(records: &[SariRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.ward.clone())
        .sorted()
        .dedup()
        .collect()
}

/// Age groups present in `records`, youngest first.
pub fn distinct_age_groups<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a SariRecord>,
{
    records
        .into_iter()
        .filter_map(|r| r.age_group.clone())
        .unique()
        .sorted_by_key(|g| age_group_rank(g))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvd_core::sari::parse_sari_csv;

    const CSV: &str = "KW;BUNDESLAND;STATION;ALTERSGRUPPE;COVID\n\
                       2. KW 2024;W;Normalstation;80+;1\n\
                       1. KW 2024;W;Intensivstation;0-4;2\n\
                       1. KW 2024;T;Normalstation;unbekannt;3\n\
                       3. KW 2024;T;Normalstation;20-39;4\n";

    #[test]
    fn test_selection_from_arg() {
        assert_eq!(Selection::from_arg("ALL"), Selection::All);
        assert_eq!(Selection::from_arg("all"), Selection::All);
        assert_eq!(Selection::from_arg(""), Selection::All);
        assert_eq!(Selection::from_arg("W"), Selection::Only("W".into()));
        assert_eq!(Selection::region("AT"), Selection::All);
        assert_eq!(Selection::region("T"), Selection::Only("T".into()));
        assert!(!Selection::Only("W".into()).matches(None));
    }

    #[test]
    fn test_record_filter() {
        let records = parse_sari_csv(CSV);
        let filter = RecordFilter {
            region: Selection::region("W"),
            ..RecordFilter::default()
        };
        assert_eq!(filter.apply(&records).len(), 2);

        let filter = RecordFilter {
            ward: Selection::from_arg("Normalstation"),
            ..RecordFilter::default()
        };
        assert_eq!(filter.apply(&records).len(), 3);

        let index = WeekIndex::from_records(&records);
        let filter = RecordFilter {
            dates: index.window(1, 2),
            ..RecordFilter::default()
        };
        let kept = filter.apply(&records);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| r.week.week() >= 2));
    }

    #[test]
    fn test_week_index_window_clamps() {
        let records = parse_sari_csv(CSV);
        let index = WeekIndex::from_records(&records);
        assert_eq!(index.len(), 3);
        assert_eq!(index.weeks()[0].to_string(), "1. KW 2024");

        let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        assert_eq!(index.window(0, 99), Some((date(1), date(21))));
        assert_eq!(index.window(2, 0), Some((date(1), date(21))));
        assert_eq!(WeekIndex::default().window(0, 3), None);
        assert_eq!(index.position(&index.weeks()[2]), Some(2));
        assert_eq!(index.bounds(None, None), None);
        assert_eq!(index.bounds(Some(2), None), Some((date(15), date(21))));
        assert_eq!(index.bounds(None, Some(0)), Some((date(1), date(7))));
    }

    #[test]
    fn test_distinct_values() {
        let records = parse_sari_csv(CSV);
        assert_eq!(distinct_regions(&records), vec!["T", "W"]);
        assert_eq!(distinct_wards(&records), vec!["Intensivstation", "Normalstation"]);
        assert_eq!(
            distinct_age_groups(&records),
            vec!["0-4", "20-39", "80+", "unbekannt"]
        );
    }
}
