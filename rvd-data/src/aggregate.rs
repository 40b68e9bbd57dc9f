//! Grouping and summing of SARI records.
//!
//! Two modes cover every chart: [`time_series`] sums diagnosis counts per
//! week, and [`CrossTab`] sums a count per combination of categorical
//! dimensions while tracking the population exposure needed for per-100k
//! rates. Both take records that already passed a
//! [`RecordFilter`](crate::filter::RecordFilter) and never fail: an empty
//! input gives an empty result.

use crate::models::Series;
use log::debug;
use rvd_core::{
    calendar_week::CalendarWeek,
    diagnosis::{Diagnosis, DiagnosisCounts, DiagnosisInfo},
    sari::SariRecord,
};
use rvd_utils::{color::ward_color, dates::format_date};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const PER_100K: f64 = 100_000.0;

/// `count / population * 100_000`, or 0 when there is no population.
pub fn per_100k(count: f64, population: f64) -> f64 {
    if population > 0.0 {
        count / population * PER_100K
    } else {
        0.0
    }
}

/// Display name and base colour for each diagnosis.
pub(crate) fn diagnosis_style(diagnosis: Diagnosis, infos: &[DiagnosisInfo]) -> (String, Option<String>) {
    infos
        .iter()
        .find(|info| info.diagnosis == diagnosis)
        .map(|info| (info.name.clone(), Some(info.color.clone())))
        .unwrap_or_else(|| (diagnosis.field().to_string(), None))
}

fn sum_by_week<'a, I>(records: I, diagnoses: &[Diagnosis]) -> BTreeMap<CalendarWeek, DiagnosisCounts>
where
    I: IntoIterator<Item = &'a SariRecord>,
{
    let mut by_week: BTreeMap<CalendarWeek, DiagnosisCounts> = BTreeMap::new();
    for record in records {
        let entry = by_week.entry(record.week).or_default();
        for diagnosis in diagnoses {
            entry.add(*diagnosis, record.count(*diagnosis));
        }
    }
    by_week
}

/// One series per diagnosis with the weekly totals, dates ascending.
pub fn time_series(records: &[&SariRecord], diagnoses: &[Diagnosis]) -> Vec<Series> {
    if records.is_empty() {
        return Vec::new();
    }
    let infos = DiagnosisInfo::get_diagnosis_vector();
    let by_week = sum_by_week(records.iter().copied(), diagnoses);
    let series: Vec<Series> = diagnoses
        .iter()
        .map(|diagnosis| {
            let (name, color) = diagnosis_style(*diagnosis, &infos);
            let mut series = Series::new(name).with_color(color);
            for (week, counts) in &by_week {
                series.push(format_date(&week.monday()), counts.get(*diagnosis) as f64);
            }
            series
        })
        .collect();
    debug!(
        "time_series: {} series over {} weeks",
        series.len(),
        by_week.len()
    );
    series
}

/// Like [`time_series`], split by ward type. Series are ordered by diagnosis
/// first, then ward; intensive care series get a lighter colour. Records
/// without a ward are left out.
pub fn ward_time_series(records: &[&SariRecord], diagnoses: &[Diagnosis]) -> Vec<Series> {
    let mut by_ward: BTreeMap<&str, Vec<&SariRecord>> = BTreeMap::new();
    for record in records.iter().copied() {
        if let Some(ward) = record.ward.as_deref() {
            by_ward.entry(ward).or_default().push(record);
        }
    }
    if by_ward.is_empty() {
        return Vec::new();
    }

    let infos = DiagnosisInfo::get_diagnosis_vector();
    let sums: BTreeMap<&str, BTreeMap<CalendarWeek, DiagnosisCounts>> = by_ward
        .iter()
        .map(|(ward, rows)| (*ward, sum_by_week(rows.iter().copied(), diagnoses)))
        .collect();

    let mut out = Vec::with_capacity(diagnoses.len() * sums.len());
    for diagnosis in diagnoses {
        let (name, base) = diagnosis_style(*diagnosis, &infos);
        for (ward, by_week) in &sums {
            let color = base.as_deref().and_then(|c| ward_color(c, ward).ok());
            let mut series = Series::new(name.clone()).with_group(*ward).with_color(color);
            for (week, counts) in by_week {
                series.push(format_date(&week.monday()), counts.get(*diagnosis) as f64);
            }
            out.push(series);
        }
    }
    debug!("ward_time_series: {} series", out.len());
    out
}

/// A grouping axis of a [`CrossTab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    AgeGroup,
    Gender,
    Ward,
    Diagnosis,
    Week,
}

/// Composite bucket key. Dimensions that are not grouped on stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub age_group: Option<String>,
    pub gender: Option<String>,
    pub ward: Option<String>,
    pub diagnosis: Option<Diagnosis>,
    pub week: Option<CalendarWeek>,
}

impl BucketKey {
    fn for_record(record: &SariRecord, dims: &[Dimension], diagnosis: Option<Diagnosis>) -> Self {
        let has = |d: Dimension| dims.contains(&d);
        BucketKey {
            age_group: record.age_group.clone().filter(|_| has(Dimension::AgeGroup)),
            gender: record.gender.clone().filter(|_| has(Dimension::Gender)),
            ward: record.ward.clone().filter(|_| has(Dimension::Ward)),
            diagnosis,
            week: has(Dimension::Week).then_some(record.week),
        }
    }

    pub fn age_group(mut self, age_group: &str) -> Self {
        self.age_group = Some(age_group.to_string());
        self
    }

    pub fn gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn ward(mut self, ward: &str) -> Self {
        self.ward = Some(ward.to_string());
        self
    }

    pub fn diagnosis(mut self, diagnosis: Diagnosis) -> Self {
        self.diagnosis = Some(diagnosis);
        self
    }

    pub fn week(mut self, week: CalendarWeek) -> Self {
        self.week = Some(week);
        self
    }
}

/// Weekly population samples per demographic cell.
///
/// A sample is taken at most once per (region, age group, gender, week):
/// the feeds repeat the population figure on every ward and diagnosis row
/// of the same cell. Samples of different regions add up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationTable {
    samples: BTreeMap<(String, String, CalendarWeek), i64>,
}

impl PopulationTable {
    pub fn from_records(records: &[&SariRecord]) -> Self {
        let mut seen = HashSet::new();
        let mut samples = BTreeMap::new();
        for record in records {
            let (Some(age), Some(gender)) = (record.age_group.as_deref(), record.gender.as_deref())
            else {
                continue;
            };
            if record.population <= 0
                || !seen.insert((record.region.as_str(), age, gender, record.week))
            {
                continue;
            }
            *samples
                .entry((age.to_string(), gender.to_string(), record.week))
                .or_insert(0) += record.population;
        }
        PopulationTable { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Population of the cells matching `age_group` and `gender` (`None`
    /// matches any). Each cell contributes the average over its weekly
    /// samples, restricted to `week` when given.
    pub fn population(
        &self,
        age_group: Option<&str>,
        gender: Option<&str>,
        week: Option<CalendarWeek>,
    ) -> f64 {
        let mut cells: BTreeMap<(&str, &str), (i64, usize)> = BTreeMap::new();
        for ((age, sex, sample_week), population) in &self.samples {
            if age_group.is_some_and(|a| a != age.as_str())
                || gender.is_some_and(|g| g != sex.as_str())
                || week.is_some_and(|w| w != *sample_week)
            {
                continue;
            }
            let cell = cells.entry((age.as_str(), sex.as_str())).or_default();
            cell.0 += population;
            cell.1 += 1;
        }
        cells
            .values()
            .map(|(sum, n)| *sum as f64 / *n as f64)
            .sum()
    }
}

/// Counts summed per [`BucketKey`] over the selected dimensions.
///
/// Without [`Dimension::Diagnosis`] the selected diagnoses are summed into a
/// single count per bucket.
#[derive(Debug, Clone, Default)]
pub struct CrossTab {
    dims: Vec<Dimension>,
    buckets: BTreeMap<BucketKey, i64>,
    population: PopulationTable,
}

impl CrossTab {
    pub fn build(records: &[&SariRecord], dims: &[Dimension], diagnoses: &[Diagnosis]) -> Self {
        let split = dims.contains(&Dimension::Diagnosis);
        let mut buckets: BTreeMap<BucketKey, i64> = BTreeMap::new();
        for record in records {
            if split {
                for diagnosis in diagnoses {
                    let key = BucketKey::for_record(record, dims, Some(*diagnosis));
                    *buckets.entry(key).or_insert(0) += record.count(*diagnosis);
                }
            } else {
                let total: i64 = diagnoses.iter().map(|d| record.count(*d)).sum();
                *buckets.entry(BucketKey::for_record(record, dims, None)).or_insert(0) += total;
            }
        }
        debug!("cross tab {:?}: {} buckets", dims, buckets.len());
        CrossTab {
            dims: dims.to_vec(),
            buckets,
            population: PopulationTable::from_records(records),
        }
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, i64)> {
        self.buckets.iter().map(|(k, v)| (k, *v))
    }

    /// Summed count of a bucket, 0 when absent.
    pub fn count(&self, key: &BucketKey) -> i64 {
        self.buckets.get(key).copied().unwrap_or(0)
    }

    /// Average population behind a bucket.
    pub fn population(&self, key: &BucketKey) -> f64 {
        self.population
            .population(key.age_group.as_deref(), key.gender.as_deref(), key.week)
    }

    /// The bucket count, or its per-100k rate when `per_100k` is set.
    pub fn value(&self, key: &BucketKey, per_100k_rate: bool) -> f64 {
        let count = self.count(key) as f64;
        if per_100k_rate {
            per_100k(count, self.population(key))
        } else {
            count
        }
    }

    /// Distinct values of the weeks grouped on, ascending.
    pub fn weeks(&self) -> Vec<CalendarWeek> {
        self.buckets
            .keys()
            .filter_map(|k| k.week)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
