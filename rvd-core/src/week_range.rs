use crate::calendar_week::CalendarWeek;
use std::mem::replace;

/// A week range iterator that yields each calendar week from the start week
/// through the end week (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct WeekRange(pub CalendarWeek, pub CalendarWeek);

impl Iterator for WeekRange {
    type Item = CalendarWeek;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0.next();
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WeekRange;
    use crate::calendar_week::CalendarWeek;

    #[test]
    fn test_week_range_across_long_year() {
        let start = CalendarWeek::new(52, 2020).unwrap();
        let end = CalendarWeek::new(2, 2021).unwrap();
        let weeks: Vec<String> = WeekRange(start, end).map(|w| w.to_string()).collect();
        assert_eq!(
            weeks,
            vec!["52. KW 2020", "53. KW 2020", "1. KW 2021", "2. KW 2021"]
        );
    }

    #[test]
    fn test_week_range_single_week() {
        let start = CalendarWeek::new(10, 2024).unwrap();
        let weeks: Vec<CalendarWeek> = WeekRange(start, start).collect();
        assert_eq!(weeks, vec![start]);
    }

    #[test]
    fn test_week_range_empty() {
        let start = CalendarWeek::new(10, 2024).unwrap();
        let end = CalendarWeek::new(9, 2024).unwrap();
        assert_eq!(WeekRange(start, end).count(), 0);
    }
}
