//! Chart derivation over daily logs: windowed weight series and macro
//! totals. Everything here is pure; callers pass `today` explicitly.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

use super::model::DailyLog;

/// Time span a chart covers, counted back from today inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartWindow {
    #[default]
    Week,
    Month,
    Quarter,
    Year,
}

impl ChartWindow {
    pub fn days(self) -> u64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    /// First date inside the window ending on `today`.
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(self.days() - 1))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        date >= self.start(today) && date <= today
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }
}

impl std::fmt::Display for ChartWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartWindow {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" | "7d" => Ok(Self::Week),
            "month" | "30d" => Ok(Self::Month),
            "quarter" | "90d" => Ok(Self::Quarter),
            "year" | "365d" => Ok(Self::Year),
            other => Err(TrackingError::UnknownWindow(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Weigh-ins inside the window, oldest first.
pub fn weight_series(logs: &[DailyLog], window: ChartWindow, today: NaiveDate) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = logs
        .iter()
        .filter(|log| window.contains(log.date, today))
        .filter_map(|log| {
            log.weight_kg.map(|value| ChartPoint {
                date: log.date,
                value,
            })
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

/// Sums of each tracked metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacroTotals {
    pub calories_kcal: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub water_ml: f64,
}

impl MacroTotals {
    fn add(&mut self, log: &DailyLog) {
        self.calories_kcal += f64::from(log.calories_kcal);
        self.protein_g += log.protein_g;
        self.carbs_g += log.carbs_g;
        self.fat_g += log.fat_g;
        self.water_ml += f64::from(log.water_ml);
    }

    fn divided_by(&self, days: usize) -> Self {
        if days == 0 {
            return Self::default();
        }
        let n = days as f64;
        Self {
            calories_kcal: self.calories_kcal / n,
            protein_g: self.protein_g / n,
            carbs_g: self.carbs_g / n,
            fat_g: self.fat_g / n,
            water_ml: self.water_ml / n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroSummary {
    pub window: ChartWindow,
    /// Logged days inside the window.
    pub days_logged: usize,
    pub totals: MacroTotals,
    /// Per logged day, not per calendar day.
    pub averages: MacroTotals,
}

pub fn macro_summary(logs: &[DailyLog], window: ChartWindow, today: NaiveDate) -> MacroSummary {
    let mut totals = MacroTotals::default();
    let mut days_logged = 0;
    for log in logs.iter().filter(|log| window.contains(log.date, today)) {
        totals.add(log);
        days_logged += 1;
    }
    MacroSummary {
        window,
        days_logged,
        totals,
        averages: totals.divided_by(days_logged),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn log(date: NaiveDate, weight: Option<f64>, protein: f64) -> DailyLog {
        DailyLog {
            client_id: "c1".into(),
            date,
            calories_kcal: 2000,
            weight_kg: weight,
            water_ml: 1500,
            protein_g: protein,
            carbs_g: 200.0,
            fat_g: 50.0,
        }
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let today = day(10);
        assert_eq!(ChartWindow::Week.start(today), day(4));
        assert!(ChartWindow::Week.contains(day(4), today));
        assert!(ChartWindow::Week.contains(today, today));
        assert!(!ChartWindow::Week.contains(day(3), today));
        assert!(!ChartWindow::Week.contains(day(11), today), "future excluded");
    }

    #[test]
    fn parse_window_names() {
        assert_eq!("Month".parse::<ChartWindow>().unwrap(), ChartWindow::Month);
        assert_eq!("90d".parse::<ChartWindow>().unwrap(), ChartWindow::Quarter);
        assert!(matches!(
            "decade".parse::<ChartWindow>(),
            Err(TrackingError::UnknownWindow(w)) if w == "decade"
        ));
    }

    #[test]
    fn weight_series_filters_and_sorts() {
        let today = day(10);
        let logs = vec![
            log(day(9), Some(71.0), 100.0),
            log(day(2), Some(74.0), 100.0),
            log(day(5), None, 100.0),
            log(day(6), Some(72.0), 100.0),
            log(day(12), Some(70.0), 100.0),
        ];
        let series = weight_series(&logs, ChartWindow::Week, today);
        let dates: Vec<_> = series.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(6), day(9)]);
        assert_eq!(series[0].value, 72.0);
    }

    #[test]
    fn macro_summary_averages_per_logged_day() {
        let today = day(10);
        let logs = vec![log(day(8), None, 100.0), log(day(10), None, 150.0)];
        let summary = macro_summary(&logs, ChartWindow::Week, today);
        assert_eq!(summary.days_logged, 2);
        assert_eq!(summary.totals.protein_g, 250.0);
        assert_eq!(summary.averages.protein_g, 125.0);
        assert_eq!(summary.averages.calories_kcal, 2000.0);
        assert_eq!(summary.averages.water_ml, 1500.0);
    }

    #[test]
    fn empty_window_has_zero_averages() {
        let summary = macro_summary(&[log(day(1), None, 90.0)], ChartWindow::Week, day(20));
        assert_eq!(summary.days_logged, 0);
        assert_eq!(summary.averages, MacroTotals::default());
        assert!(!summary.averages.protein_g.is_nan());
    }
}
