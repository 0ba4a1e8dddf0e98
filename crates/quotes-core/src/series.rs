//! Derived slices of an already-fetched [`TimeSeries`].

use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, Result};
use crate::types::TimeSeries;

/// Supported "most recent N days" windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesWindow {
    /// Last 7 points.
    Last7,
    /// Last 15 points.
    Last15,
    /// Last 30 points.
    Last30,
}

impl SeriesWindow {
    /// Returns the number of points in the window.
    #[must_use]
    pub const fn days(&self) -> usize {
        match self {
            Self::Last7 => 7,
            Self::Last15 => 15,
            Self::Last30 => 30,
        }
    }

    /// Resolves a window from a day count.
    pub fn from_days(days: usize) -> Result<Self> {
        match days {
            7 => Ok(Self::Last7),
            15 => Ok(Self::Last15),
            30 => Ok(Self::Last30),
            other => Err(QuoteError::Validation(format!(
                "Unsupported window: last {other} (expected 7, 15 or 30)"
            ))),
        }
    }
}

/// Returns the `n` most recent points of `series`.
///
/// Fails with [`QuoteError::Validation`] when `n` is zero. A window larger
/// than the series returns the whole series.
pub fn last_n(series: &TimeSeries, n: usize) -> Result<TimeSeries> {
    if n == 0 {
        return Err(QuoteError::Validation(
            "Window size must be positive".to_string(),
        ));
    }
    Ok(series.truncated(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SeriesInterval;
    use crate::types::{Symbol, TimeSeriesPoint};
    use chrono::{Days, NaiveDate};

    /// Builds a series whose payload order is ascending by date.
    fn ascending_series(len: u64) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = (0..len)
            .map(|i| {
                let px = 100.0 + i as f64;
                TimeSeriesPoint::new(start + Days::new(i), px, px, px, px, i * 10)
            })
            .collect();
        let symbol = Symbol::parse("AAPL").unwrap();
        TimeSeries::new(symbol, SeriesInterval::Daily, points)
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = last_n(&ascending_series(5), 0).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_oversized_window_returns_all() {
        let series = ascending_series(5);
        assert_eq!(last_n(&series, 30).unwrap(), series);
    }

    #[test]
    fn test_last_seven_is_prefix_of_last_thirty() {
        let series = ascending_series(40);
        let seven = last_n(&series, 7).unwrap();
        let thirty = last_n(&series, 30).unwrap();

        assert_eq!(seven.len(), 7);
        assert_eq!(thirty.len(), 30);
        assert_eq!(seven.points(), &thirty.points()[..7]);

        let expected = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(seven.latest().unwrap().date, expected);
        assert!(seven.points().windows(2).all(|w| w[0].date > w[1].date));
    }

    #[test]
    fn test_window_days() {
        assert_eq!(SeriesWindow::from_days(15).unwrap(), SeriesWindow::Last15);
        assert_eq!(SeriesWindow::Last30.days(), 30);
        assert!(SeriesWindow::from_days(10).is_err());
    }
}
