//! Expanding temporal profiles into hourly time series.
use crate::error::{ProfileResult, shape_err};
use crate::profile::{ProfileType, TemporalProfile};
use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};

/// How the values of a [`TimeSerie`] are scaled
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SerieScaling {
    /// The product of the raw ratios
    Ratios,
    /// The product of the ratios multiplied by their profile size, so uniform profiles give 1
    ScalingFactors,
}

/// An hourly series of the combined value of several profiles.
///
/// The series covers every hour from `start` up to and including `end`. Values are computed lazily
/// and the series can be iterated over any number of times.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSerie {
    start: NaiveDateTime,
    n_hours: usize,
    profiles: Vec<TemporalProfile>,
    scaling: SerieScaling,
}

/// Create the hourly series of the products of the ratios of `profiles`.
///
/// For each hour, every profile contributes the ratio of the period the hour falls into:
///
/// * daily: the hour of the day
/// * weekly: the day of the week, starting on Monday
/// * monthly: the month of the year
/// * specific day: the hour of the day on the selected days, elsewhere the uniform ratio
/// * hour of (leap) year: the hour of the year, wrapping around the profile size
/// * generic: the number of hours since `start`, wrapping around the profile size
///
/// Each profile must have a single row.
pub fn create_time_serie(
    start: NaiveDateTime,
    end: NaiveDateTime,
    profiles: &[TemporalProfile],
) -> ProfileResult<TimeSerie> {
    TimeSerie::new(start, end, profiles, SerieScaling::Ratios)
}

/// Like [`create_time_serie`], but each ratio is multiplied by the size of its profile
pub fn create_scaling_factors_time_serie(
    start: NaiveDateTime,
    end: NaiveDateTime,
    profiles: &[TemporalProfile],
) -> ProfileResult<TimeSerie> {
    TimeSerie::new(start, end, profiles, SerieScaling::ScalingFactors)
}

impl TimeSerie {
    fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        profiles: &[TemporalProfile],
        scaling: SerieScaling,
    ) -> ProfileResult<Self> {
        if let Some(profile) = profiles.iter().find(|profile| profile.n_profiles() != 1) {
            shape_err!(
                "Time series can only be created from single-row profiles, got {profile}"
            );
        }
        if let Some(profile) = profiles.iter().find(|profile| profile.size() == 0) {
            shape_err!("Time series cannot be created from {profile} with no periods");
        }

        let n_hours = if end < start {
            0
        } else {
            usize::try_from((end - start).num_hours()).unwrap_or(0) + 1
        };

        Ok(Self {
            start,
            n_hours,
            profiles: profiles.to_vec(),
            scaling,
        })
    }

    /// The number of hours in the series
    pub fn len(&self) -> usize {
        self.n_hours
    }

    /// Whether the series has no values
    pub fn is_empty(&self) -> bool {
        self.n_hours == 0
    }

    /// The profiles combined in the series
    pub fn profiles(&self) -> &[TemporalProfile] {
        &self.profiles
    }

    /// Iterate over the timestamps and values of the series
    pub fn iter(&self) -> TimeSerieIter<'_> {
        TimeSerieIter {
            serie: self,
            hour: 0,
        }
    }

    /// Iterate over the values only
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// The value of the series for the given hour since the start
    fn value_at(&self, time: NaiveDateTime, hours_since_start: usize) -> f64 {
        self.profiles
            .iter()
            .map(|profile| {
                let ratio = match period_index(profile.profile_type(), time, hours_since_start) {
                    Some(period) => profile.ratios()[[0, period]],
                    None => 1.0 / profile.size() as f64,
                };
                match self.scaling {
                    SerieScaling::Ratios => ratio,
                    SerieScaling::ScalingFactors => ratio * profile.size() as f64,
                }
            })
            .product()
    }
}

/// The period of a profile that `time` falls into, or `None` if the profile does not apply
fn period_index(
    profile_type: ProfileType,
    time: NaiveDateTime,
    hours_since_start: usize,
) -> Option<usize> {
    let hour = time.hour() as usize;
    let period = match profile_type {
        ProfileType::Daily => hour,
        ProfileType::Weekly => time.weekday().num_days_from_monday() as usize,
        ProfileType::Monthly => time.month0() as usize,
        ProfileType::SpecificDay(day) => {
            if !day.contains(time.weekday().num_days_from_monday()) {
                return None;
            }
            hour
        }
        ProfileType::HourOfYear | ProfileType::HourOfLeapYear => {
            (time.ordinal0() as usize * 24 + hour) % profile_type.size()
        }
        ProfileType::Generic(size) => hours_since_start % size,
    };

    Some(period)
}

/// An iterator over the timestamps and values of a [`TimeSerie`]
pub struct TimeSerieIter<'a> {
    serie: &'a TimeSerie,
    hour: usize,
}

impl Iterator for TimeSerieIter<'_> {
    type Item = (NaiveDateTime, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.hour >= self.serie.n_hours {
            return None;
        }

        let hours = i64::try_from(self.hour).ok()?;
        let time = self.serie.start + TimeDelta::hours(hours);
        let value = self.serie.value_at(time, self.hour);
        self.hour += 1;

        Some((time, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.serie.n_hours - self.hour;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimeSerieIter<'_> {}

impl<'a> IntoIterator for &'a TimeSerie {
    type Item = (NaiveDateTime, f64);
    type IntoIter = TimeSerieIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
