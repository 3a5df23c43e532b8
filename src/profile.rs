//! Single temporal profiles.
//!
//! A temporal profile describes how the activity of an emission source is distributed over the
//! periods of a cycle (e.g. the hours of a day or the months of a year). Each row of a profile's
//! ratio matrix is one independent pattern whose values sum to one.
use crate::error::{ProfileError, ProfileResult, shape_err};
use derive_more::Display;
use float_cmp::approx_eq;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::fmt;
use std::str::FromStr;
use strum::{EnumIter, EnumString};

/// Tolerance used when checking that ratios sum to one
pub const RATIO_SUM_TOLERANCE: f64 = 1e-6;

/// The day(s) of the week a [`ProfileType::SpecificDay`] profile applies to
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    strum::Display,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[allow(missing_docs)]
pub enum SpecificDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    /// Monday to Friday
    Weekday,
    /// Saturday and Sunday
    Weekend,
}

impl SpecificDay {
    /// Whether the given weekday (counted from Monday = 0) is covered
    pub fn contains(self, days_from_monday: u32) -> bool {
        match self {
            Self::Weekday => days_from_monday < 5,
            Self::Weekend => days_from_monday >= 5,
            day => day as u32 == days_from_monday,
        }
    }
}

/// The kind of a temporal profile.
///
/// Every kind has a fixed number of periods per cycle, given by [`ProfileType::size`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum ProfileType {
    /// Hour of the day
    #[display("daily")]
    Daily,
    /// Day of the week
    #[display("weekly")]
    Weekly,
    /// Month of the year
    #[display("monthly")]
    Monthly,
    /// Hour of the day, only on the selected day(s)
    #[display("specific-day-{_0}")]
    SpecificDay(SpecificDay),
    /// Hour of a non-leap year
    #[display("hour-of-year")]
    HourOfYear,
    /// Hour of a leap year
    #[display("hour-of-leap-year")]
    HourOfLeapYear,
    /// A cycle of arbitrary length
    #[display("generic-{_0}")]
    Generic(usize),
}

impl ProfileType {
    /// Number of periods in one cycle
    pub fn size(self) -> usize {
        match self {
            Self::Daily | Self::SpecificDay(_) => 24,
            Self::Weekly => 7,
            Self::Monthly => 12,
            Self::HourOfYear => 8760,
            Self::HourOfLeapYear => 8784,
            Self::Generic(size) => size,
        }
    }
}

impl FromStr for ProfileType {
    type Err = ProfileError;

    fn from_str(s: &str) -> ProfileResult<Self> {
        let s = s.trim().to_ascii_lowercase();
        let profile_type = match s.as_str() {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            "hour-of-year" => Self::HourOfYear,
            "hour-of-leap-year" => Self::HourOfLeapYear,
            _ => {
                if let Some(day) = s.strip_prefix("specific-day-") {
                    let day = SpecificDay::from_str(day)
                        .map_err(|_| ProfileError::Type(format!("Unknown day '{day}'")))?;
                    Self::SpecificDay(day)
                } else if let Some(size) = s.strip_prefix("generic-") {
                    let size = size
                        .parse()
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or_else(|| ProfileError::Type(format!("Invalid size '{size}'")))?;
                    Self::Generic(size)
                } else {
                    return Err(ProfileError::Type(format!("Unknown profile type '{s}'")));
                }
            }
        };

        Ok(profile_type)
    }
}

/// One or more temporal patterns of the same [`ProfileType`].
///
/// The ratios are stored as a matrix of shape `(n_profiles, size)`.
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalProfile {
    profile_type: ProfileType,
    ratios: Array2<f64>,
}

impl TemporalProfile {
    /// Create a profile from a matrix of ratios, checking that every row sums to one.
    pub fn new(profile_type: ProfileType, ratios: Array2<f64>) -> ProfileResult<Self> {
        let profile = Self::new_unnormalised(profile_type, ratios)?;
        profile.check_normalised()?;

        Ok(profile)
    }

    /// Create a single-row profile from a vector of ratios
    pub fn from_vec(profile_type: ProfileType, ratios: Vec<f64>) -> ProfileResult<Self> {
        Self::new(profile_type, Array1::from(ratios).insert_axis(Axis(0)))
    }

    /// Create a profile without checking that the rows sum to one.
    ///
    /// Only the shape is validated. This is used for intermediate results.
    pub fn new_unnormalised(profile_type: ProfileType, ratios: Array2<f64>) -> ProfileResult<Self> {
        let size = profile_type.size();
        if size == 0 {
            shape_err!("{profile_type} profile must have at least one period");
        }
        if ratios.ncols() != size {
            shape_err!(
                "{profile_type} profile requires {size} ratios per row, got {}",
                ratios.ncols()
            );
        }
        if ratios.nrows() == 0 {
            shape_err!("{profile_type} profile must have at least one row");
        }

        Ok(Self {
            profile_type,
            ratios,
        })
    }

    /// A single row of equal ratios summing to one
    pub fn uniform(profile_type: ProfileType) -> Self {
        let size = profile_type.size();
        Self {
            profile_type,
            ratios: Array2::from_elem((1, size), 1.0 / size as f64),
        }
    }

    /// A single all-zero row, standing for "no activity"
    pub fn placeholder(profile_type: ProfileType) -> Self {
        Self {
            profile_type,
            ratios: Array2::zeros((1, profile_type.size())),
        }
    }

    /// Build a single-row profile from a row already known to have the right length
    pub(crate) fn from_trusted_row(profile_type: ProfileType, row: ArrayView1<'_, f64>) -> Self {
        debug_assert_eq!(row.len(), profile_type.size());
        Self {
            profile_type,
            ratios: row.to_owned().insert_axis(Axis(0)),
        }
    }

    /// The type of this profile
    pub fn profile_type(&self) -> ProfileType {
        self.profile_type
    }

    /// The number of periods in one cycle
    pub fn size(&self) -> usize {
        self.profile_type.size()
    }

    /// The ratio matrix, of shape `(n_profiles, size)`
    pub fn ratios(&self) -> &Array2<f64> {
        &self.ratios
    }

    /// The ratios of a single row
    pub fn row_ratios(&self, row: usize) -> Option<ArrayView1<'_, f64>> {
        (row < self.n_profiles()).then(|| self.ratios.row(row))
    }

    /// The number of rows (independent patterns) in this profile
    pub fn n_profiles(&self) -> usize {
        self.ratios.nrows()
    }

    /// Alias for [`TemporalProfile::n_profiles`]
    pub fn len(&self) -> usize {
        self.n_profiles()
    }

    /// Whether the profile has no rows
    pub fn is_empty(&self) -> bool {
        self.ratios.nrows() == 0
    }

    /// Extract a single row as its own profile
    pub fn row(&self, row: usize) -> Option<Self> {
        self.row_ratios(row)
            .map(|ratios| Self::from_trusted_row(self.profile_type, ratios))
    }

    /// Iterate over the rows as single-row profiles
    pub fn rows(&self) -> impl Iterator<Item = Self> + '_ {
        (0..self.n_profiles()).filter_map(|row| self.row(row))
    }

    /// Whether all rows are zero
    pub fn is_placeholder(&self) -> bool {
        self.ratios.iter().all(|ratio| approx_eq!(f64, *ratio, 0.0))
    }

    fn check_normalised(&self) -> ProfileResult<()> {
        for (row, ratios) in self.ratios.outer_iter().enumerate() {
            let sum = ratios.sum();
            if !approx_eq!(f64, sum, 1.0, epsilon = RATIO_SUM_TOLERANCE) {
                return Err(ProfileError::Normalisation {
                    profile_type: self.profile_type,
                    row,
                    sum,
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for TemporalProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} profile ({} rows)", self.profile_type, self.n_profiles())
    }
}
