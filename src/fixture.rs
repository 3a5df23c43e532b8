//! Fixtures for tests
use crate::composite::CompositeTemporalProfiles;
use crate::profile::{ProfileType, TemporalProfile};
use ndarray::array;
use rstest::fixture;

/// Assert that a result is an error of the given [`crate::error::ProfileError`] variant
macro_rules! assert_profile_error {
    ($result:expr, $variant:ident) => {
        match $result {
            Err($crate::error::ProfileError::$variant { .. }) => {}
            Err(err) => panic!("Unexpected error: {err}"),
            Ok(_) => panic!("Expected an error"),
        }
    };
}
pub(crate) use assert_profile_error;

#[fixture]
pub fn weekly() -> TemporalProfile {
    TemporalProfile::uniform(ProfileType::Weekly)
}

#[fixture]
pub fn daily() -> TemporalProfile {
    TemporalProfile::uniform(ProfileType::Daily)
}

/// Two monthly patterns in one profile
#[fixture]
pub fn monthly_pair() -> TemporalProfile {
    TemporalProfile::new(
        ProfileType::Monthly,
        array![
            [0.1, 0.2, 0.3, 0.4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.1, 0.2, 0.4, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        ],
    )
    .unwrap()
}

#[fixture]
pub fn weekly_single() -> TemporalProfile {
    TemporalProfile::from_vec(ProfileType::Weekly, vec![0.1, 0.2, 0.3, 0.1, 0.0, 0.0, 0.3]).unwrap()
}

/// A weekly + daily slot followed by a weekly-only slot
#[fixture]
pub fn weekly_daily_composite(
    weekly: TemporalProfile,
    daily: TemporalProfile,
) -> CompositeTemporalProfiles {
    CompositeTemporalProfiles::new(&[vec![weekly.clone(), daily], vec![weekly]]).unwrap()
}
