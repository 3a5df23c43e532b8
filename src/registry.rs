//! A pool of heterogeneous temporal profiles.
use crate::error::{ProfileError, ProfileResult};
use crate::profile::{ProfileType, TemporalProfile};

/// An ordered collection of profiles of arbitrary types.
///
/// Rows are addressed by their global position: row `k` is the `k`th row when walking through all
/// contained profiles in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnyProfiles {
    profiles: Vec<TemporalProfile>,
}

impl AnyProfiles {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a profile, returning the global position of its first row
    pub fn push(&mut self, profile: TemporalProfile) -> usize {
        let first_row = self.n_profiles();
        self.profiles.push(profile);
        first_row
    }

    /// The total number of rows across all profiles
    pub fn n_profiles(&self) -> usize {
        self.profiles.iter().map(TemporalProfile::n_profiles).sum()
    }

    /// Alias for [`AnyProfiles::n_profiles`]
    pub fn len(&self) -> usize {
        self.n_profiles()
    }

    /// Whether the registry holds no profiles
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterate over the contained profiles
    pub fn iter(&self) -> impl Iterator<Item = &TemporalProfile> {
        self.profiles.iter()
    }

    /// Get the row at global position `index` as a single-row profile
    pub fn get(&self, index: usize) -> Option<TemporalProfile> {
        let mut offset = 0;
        for profile in &self.profiles {
            let n_rows = profile.n_profiles();
            if index < offset + n_rows {
                return profile.row(index - offset);
            }
            offset += n_rows;
        }

        None
    }

    /// Get the row at global position `index`, checking it has the expected type.
    pub fn get_typed(&self, profile_type: ProfileType, index: usize) -> ProfileResult<TemporalProfile> {
        let profile = self.get(index).ok_or_else(|| {
            ProfileError::Lookup(format!(
                "Profile {index} requested but registry only has {} profiles",
                self.n_profiles()
            ))
        })?;
        if profile.profile_type() != profile_type {
            return Err(ProfileError::Type(format!(
                "Profile {index} is a {} profile, expected {profile_type}",
                profile.profile_type()
            )));
        }

        Ok(profile)
    }
}

impl FromIterator<TemporalProfile> for AnyProfiles {
    fn from_iter<I: IntoIterator<Item = TemporalProfile>>(iter: I) -> Self {
        Self {
            profiles: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<TemporalProfile>> for AnyProfiles {
    fn from(profiles: Vec<TemporalProfile>) -> Self {
        Self { profiles }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{monthly_pair, weekly_single};
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry(monthly_pair: TemporalProfile, weekly_single: TemporalProfile) -> AnyProfiles {
        AnyProfiles::from(vec![monthly_pair, weekly_single])
    }

    #[rstest]
    fn test_n_profiles(registry: AnyProfiles) {
        assert_eq!(registry.n_profiles(), 3);
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
    }

    #[rstest]
    fn test_get(registry: AnyProfiles, monthly_pair: TemporalProfile, weekly_single: TemporalProfile) {
        assert_eq!(registry.get(0), monthly_pair.row(0));
        assert_eq!(registry.get(1), monthly_pair.row(1));
        assert_eq!(registry.get(2), Some(weekly_single));
        assert_eq!(registry.get(3), None);
    }

    #[rstest]
    fn test_get_typed(registry: AnyProfiles) {
        assert!(registry.get_typed(ProfileType::Weekly, 2).is_ok());
        assert!(matches!(
            registry.get_typed(ProfileType::Weekly, 1),
            Err(ProfileError::Type(_))
        ));
        assert!(matches!(
            registry.get_typed(ProfileType::Weekly, 5),
            Err(ProfileError::Lookup(_))
        ));
    }

    #[test]
    fn test_push() {
        let mut registry = AnyProfiles::new();
        assert_eq!(registry.push(TemporalProfile::uniform(ProfileType::Daily)), 0);
        assert_eq!(registry.push(TemporalProfile::uniform(ProfileType::Weekly)), 1);
        assert_eq!(registry.iter().count(), 2);
    }
}
