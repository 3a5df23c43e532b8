//! Operations combining temporal profiles.
use crate::composite::CompositeTemporalProfiles;
use crate::error::{ProfileError, ProfileResult, shape_err, value_err};
use crate::id::{CategoryID, SubstanceID};
use crate::index::CompositeAssignment;
use crate::profile::{ProfileType, TemporalProfile};
use itertools::Itertools;
use log::debug;
use ndarray::{Array1, Axis};

/// Either existing composite profiles or a list of profiles per slot
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileSet {
    /// Already built composite profiles
    Composite(CompositeTemporalProfiles),
    /// A list of profiles for each slot
    Slots(Vec<Vec<TemporalProfile>>),
}

impl From<CompositeTemporalProfiles> for ProfileSet {
    fn from(composite: CompositeTemporalProfiles) -> Self {
        Self::Composite(composite)
    }
}

impl From<Vec<Vec<TemporalProfile>>> for ProfileSet {
    fn from(slots: Vec<Vec<TemporalProfile>>) -> Self {
        Self::Slots(slots)
    }
}

impl TryFrom<ProfileSet> for CompositeTemporalProfiles {
    type Error = ProfileError;

    fn try_from(set: ProfileSet) -> ProfileResult<Self> {
        match set {
            ProfileSet::Composite(composite) => Ok(composite),
            ProfileSet::Slots(slots) => CompositeTemporalProfiles::new(&slots),
        }
    }
}

/// Concatenate the slots of several sets of profiles into one [`CompositeTemporalProfiles`].
///
/// ```
/// use emiprof::operators::concatenate_profiles;
/// use emiprof::profile::{ProfileType, TemporalProfile};
///
/// let weekly = TemporalProfile::uniform(ProfileType::Weekly);
/// let daily = TemporalProfile::uniform(ProfileType::Daily);
/// let slots = vec![vec![weekly.clone(), daily], vec![weekly]];
/// let profiles = concatenate_profiles([slots.clone(), slots]).unwrap();
/// assert_eq!(profiles.len(), 4);
/// ```
///
/// A single list of slots is ambiguous and is not accepted:
///
/// ```compile_fail
/// use emiprof::operators::concatenate_profiles;
/// use emiprof::profile::{ProfileType, TemporalProfile};
///
/// let weekly = TemporalProfile::uniform(ProfileType::Weekly);
/// let daily = TemporalProfile::uniform(ProfileType::Daily);
/// concatenate_profiles(vec![vec![weekly.clone(), daily], vec![weekly]]);
/// ```
pub fn concatenate_profiles<I, P>(sets: I) -> ProfileResult<CompositeTemporalProfiles>
where
    I: IntoIterator<Item = P>,
    P: Into<ProfileSet>,
{
    let composites: Vec<CompositeTemporalProfiles> = sets
        .into_iter()
        .map(|set| CompositeTemporalProfiles::try_from(set.into()))
        .try_collect()?;

    CompositeTemporalProfiles::join(&composites)
}

/// Combine several profiles of the same type into one, weighting each by `weights`.
///
/// This gives the profile of the summed emissions of sources which each follow one of `profiles`
/// and emit in proportion to their weight. For each period `p` the result is
/// `sum_i(weights[i] * ratios[i][p]) / sum_i(weights[i])`.
pub fn weighted_combination(
    profiles: &[TemporalProfile],
    weights: &[f64],
) -> ProfileResult<TemporalProfile> {
    let Some(first) = profiles.first() else {
        shape_err!("No profiles to combine");
    };
    if profiles.len() != weights.len() {
        shape_err!(
            "Got {} profiles but {} weights",
            profiles.len(),
            weights.len()
        );
    }

    let profile_type = first.profile_type();
    for profile in profiles {
        if profile.profile_type() != profile_type {
            return Err(ProfileError::Type(format!(
                "Cannot combine {} profile with {profile_type} profile",
                profile.profile_type()
            )));
        }
        if profile.n_profiles() != 1 {
            shape_err!(
                "Only single-row profiles can be combined, got {} rows",
                profile.n_profiles()
            );
        }
    }
    if let Some(weight) = weights.iter().find(|weight| !weight.is_finite() || **weight < 0.0) {
        value_err!("Weights must be finite and non-negative, got {weight}");
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        value_err!("Weights of combined profiles sum to zero");
    }

    let mut combined = Array1::zeros(profile_type.size());
    for (profile, weight) in profiles.iter().zip(weights) {
        combined.scaled_add(*weight, &profile.ratios().row(0));
    }
    combined /= total;

    TemporalProfile::new(profile_type, combined.insert_axis(Axis(0)))
}

/// Aggregate the slots of composite profiles into groups.
///
/// For every group and every profile type present among its slots, the profiles are merged with
/// [`weighted_combination`]. A slot without a profile of that type contributes a uniform profile.
/// If all the weights of a group are zero, the slots of the group are weighted equally.
///
/// A placeholder (all-zero) row with a non-zero weight makes the combined row sum to less than
/// one, which is reported as [`ProfileError::Normalisation`]. Placeholders with zero weight are
/// ignored.
///
/// # Arguments
///
/// * `composite` - The profiles to aggregate
/// * `weights` - The weight of each slot (e.g. from [`get_weights_of_gdf_profiles`])
/// * `groups` - The group each slot belongs to; groups are numbered from zero
///
/// # Returns
///
/// Composite profiles with one slot per group.
pub fn combine_profiles(
    composite: &CompositeTemporalProfiles,
    weights: &[f64],
    groups: &[usize],
) -> ProfileResult<CompositeTemporalProfiles> {
    if weights.len() != composite.len() || groups.len() != composite.len() {
        shape_err!(
            "Expected {} weights and groups, got {} weights and {} groups",
            composite.len(),
            weights.len(),
            groups.len()
        );
    }

    if let Some(weight) = weights.iter().find(|weight| !weight.is_finite() || **weight < 0.0) {
        value_err!("Weights must be finite and non-negative, got {weight}");
    }

    let n_groups = groups.iter().max().map_or(0, |group| group + 1);
    let members = groups.iter().enumerate().into_group_map_by(|(_, group)| **group);

    let mut grouped = Vec::with_capacity(n_groups);
    for group in 0..n_groups {
        let slots = members
            .get(&group)
            .map(|members| members.iter().map(|(slot, _)| *slot).collect_vec())
            .unwrap_or_default();
        grouped.push(combine_slots(composite, weights, &slots)?);
    }

    debug!(
        "Combined {} slots into {n_groups} groups",
        composite.len()
    );

    CompositeTemporalProfiles::new(&grouped)
}

/// Combine the profiles of the given slots, type by type
fn combine_slots(
    composite: &CompositeTemporalProfiles,
    weights: &[f64],
    slots: &[usize],
) -> ProfileResult<Vec<TemporalProfile>> {
    let mut slot_weights = slots.iter().map(|slot| weights[*slot]).collect_vec();
    if slot_weights.iter().sum::<f64>() <= 0.0 {
        slot_weights.fill(1.0);
    }

    let mut combined = Vec::new();
    for profile_type in composite.types() {
        let Some(table) = composite.profile_table(profile_type) else {
            continue;
        };
        if slots.iter().all(|slot| table.indexes()[*slot].is_none()) {
            continue;
        }

        let profiles = slots
            .iter()
            .map(|slot| slot_profile(composite, profile_type, *slot))
            .collect_vec();
        combined.push(weighted_combination(&profiles, &slot_weights)?);
    }

    Ok(combined)
}

/// The profile of the given type for a slot, or a uniform profile if it has none
fn slot_profile(
    composite: &CompositeTemporalProfiles,
    profile_type: ProfileType,
    slot: usize,
) -> TemporalProfile {
    composite
        .profile_table(profile_type)
        .and_then(|table| {
            table.indexes()[slot].map(|row| {
                TemporalProfile::from_trusted_row(profile_type, table.ratios().row(row))
            })
        })
        .unwrap_or_else(|| TemporalProfile::uniform(profile_type))
}

/// Emissions of one substance from one category, as found in an inventory
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionRecord {
    /// The emission category
    pub category: CategoryID,
    /// The emitted substance
    pub substance: SubstanceID,
    /// The amount emitted
    pub value: f64,
}

/// Sum the emissions attributed to each slot of composite profiles.
///
/// The resulting weights can be passed to [`combine_profiles`]. Emissions of (category, substance)
/// pairs which have no slot are ignored.
pub fn get_weights_of_gdf_profiles<'a, I>(
    emissions: I,
    assignment: &CompositeAssignment,
) -> ProfileResult<Vec<f64>>
where
    I: IntoIterator<Item = &'a EmissionRecord>,
{
    let mut weights = vec![0.0; assignment.profiles().len()];
    for record in emissions {
        if !record.value.is_finite() || record.value < 0.0 {
            value_err!(
                "Invalid emission value {} (category: {}, substance: {})",
                record.value,
                record.category,
                record.substance
            );
        }

        match assignment.slot(&record.category.0, &record.substance.0) {
            Some(slot) => weights[slot] += record.value,
            None => debug!(
                "No profile for category {} and substance {}; ignoring its emissions",
                record.category, record.substance
            ),
        }
    }

    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{
        assert_profile_error, daily, monthly_pair, weekly, weekly_daily_composite, weekly_single,
    };
    use crate::index::{ProfileIndexArray, make_composite_profiles, merge_indexes};
    use crate::profile::RATIO_SUM_TOLERANCE;
    use crate::registry::AnyProfiles;
    use float_cmp::assert_approx_eq;
    use ndarray::array;
    use rstest::rstest;

    fn weekly_from(ratios: [f64; 7]) -> TemporalProfile {
        TemporalProfile::from_vec(ProfileType::Weekly, ratios.to_vec()).unwrap()
    }

    #[rstest]
    fn test_concatenate_composites(weekly_daily_composite: CompositeTemporalProfiles) {
        let profiles =
            concatenate_profiles([weekly_daily_composite.clone(), weekly_daily_composite]).unwrap();
        assert_eq!(profiles.n_profiles(), 4);
        let lengths = profiles.iter().map(|slot| slot.len()).collect_vec();
        assert_eq!(lengths, [2, 1, 2, 1]);
    }

    #[rstest]
    fn test_concatenate_lists(
        weekly: TemporalProfile,
        daily: TemporalProfile,
        weekly_daily_composite: CompositeTemporalProfiles,
    ) {
        let slots = vec![vec![weekly.clone(), daily], vec![weekly]];
        let profiles = concatenate_profiles([slots.clone(), slots]).unwrap();
        let lengths = profiles.iter().map(|slot| slot.len()).collect_vec();
        assert_eq!(lengths, [2, 1, 2, 1]);

        // Same as building the composites first and joining them
        let expected =
            CompositeTemporalProfiles::join([&weekly_daily_composite, &weekly_daily_composite])
                .unwrap();
        assert_eq!(profiles, expected);
    }

    #[rstest]
    fn test_concatenate_mixed(
        weekly: TemporalProfile,
        weekly_daily_composite: CompositeTemporalProfiles,
    ) {
        let sets: [ProfileSet; 2] = [
            weekly_daily_composite.into(),
            vec![vec![weekly]].into(),
        ];
        let profiles = concatenate_profiles(sets).unwrap();
        assert_eq!(profiles.len(), 3);
    }

    #[test]
    fn test_concatenate_invalid_slots() {
        let weekly = TemporalProfile::uniform(ProfileType::Weekly);
        assert_profile_error!(
            concatenate_profiles([vec![vec![weekly.clone(), weekly]]]),
            Value
        );
    }

    #[test]
    fn test_weighted_combination() {
        let combined = weighted_combination(
            &[
                weekly_from([0.1, 0.2, 0.3, 0.4, 0.0, 0.0, 0.0]),
                weekly_from([0.2, 0.1, 0.3, 0.4, 0.0, 0.0, 0.0]),
                weekly_from([0.3, 0.0, 0.3, 0.4, 0.0, 0.0, 0.0]),
            ],
            &[1.0, 2.0, 3.0],
        )
        .unwrap();

        // Same as summing the emissions one by one
        let expected = [7.0 / 30.0, 2.0 / 30.0, 0.3, 0.4, 0.0, 0.0, 0.0];
        assert_eq!(combined.profile_type(), ProfileType::Weekly);
        for (actual, expected) in combined.ratios().iter().zip(expected) {
            assert_approx_eq!(f64, *actual, expected, epsilon = 1e-12);
        }
    }

    #[rstest]
    #[case(&[0.0, 0.0])]
    #[case(&[1.0, -1.0])]
    #[case(&[f64::NAN, 1.0])]
    fn test_weighted_combination_invalid_weights(weekly: TemporalProfile, #[case] weights: &[f64]) {
        assert_profile_error!(
            weighted_combination(&[weekly.clone(), weekly], weights),
            Value
        );
    }

    #[rstest]
    fn test_weighted_combination_mismatched_types(weekly: TemporalProfile, daily: TemporalProfile) {
        assert_profile_error!(weighted_combination(&[weekly, daily], &[1.0, 1.0]), Type);
    }

    #[rstest]
    fn test_weighted_combination_mismatched_lengths(weekly: TemporalProfile) {
        assert_profile_error!(weighted_combination(&[weekly], &[1.0, 1.0]), Shape);
        assert_profile_error!(weighted_combination(&[], &[]), Shape);
    }

    #[rstest]
    fn test_weighted_combination_multi_row(monthly_pair: TemporalProfile) {
        assert_profile_error!(weighted_combination(&[monthly_pair], &[1.0]), Shape);
    }

    #[test]
    fn test_combine_profiles() {
        let a = weekly_from([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let b = weekly_from([0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let daily = TemporalProfile::from_vec(
            ProfileType::Daily,
            (0..24).map(|hour| if hour == 12 { 1.0 } else { 0.0 }).collect(),
        )
        .unwrap();
        let composite = CompositeTemporalProfiles::new(&[
            vec![a.clone(), daily],
            vec![b],
            vec![a.clone()],
        ])
        .unwrap();

        let combined = combine_profiles(&composite, &[1.0, 3.0, 5.0], &[0, 0, 1]).unwrap();
        assert_eq!(combined.len(), 2);

        let group0 = combined.get(0).unwrap();
        assert_eq!(group0.len(), 2);
        let weekly_ratios = group0[0].ratios();
        assert_approx_eq!(f64, weekly_ratios[[0, 0]], 0.25);
        assert_approx_eq!(f64, weekly_ratios[[0, 1]], 0.75);

        // The slot without a daily profile counts as uniform
        let daily_ratios = group0[1].ratios();
        assert_approx_eq!(f64, daily_ratios[[0, 12]], 0.25 + 0.75 / 24.0);
        assert_approx_eq!(f64, daily_ratios.sum(), 1.0, epsilon = RATIO_SUM_TOLERANCE);

        assert_eq!(combined.get(1).unwrap(), [a]);
    }

    #[rstest]
    fn test_combine_profiles_zero_weights(weekly_daily_composite: CompositeTemporalProfiles) {
        let combined = combine_profiles(&weekly_daily_composite, &[0.0, 0.0], &[0, 0]).unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined.get(0).unwrap().len(), 2);
    }

    #[rstest]
    fn test_combine_profiles_placeholder(weekly: TemporalProfile) {
        let composite = CompositeTemporalProfiles::new(&[
            vec![TemporalProfile::placeholder(ProfileType::Weekly)],
            vec![weekly.clone()],
        ])
        .unwrap();

        // Without weight the placeholder does not contribute
        let combined = combine_profiles(&composite, &[0.0, 2.0], &[0, 0]).unwrap();
        assert_eq!(combined.get(0).unwrap(), [weekly]);

        assert_profile_error!(
            combine_profiles(&composite, &[1.0, 1.0], &[0, 0]),
            Normalisation
        );
    }

    #[rstest]
    fn test_combine_profiles_wrong_lengths(weekly_daily_composite: CompositeTemporalProfiles) {
        assert_profile_error!(
            combine_profiles(&weekly_daily_composite, &[1.0], &[0, 0]),
            Shape
        );
    }

    #[rstest]
    fn test_get_weights_of_gdf_profiles(
        monthly_pair: TemporalProfile,
        weekly_single: TemporalProfile,
    ) {
        let registry = AnyProfiles::from(vec![monthly_pair, weekly_single]);
        let combined = merge_indexes(&[ProfileIndexArray::new(
            ProfileType::Monthly,
            vec!["blek".into(), "liku".into()],
            vec!["CO2".into()],
            array![[Some(0)], [Some(1)]],
        )
        .unwrap()])
        .unwrap();
        let assignment = make_composite_profiles(&registry, &combined).unwrap();

        let record = |category: &str, value| EmissionRecord {
            category: category.into(),
            substance: "CO2".into(),
            value,
        };
        let emissions = [
            record("blek", 1.0),
            record("liku", 2.0),
            record("blek", 0.5),
            record("road", 10.0),
        ];
        let weights = get_weights_of_gdf_profiles(&emissions, &assignment).unwrap();
        assert_eq!(weights, [1.5, 2.0]);

        assert_profile_error!(
            get_weights_of_gdf_profiles(&[record("blek", -1.0)], &assignment),
            Value
        );
    }
}
