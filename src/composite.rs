//! Composite temporal profiles.
//!
//! A [`CompositeTemporalProfiles`] holds, for each of N slots (e.g. one per combination of emission
//! category and substance), an ordered list of profiles of different types. When expanded to a time
//! series, the profiles of a slot are applied one after the other (e.g. month of year, then day of
//! week, then hour of day).
//!
//! Internally, profiles are grouped by type: each type has a matrix with the stacked ratios of all
//! its rows and an index array giving, for each slot, the row that applies (if any).
use crate::error::{ProfileError, ProfileResult, shape_err, value_err};
use crate::profile::{ProfileType, TemporalProfile};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis, s};

/// The stacked ratios of one profile type and the row used by each slot.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileTable {
    ratios: Array2<f64>,
    indexes: Vec<Option<usize>>,
}

impl ProfileTable {
    /// The stacked ratios, one row per distinct profile
    pub fn ratios(&self) -> &Array2<f64> {
        &self.ratios
    }

    /// For each slot, the row of [`ProfileTable::ratios`] applying to it
    pub fn indexes(&self) -> &[Option<usize>] {
        &self.indexes
    }

    /// The number of stacked rows
    pub fn n_rows(&self) -> usize {
        self.ratios.nrows()
    }
}

/// Ordered lists of temporal profiles for a number of slots.
#[derive(Clone, Debug, Default)]
pub struct CompositeTemporalProfiles {
    n_slots: usize,
    tables: IndexMap<ProfileType, ProfileTable>,
}

/// A profile table which is still being filled
struct TableBuilder {
    ratios: Vec<f64>,
    n_rows: usize,
    indexes: Vec<Option<usize>>,
}

/// Accumulates rows by type before the per-type matrices are built
struct CompositeBuilder {
    n_slots: usize,
    tables: IndexMap<ProfileType, TableBuilder>,
}

impl CompositeBuilder {
    fn new(n_slots: usize) -> Self {
        Self {
            n_slots,
            tables: IndexMap::new(),
        }
    }

    fn table(&mut self, profile_type: ProfileType) -> &mut TableBuilder {
        let n_slots = self.n_slots;
        self.tables
            .entry(profile_type)
            .or_insert_with(|| TableBuilder {
                ratios: Vec::new(),
                n_rows: 0,
                indexes: vec![None; n_slots],
            })
    }

    /// Add a new row for `slot`
    fn push_row(
        &mut self,
        slot: usize,
        profile_type: ProfileType,
        row: ArrayView1<'_, f64>,
    ) -> ProfileResult<()> {
        let table = self.table(profile_type);
        if table.indexes[slot].is_some() {
            value_err!("Slot {slot} has more than one {profile_type} profile");
        }

        table.indexes[slot] = Some(table.n_rows);
        table.ratios.extend(row.iter().copied());
        table.n_rows += 1;

        Ok(())
    }

    /// Append all rows of `table`, shifting its slots by `slot_offset`
    fn append_table(&mut self, profile_type: ProfileType, table: &ProfileTable, slot_offset: usize) {
        let builder = self.table(profile_type);
        let row_offset = builder.n_rows;
        builder.ratios.extend(table.ratios.iter().copied());
        builder.n_rows += table.n_rows();
        for (slot, index) in table.indexes.iter().enumerate() {
            builder.indexes[slot_offset + slot] = index.map(|row| row + row_offset);
        }
    }

    fn build(self) -> ProfileResult<CompositeTemporalProfiles> {
        let tables = self
            .tables
            .into_iter()
            .map(|(profile_type, table)| -> ProfileResult<_> {
                let ratios =
                    Array2::from_shape_vec((table.n_rows, profile_type.size()), table.ratios)
                        .map_err(|err| ProfileError::Shape(err.to_string()))?;
                Ok((
                    profile_type,
                    ProfileTable {
                        ratios,
                        indexes: table.indexes,
                    },
                ))
            })
            .try_collect()?;

        Ok(CompositeTemporalProfiles {
            n_slots: self.n_slots,
            tables,
        })
    }
}

impl CompositeTemporalProfiles {
    /// Create composite profiles from a list of profiles for each slot.
    ///
    /// Each profile must consist of a single row and each type may appear at most once per slot.
    ///
    /// ```
    /// use emiprof::composite::CompositeTemporalProfiles;
    /// use emiprof::profile::{ProfileType, TemporalProfile};
    ///
    /// let weekly = TemporalProfile::uniform(ProfileType::Weekly);
    /// let daily = TemporalProfile::uniform(ProfileType::Daily);
    /// let composite =
    ///     CompositeTemporalProfiles::new(&[vec![weekly.clone(), daily], vec![weekly]]).unwrap();
    /// assert_eq!(composite.len(), 2);
    /// assert_eq!(composite.ratios().dim(), (2, 7 + 24));
    /// ```
    ///
    /// Slots can only hold profiles:
    ///
    /// ```compile_fail
    /// use emiprof::composite::CompositeTemporalProfiles;
    /// use emiprof::profile::{ProfileType, TemporalProfile};
    ///
    /// let weekly = TemporalProfile::uniform(ProfileType::Weekly);
    /// CompositeTemporalProfiles::new(&[vec![weekly], vec![1]]);
    /// ```
    pub fn new(slots: &[Vec<TemporalProfile>]) -> ProfileResult<Self> {
        let mut builder = CompositeBuilder::new(slots.len());
        for (slot, profiles) in slots.iter().enumerate() {
            for profile in profiles {
                if profile.n_profiles() != 1 {
                    shape_err!(
                        "Slot {slot} contains a {} profile with {} rows, expected one",
                        profile.profile_type(),
                        profile.n_profiles()
                    );
                }
                builder.push_row(slot, profile.profile_type(), profile.ratios().row(0))?;
            }
        }

        let composite = builder.build()?;
        debug!(
            "Created composite profiles with {} slots and types [{}]",
            composite.n_slots,
            composite.tables.keys().join(", ")
        );

        Ok(composite)
    }

    /// Reconstruct composite profiles from the output of [`CompositeTemporalProfiles::ratios`].
    ///
    /// `ratios` is split into contiguous column blocks, one per entry of `types`. A block made up
    /// entirely of NaNs means the slot has no profile of that type. An all-zero block is a
    /// placeholder; every other block must sum to one.
    pub fn from_ratios(ratios: ArrayView2<'_, f64>, types: &[ProfileType]) -> ProfileResult<Self> {
        let n_columns: usize = types.iter().map(|profile_type| profile_type.size()).sum();
        if ratios.ncols() != n_columns {
            shape_err!(
                "Ratios have {} columns but the profile types [{}] require {n_columns}",
                ratios.ncols(),
                types.iter().join(", ")
            );
        }

        let mut builder = CompositeBuilder::new(ratios.nrows());
        let mut start = 0;
        for &profile_type in types {
            let end = start + profile_type.size();
            let block = ratios.slice(s![.., start..end]);
            for (slot, row) in block.outer_iter().enumerate() {
                if row.iter().all(|ratio| ratio.is_nan()) {
                    continue;
                }

                let ratios = row.to_owned().insert_axis(Axis(0));
                let profile = if row.iter().all(|ratio| approx_eq!(f64, *ratio, 0.0)) {
                    TemporalProfile::new_unnormalised(profile_type, ratios)?
                } else {
                    TemporalProfile::new(profile_type, ratios)?
                };
                builder.push_row(slot, profile_type, profile.ratios().row(0))?;
            }
            start = end;
        }

        builder.build()
    }

    /// Concatenate the slots of several composite profiles, in order.
    ///
    /// The profile types of the result are the union of the input types. Rows are never
    /// deduplicated across inputs.
    pub fn join<'a, I>(composites: I) -> ProfileResult<Self>
    where
        I: IntoIterator<Item = &'a CompositeTemporalProfiles>,
    {
        let composites = composites.into_iter().collect_vec();
        let n_slots = composites.iter().map(|composite| composite.n_slots).sum();

        let mut builder = CompositeBuilder::new(n_slots);
        let mut slot_offset = 0;
        for composite in &composites {
            for (profile_type, table) in &composite.tables {
                builder.append_table(*profile_type, table, slot_offset);
            }
            slot_offset += composite.n_slots;
        }

        let joined = builder.build()?;
        debug!(
            "Joined {} composite profiles into {} slots",
            composites.len(),
            joined.n_slots
        );

        Ok(joined)
    }

    /// Create new composite profiles from a subset of the slots, in the given order
    pub fn select(&self, slots: &[usize]) -> ProfileResult<Self> {
        let mut builder = CompositeBuilder::new(slots.len());
        for (new_slot, &slot) in slots.iter().enumerate() {
            if slot >= self.n_slots {
                return Err(ProfileError::Lookup(format!(
                    "Slot {slot} requested but there are only {} slots",
                    self.n_slots
                )));
            }

            for (profile_type, table) in &self.tables {
                if let Some(row) = table.indexes[slot] {
                    builder.push_row(new_slot, *profile_type, table.ratios.row(row))?;
                }
            }
        }

        builder.build()
    }

    /// The number of slots
    pub fn n_profiles(&self) -> usize {
        self.n_slots
    }

    /// Alias for [`CompositeTemporalProfiles::n_profiles`]
    pub fn len(&self) -> usize {
        self.n_slots
    }

    /// Whether there are no slots
    pub fn is_empty(&self) -> bool {
        self.n_slots == 0
    }

    /// The profile types in use, in the order they are applied
    pub fn types(&self) -> Vec<ProfileType> {
        self.tables.keys().copied().collect()
    }

    /// The stacked rows and slot indexes for one profile type
    pub fn profile_table(&self, profile_type: ProfileType) -> Option<&ProfileTable> {
        self.tables.get(&profile_type)
    }

    /// The profiles applying to `slot`, in the order given by [`CompositeTemporalProfiles::types`]
    pub fn get(&self, slot: usize) -> Option<Vec<TemporalProfile>> {
        (slot < self.n_slots).then(|| {
            self.tables
                .iter()
                .filter_map(|(profile_type, table)| {
                    table.indexes[slot].map(|row| {
                        TemporalProfile::from_trusted_row(*profile_type, table.ratios.row(row))
                    })
                })
                .collect()
        })
    }

    /// Iterate over the profile lists of all slots
    pub fn iter(&self) -> SlotIter<'_> {
        SlotIter {
            composite: self,
            slot: 0,
        }
    }

    /// All ratios, with one row per slot.
    ///
    /// The columns are the concatenation of the periods of each profile type, in the order given
    /// by [`CompositeTemporalProfiles::types`]. Types a slot has no profile for are filled with NaN.
    pub fn ratios(&self) -> Array2<f64> {
        let n_columns: usize = self.tables.keys().map(|profile_type| profile_type.size()).sum();
        let mut ratios = Array2::from_elem((self.n_slots, n_columns), f64::NAN);

        let mut start = 0;
        for (profile_type, table) in &self.tables {
            let end = start + profile_type.size();
            for (slot, index) in table.indexes.iter().enumerate() {
                if let Some(row) = index {
                    ratios
                        .slice_mut(s![slot, start..end])
                        .assign(&table.ratios.row(*row));
                }
            }
            start = end;
        }

        ratios
    }
}

impl PartialEq for CompositeTemporalProfiles {
    /// Composite profiles are equal if every slot has the same list of profiles
    fn eq(&self, other: &Self) -> bool {
        self.n_slots == other.n_slots && self.iter().eq(other.iter())
    }
}

/// An iterator over the profile lists of each slot of a [`CompositeTemporalProfiles`]
pub struct SlotIter<'a> {
    composite: &'a CompositeTemporalProfiles,
    slot: usize,
}

impl Iterator for SlotIter<'_> {
    type Item = Vec<TemporalProfile>;

    fn next(&mut self) -> Option<Self::Item> {
        let profiles = self.composite.get(self.slot)?;
        self.slot += 1;
        Some(profiles)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.composite.n_slots.saturating_sub(self.slot);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SlotIter<'_> {}

impl<'a> IntoIterator for &'a CompositeTemporalProfiles {
    type Item = Vec<TemporalProfile>;
    type IntoIter = SlotIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_profile_error, daily, weekly, weekly_daily_composite};
    use crate::profile::RATIO_SUM_TOLERANCE;
    use float_cmp::assert_approx_eq;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    fn test_composite(weekly_daily_composite: CompositeTemporalProfiles) {
        assert_eq!(weekly_daily_composite.n_profiles(), 2);
        assert_eq!(weekly_daily_composite.get(0).unwrap().len(), 2);
        assert_eq!(weekly_daily_composite.get(1).unwrap().len(), 1);
        assert_eq!(weekly_daily_composite.get(2), None);
    }

    #[rstest]
    fn test_slot_order(weekly: TemporalProfile, daily: TemporalProfile) {
        // The order of types is fixed by the first slot they appear in
        let composite =
            CompositeTemporalProfiles::new(&[vec![weekly.clone()], vec![daily.clone(), weekly.clone()]])
                .unwrap();
        assert_eq!(
            composite.types(),
            [ProfileType::Weekly, ProfileType::Daily]
        );
        assert_eq!(composite.get(1).unwrap(), [weekly, daily]);
    }

    #[test]
    fn test_empty() {
        let composite = CompositeTemporalProfiles::new(&[]).unwrap();
        assert!(composite.is_empty());
        assert_eq!(composite.ratios().dim(), (0, 0));
    }

    #[rstest]
    fn test_empty_slot(weekly: TemporalProfile) {
        let composite = CompositeTemporalProfiles::new(&[vec![], vec![weekly]]).unwrap();
        assert_eq!(composite.len(), 2);
        assert!(composite.get(0).unwrap().is_empty());
    }

    #[rstest]
    fn test_iterate(weekly_daily_composite: CompositeTemporalProfiles) {
        let slots = weekly_daily_composite.iter().collect_vec();
        assert_eq!(slots.len(), 2);
        assert_eq!(weekly_daily_composite.iter().len(), 2);
        for profiles in &weekly_daily_composite {
            for profile in profiles {
                assert_eq!(profile.n_profiles(), 1);
            }
        }
    }

    #[rstest]
    fn test_internals(weekly_daily_composite: CompositeTemporalProfiles) {
        let weekly = weekly_daily_composite
            .profile_table(ProfileType::Weekly)
            .unwrap();
        let daily = weekly_daily_composite
            .profile_table(ProfileType::Daily)
            .unwrap();
        assert_eq!(weekly.indexes(), [Some(0), Some(1)]);
        assert_eq!(daily.indexes(), [Some(0), None]);
        assert_eq!(weekly.n_rows(), 2);
        assert_eq!(daily.n_rows(), 1);
        assert!(weekly_daily_composite.profile_table(ProfileType::Monthly).is_none());
    }

    #[rstest]
    fn test_duplicate_type_in_slot(weekly: TemporalProfile) {
        assert_profile_error!(
            CompositeTemporalProfiles::new(&[vec![weekly.clone(), weekly]]),
            Value
        );
    }

    #[test]
    fn test_multi_row_profile_in_slot() {
        let profile = TemporalProfile::new(
            ProfileType::Generic(2),
            array![[0.5, 0.5], [0.2, 0.8]],
        )
        .unwrap();
        assert_profile_error!(CompositeTemporalProfiles::new(&[vec![profile]]), Shape);
    }

    #[rstest]
    fn test_ratios(weekly_daily_composite: CompositeTemporalProfiles) {
        let ratios = weekly_daily_composite.ratios();
        assert_eq!(ratios.dim(), (2, 7 + 24));
        assert_approx_eq!(
            f64,
            ratios.row(0).sum(),
            2.0,
            epsilon = RATIO_SUM_TOLERANCE
        );
        assert!(ratios.slice(s![1, 7..]).iter().all(|ratio| ratio.is_nan()));
    }

    #[rstest]
    fn test_from_ratios_round_trip(weekly_daily_composite: CompositeTemporalProfiles) {
        let new = CompositeTemporalProfiles::from_ratios(
            weekly_daily_composite.ratios().view(),
            &weekly_daily_composite.types(),
        )
        .unwrap();
        assert_eq!(new, weekly_daily_composite);
        for (old, new) in weekly_daily_composite.iter().zip(new.iter()) {
            assert_eq!(old, new);
        }
    }

    #[rstest]
    fn test_from_ratios_round_trip_placeholder(weekly: TemporalProfile, daily: TemporalProfile) {
        let composite = CompositeTemporalProfiles::new(&[
            vec![TemporalProfile::placeholder(ProfileType::Weekly)],
            vec![weekly, daily],
        ])
        .unwrap();
        let new =
            CompositeTemporalProfiles::from_ratios(composite.ratios().view(), &composite.types())
                .unwrap();
        assert_eq!(new, composite);
        assert!(new.get(0).unwrap()[0].is_placeholder());
    }

    #[rstest]
    fn test_from_ratios_wrong_columns(weekly_daily_composite: CompositeTemporalProfiles) {
        assert_profile_error!(
            CompositeTemporalProfiles::from_ratios(
                weekly_daily_composite.ratios().view(),
                &[ProfileType::Weekly]
            ),
            Shape
        );
    }

    #[test]
    fn test_from_ratios_not_normalised() {
        let ratios = array![[0.5, 0.4]];
        assert_profile_error!(
            CompositeTemporalProfiles::from_ratios(ratios.view(), &[ProfileType::Generic(2)]),
            Normalisation
        );
    }

    #[rstest]
    fn test_join(weekly_daily_composite: CompositeTemporalProfiles, weekly: TemporalProfile) {
        let single = CompositeTemporalProfiles::new(&[vec![weekly]]).unwrap();
        let joined = CompositeTemporalProfiles::join([
            &weekly_daily_composite,
            &weekly_daily_composite,
            &single,
        ])
        .unwrap();
        assert_eq!(joined.n_profiles(), 5);
        let lengths = joined.iter().map(|profiles| profiles.len()).collect_vec();
        assert_eq!(lengths, [2, 1, 2, 1, 1]);

        let weekly_table = joined.profile_table(ProfileType::Weekly).unwrap();
        assert_eq!(
            weekly_table.indexes(),
            [Some(0), Some(1), Some(2), Some(3), Some(4)]
        );
        let daily_table = joined.profile_table(ProfileType::Daily).unwrap();
        assert_eq!(
            daily_table.indexes(),
            [Some(0), None, Some(1), None, None]
        );
    }

    #[test]
    fn test_join_preserves_slots() {
        let a = CompositeTemporalProfiles::new(&[
            vec![TemporalProfile::from_vec(ProfileType::Generic(2), vec![0.2, 0.8]).unwrap()],
            vec![TemporalProfile::uniform(ProfileType::Weekly)],
        ])
        .unwrap();
        let b = CompositeTemporalProfiles::new(&[vec![
            TemporalProfile::from_vec(ProfileType::Generic(2), vec![0.6, 0.4]).unwrap(),
            TemporalProfile::uniform(ProfileType::Daily),
        ]])
        .unwrap();

        let joined = CompositeTemporalProfiles::join([&a, &b]).unwrap();
        assert_eq!(joined.len(), a.len() + b.len());
        for i in 0..joined.len() {
            let expected = if i < a.len() {
                a.get(i)
            } else {
                b.get(i - a.len())
            };
            assert_eq!(joined.get(i), expected);
        }
    }

    #[rstest]
    fn test_select(weekly_daily_composite: CompositeTemporalProfiles) {
        let selected = weekly_daily_composite.select(&[1, 0, 1]).unwrap();
        assert_eq!(selected.len(), 3);
        assert_eq!(selected.get(0), weekly_daily_composite.get(1));
        assert_eq!(selected.get(1), weekly_daily_composite.get(0));
        assert_profile_error!(weekly_daily_composite.select(&[2]), Lookup);
    }

    #[rstest]
    fn test_equality_different_lengths(weekly: TemporalProfile, daily: TemporalProfile) {
        let a = CompositeTemporalProfiles::new(&[vec![weekly.clone(), daily]]).unwrap();
        let b = CompositeTemporalProfiles::new(&[vec![weekly.clone()]]).unwrap();
        let c = CompositeTemporalProfiles::new(&[vec![weekly.clone()], vec![weekly]]).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
    }
}
