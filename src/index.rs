//! Assigning profiles to categories and substances.
//!
//! Which profile applies to which (category, substance) pair is often computed separately for each
//! profile type (e.g. monthly profiles per category, hourly profiles per substance). The functions
//! here align these assignments and turn them into a single [`CompositeTemporalProfiles`].
use crate::composite::CompositeTemporalProfiles;
use crate::error::{ProfileError, ProfileResult, shape_err, value_err};
use crate::id::{CategoryID, SubstanceID, union_positions};
use crate::profile::{ProfileType, TemporalProfile};
use crate::registry::AnyProfiles;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::debug;
use ndarray::{Array2, Array3, ArrayView1, s};
use std::hash::Hash;

/// Check a list of labels has no duplicates
fn check_unique_labels<ID>(labels: &[ID], dimension: &str) -> ProfileResult<()>
where
    ID: Eq + Hash + std::fmt::Display,
{
    if let Some(label) = labels.iter().duplicates().next() {
        value_err!("Duplicate {dimension} label '{label}'");
    }

    Ok(())
}

/// The rows of the registry assigned to each (category, substance) pair, for one profile type.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileIndexArray {
    profile_type: ProfileType,
    categories: Vec<CategoryID>,
    substances: Vec<SubstanceID>,
    indexes: Array2<Option<usize>>,
}

impl ProfileIndexArray {
    /// Create a new index array.
    ///
    /// # Arguments
    ///
    /// * `profile_type` - The type of the profiles referenced
    /// * `categories` - Labels of the first axis of `indexes`
    /// * `substances` - Labels of the second axis of `indexes`
    /// * `indexes` - Global registry row for each pair, or `None` for no profile
    pub fn new(
        profile_type: ProfileType,
        categories: Vec<CategoryID>,
        substances: Vec<SubstanceID>,
        indexes: Array2<Option<usize>>,
    ) -> ProfileResult<Self> {
        if indexes.dim() != (categories.len(), substances.len()) {
            shape_err!(
                "Index array for {profile_type} profiles has shape {:?} but there are {} categories \
                and {} substances",
                indexes.dim(),
                categories.len(),
                substances.len()
            );
        }
        check_unique_labels(&categories, "category")?;
        check_unique_labels(&substances, "substance")?;

        Ok(Self {
            profile_type,
            categories,
            substances,
            indexes,
        })
    }

    /// The type of the profiles referenced
    pub fn profile_type(&self) -> ProfileType {
        self.profile_type
    }
}

/// Profile assignments for several profile types, aligned on category and substance.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinedIndexes {
    categories: IndexSet<CategoryID>,
    substances: IndexSet<SubstanceID>,
    types: Vec<ProfileType>,
    /// Shape `(n_categories, n_substances, n_types)`
    indexes: Array3<Option<usize>>,
}

impl CombinedIndexes {
    /// All categories, in first-seen order
    pub fn categories(&self) -> &IndexSet<CategoryID> {
        &self.categories
    }

    /// All substances, in first-seen order
    pub fn substances(&self) -> &IndexSet<SubstanceID> {
        &self.substances
    }

    /// The profile types, one per merged index array
    pub fn types(&self) -> &[ProfileType] {
        &self.types
    }

    /// The registry rows for a (category, substance) pair, one entry per profile type
    pub fn get(&self, category: &str, substance: &str) -> Option<ArrayView1<'_, Option<usize>>> {
        let i = self.categories.get_index_of(category)?;
        let j = self.substances.get_index_of(substance)?;
        Some(self.indexes.slice(s![i, j, ..]))
    }
}

/// Merge index arrays computed separately for different profile types.
///
/// The categories and substances of the result are the union of those of the inputs. Pairs missing
/// from an input have no profile of that input's type.
pub fn merge_indexes(arrays: &[ProfileIndexArray]) -> ProfileResult<CombinedIndexes> {
    if arrays.is_empty() {
        value_err!("No index arrays to merge");
    }
    if let Some(profile_type) = arrays.iter().map(|array| array.profile_type).duplicates().next() {
        value_err!("More than one index array given for {profile_type} profiles");
    }

    let mut categories = IndexSet::new();
    let mut substances = IndexSet::new();
    let positions = arrays
        .iter()
        .map(|array| {
            (
                union_positions(&mut categories, &array.categories),
                union_positions(&mut substances, &array.substances),
            )
        })
        .collect_vec();

    let mut indexes = Array3::from_elem((categories.len(), substances.len(), arrays.len()), None);
    for (type_pos, (array, (category_pos, substance_pos))) in arrays.iter().zip(positions).enumerate()
    {
        for ((i, j), index) in array.indexes.indexed_iter() {
            indexes[[category_pos[i], substance_pos[j], type_pos]] = *index;
        }
    }

    debug!(
        "Merged index arrays for [{}] over {} categories and {} substances",
        arrays.iter().map(|array| array.profile_type).join(", "),
        categories.len(),
        substances.len()
    );

    Ok(CombinedIndexes {
        categories,
        substances,
        types: arrays.iter().map(|array| array.profile_type).collect(),
        indexes,
    })
}

/// Composite profiles together with the slot used by each (category, substance) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeAssignment {
    profiles: CompositeTemporalProfiles,
    categories: IndexSet<CategoryID>,
    substances: IndexSet<SubstanceID>,
    slots: Array2<Option<usize>>,
}

impl CompositeAssignment {
    /// The composite profiles
    pub fn profiles(&self) -> &CompositeTemporalProfiles {
        &self.profiles
    }

    /// All categories, in the order of the first axis of [`CompositeAssignment::slots`]
    pub fn categories(&self) -> &IndexSet<CategoryID> {
        &self.categories
    }

    /// All substances, in the order of the second axis of [`CompositeAssignment::slots`]
    pub fn substances(&self) -> &IndexSet<SubstanceID> {
        &self.substances
    }

    /// The composite slot of every (category, substance) pair
    pub fn slots(&self) -> &Array2<Option<usize>> {
        &self.slots
    }

    /// The composite slot of a (category, substance) pair, if it has any profile
    pub fn slot(&self, category: &str, substance: &str) -> Option<usize> {
        let i = self.categories.get_index_of(category)?;
        let j = self.substances.get_index_of(substance)?;
        self.slots[[i, j]]
    }
}

/// Build composite profiles from a registry and merged index arrays.
///
/// Pairs with the same combination of registry rows share a slot. Pairs without any profile get
/// no slot.
pub fn make_composite_profiles(
    registry: &AnyProfiles,
    combined: &CombinedIndexes,
) -> ProfileResult<CompositeAssignment> {
    let (n_categories, n_substances, _) = combined.indexes.dim();
    let mut slots = Array2::from_elem((n_categories, n_substances), None);
    let mut slot_of_key: IndexMap<Vec<Option<usize>>, usize> = IndexMap::new();
    let mut slot_profiles: Vec<Vec<TemporalProfile>> = Vec::new();

    for i in 0..n_categories {
        for j in 0..n_substances {
            let key = combined.indexes.slice(s![i, j, ..]).to_vec();
            if key.iter().all(Option::is_none) {
                continue;
            }

            let slot = if let Some(slot) = slot_of_key.get(&key) {
                *slot
            } else {
                let profiles: Vec<_> = combined
                    .types
                    .iter()
                    .zip(&key)
                    .filter_map(|(profile_type, index)| {
                        index.map(|index| registry.get_typed(*profile_type, index))
                    })
                    .try_collect()
                    .map_err(|err| {
                        let pair = format!(
                            "category: {}, substance: {}",
                            combined.categories[i], combined.substances[j]
                        );
                        match err {
                            ProfileError::Lookup(msg) => ProfileError::Lookup(format!("{msg} ({pair})")),
                            ProfileError::Type(msg) => ProfileError::Type(format!("{msg} ({pair})")),
                            err => err,
                        }
                    })?;
                slot_profiles.push(profiles);
                slot_of_key.insert(key, slot_profiles.len() - 1);
                slot_profiles.len() - 1
            };
            slots[[i, j]] = Some(slot);
        }
    }

    let profiles = CompositeTemporalProfiles::new(&slot_profiles)?;
    debug!(
        "Assigned {} composite profiles to {} category/substance pairs",
        profiles.len(),
        slots.iter().flatten().count()
    );

    Ok(CompositeAssignment {
        profiles,
        categories: combined.categories.clone(),
        substances: combined.substances.clone(),
        slots,
    })
}
