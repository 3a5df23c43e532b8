//! Labels for the entities emission profiles are assigned to.
use indexmap::IndexSet;

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            serde::Deserialize,
            Debug,
            serde::Serialize,
        )]
        /// A label type (e.g. `CategoryID`, `SubstanceID`)
        pub struct $name(pub std::rc::Rc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(std::rc::Rc::from(id))
            }
        }
    };
}

define_id_type! {CategoryID}
define_id_type! {SubstanceID}

/// Add the labels of `labels` missing from `set`, preserving first-seen order.
///
/// # Returns
///
/// The position of each label of `labels` in `set`.
pub fn union_positions<ID>(set: &mut IndexSet<ID>, labels: &[ID]) -> Vec<usize>
where
    ID: Eq + std::hash::Hash + Clone,
{
    labels
        .iter()
        .map(|label| set.insert_full(label.clone()).0)
        .collect()
}
