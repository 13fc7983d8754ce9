//! Row filters evaluated before any variable is resolved
//!
//! Each filter yields one inclusion flag per record. Filters combine with logical
//! AND in declared order, so variables and splits only ever see rows that pass
//! every filter.

use crate::app::models::{FieldValues, MissingValue, RawFieldMap};
use crate::schema::{BOUNDING_KEYS, ConfKey, ConfNode};
use crate::{Error, Result};
use tracing::debug;

/// Keeps records whose target field lies within optional inclusive bounds
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingFilter {
    mnemonic: String,
    lower_bound: Option<f64>,
    upper_bound: Option<f64>,
}

impl BoundingFilter {
    pub fn new(
        mnemonic: impl Into<String>,
        lower_bound: Option<f64>,
        upper_bound: Option<f64>,
    ) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            lower_bound,
            upper_bound,
        }
    }

    /// Build from an `export::filters[i]::bounding` block
    pub fn from_conf(node: &ConfNode<'_>) -> Result<Self> {
        node.validate(BOUNDING_KEYS)?;

        Ok(Self::new(
            node.string(ConfKey::Mnemonic)?,
            node.opt_float(ConfKey::LowerBound)?,
            node.opt_float(ConfKey::UpperBound)?,
        ))
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn lower_bound(&self) -> Option<f64> {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> Option<f64> {
        self.upper_bound
    }

    fn in_bounds(&self, value: f64) -> bool {
        self.lower_bound.is_none_or(|lower| value >= lower)
            && self.upper_bound.is_none_or(|upper| value <= upper)
    }

    /// Inclusion mask for the batch
    ///
    /// A record is kept when it holds at least one observed value and every
    /// observed value is within bounds. Missing values are never kept.
    pub fn mask(&self, data: &RawFieldMap, missing: &MissingValue) -> Result<Vec<bool>> {
        let array = match data.get(&self.mnemonic) {
            Some(FieldValues::Numeric(array)) => array,
            Some(FieldValues::Strings(_)) => {
                return Err(Error::type_mismatch(
                    self.mnemonic.as_str(),
                    "bounding filters require a numeric field",
                ));
            }
            None => return Err(Error::field_not_found(self.mnemonic.as_str())),
        };

        Ok((0..array.rows())
            .map(|row| {
                let mut observed = array
                    .row(row)
                    .iter()
                    .copied()
                    .filter(|v| missing.is_present(*v))
                    .peekable();
                observed.peek().is_some() && observed.all(|v| self.in_bounds(v))
            })
            .collect())
    }
}

/// Row filter, one variant per configured kind
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Bounding(BoundingFilter),
}

impl Filter {
    /// Build a filter from one entry of `export::filters`
    pub fn from_conf(node: &ConfNode<'_>) -> Result<Self> {
        if let Some(bounding) = node.get(ConfKey::Bounding) {
            Ok(Filter::Bounding(BoundingFilter::from_conf(&bounding)?))
        } else {
            let found = node.keys().first().copied().unwrap_or("<empty>").to_string();
            Err(Error::unknown_kind("filter", node.path(), found))
        }
    }

    /// Field the filter inspects
    pub fn mnemonic(&self) -> &str {
        match self {
            Filter::Bounding(filter) => filter.mnemonic(),
        }
    }

    pub fn apply(&self, data: &RawFieldMap, missing: &MissingValue) -> Result<Vec<bool>> {
        match self {
            Filter::Bounding(filter) => filter.mask(data, missing),
        }
    }
}

/// AND-combine every filter's mask, in declared order
///
/// With no filters every record is kept.
pub fn combined_mask(
    filters: &[Filter],
    data: &RawFieldMap,
    missing: &MissingValue,
) -> Result<Vec<bool>> {
    let mut mask = vec![true; data.row_count()];

    for filter in filters {
        let filter_mask = filter.apply(data, missing)?;
        let kept = filter_mask.iter().filter(|keep| **keep).count();
        debug!(
            "Filter on '{}' keeps {} of {} records",
            filter.mnemonic(),
            kept,
            filter_mask.len()
        );

        for (keep, pass) in mask.iter_mut().zip(filter_mask) {
            *keep &= pass;
        }
    }

    Ok(mask)
}

/// Indices of the rows a mask keeps
pub fn retained_rows(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(index, keep)| keep.then_some(index))
        .collect()
}
