//! Value transforms applied to a resolved variable
//!
//! Transforms run strictly in declared order and only ever touch observed values:
//! a missing-sentinel slot stays missing, and a transform that would push an
//! observed value into the missing range fails the variable. Shape is always
//! preserved.

use crate::app::models::{Array2, MissingValue};
use crate::schema::{ConfKey, ConfNode};
use crate::{Error, Result};

/// One value-mutating step in a variable's transform chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// `value *= factor`
    Scale(f64),
    /// `value += offset`
    Offset(f64),
}

impl Transform {
    /// Build a transform from a `{ <kind>: <number> }` block
    pub fn from_conf(node: &ConfNode<'_>) -> Result<Self> {
        let keys = node.keys();
        if keys.len() != 1 {
            return Err(Error::unknown_kind(
                "transform",
                node.path(),
                format!("expected exactly one transform key, found [{}]", keys.join(", ")),
            ));
        }

        if let Some(scale) = node.get(ConfKey::Scale) {
            Ok(Transform::Scale(scale.as_f64()?))
        } else if let Some(offset) = node.get(ConfKey::Offset) {
            Ok(Transform::Offset(offset.as_f64()?))
        } else {
            Err(Error::unknown_kind("transform", node.path(), keys[0]))
        }
    }

    #[inline]
    fn apply_value(&self, value: f64) -> f64 {
        match *self {
            Transform::Scale(factor) => value * factor,
            Transform::Offset(offset) => value + offset,
        }
    }

    /// Mutate every observed element of `array` in place
    ///
    /// The array is left untouched when any observed value would land in the
    /// missing range.
    pub fn apply(&self, variable: &str, array: &mut Array2, missing: &MissingValue) -> Result<()> {
        let crossing = array
            .values()
            .iter()
            .copied()
            .find(|v| missing.is_present(*v) && missing.is_missing(self.apply_value(*v)));
        if let Some(value) = crossing {
            return Err(Error::transform_out_of_range(
                variable,
                format!("{:?}", self),
                value,
            ));
        }

        for value in array.values_mut() {
            if missing.is_present(*value) {
                *value = self.apply_value(*value);
            }
        }
        Ok(())
    }
}

/// Parse the optional `transforms` list of a variable block
pub fn make_transforms(variable: &ConfNode<'_>) -> Result<Vec<Transform>> {
    match variable.get(ConfKey::Transforms) {
        Some(list) => list.items()?.iter().map(Transform::from_conf).collect(),
        None => Ok(Vec::new()),
    }
}

/// Apply a chain in declared order, stopping at the first failing step
pub fn apply_transforms(
    variable: &str,
    transforms: &[Transform],
    array: &mut Array2,
    missing: &MissingValue,
) -> Result<()> {
    for transform in transforms {
        transform.apply(variable, array, missing)?;
    }
    Ok(())
}
