use crate::app::models::{FieldValues, MissingValue, RawFieldMap};
use crate::app::services::encoder::DataObject;
use crate::app::services::export::transforms::{Transform, apply_transforms, make_transforms};
use crate::schema::{ConfKey, ConfNode};
use crate::{Error, Result};
use tracing::debug;

/// Variable read from the first usable candidate field
///
/// Candidates are tried in declared order. A candidate is usable when it is
/// present in the batch and holds at least one observed value; scanning stops
/// at the first usable one.
#[derive(Debug, Clone, PartialEq)]
pub struct MnemonicVariable {
    candidates: Vec<String>,
    transforms: Vec<Transform>,
}

impl MnemonicVariable {
    pub fn new(candidates: Vec<String>, transforms: Vec<Transform>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(Error::configuration(
                "A mnemonic variable needs at least one candidate field",
            ));
        }

        Ok(Self {
            candidates,
            transforms,
        })
    }

    /// Build from an `export::variables::<name>` block holding a `mnemonic` key
    pub fn from_conf(node: &ConfNode<'_>) -> Result<Self> {
        let candidates = node.child(ConfKey::Mnemonic)?.as_string_list()?;
        if candidates.is_empty() {
            return Err(Error::invalid_config(
                format!("{}::{}", node.path(), ConfKey::Mnemonic.as_str()),
                "at least one field name",
            ));
        }

        Self::new(candidates, make_transforms(node)?)
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// Pick the winning candidate and apply the transform chain to a copy of it
    pub fn resolve(
        &self,
        name: &str,
        data: &RawFieldMap,
        missing: &MissingValue,
    ) -> Result<DataObject> {
        for candidate in &self.candidates {
            let Some(values) = data.get(candidate) else {
                debug!("Variable '{}': candidate '{}' absent", name, candidate);
                continue;
            };

            if !has_observation(values, missing) {
                debug!("Variable '{}': candidate '{}' fully missing", name, candidate);
                continue;
            }

            debug!("Variable '{}' resolved from '{}'", name, candidate);
            return self.finish(name, values, missing);
        }

        Err(Error::unresolvable(name, &self.candidates))
    }

    fn finish(&self, name: &str, values: &FieldValues, missing: &MissingValue) -> Result<DataObject> {
        match values {
            FieldValues::Numeric(array) => {
                let mut array = array.clone();
                apply_transforms(name, &self.transforms, &mut array, missing)?;
                Ok(DataObject::numeric(array))
            }
            FieldValues::Strings(_) if !self.transforms.is_empty() => Err(Error::type_mismatch(
                name,
                "transforms cannot be applied to a string field",
            )),
            FieldValues::Strings(strings) => Ok(DataObject::strings(strings.clone())),
        }
    }
}

/// A zero-row field counts as observed, there is nothing in it to be missing
fn has_observation(values: &FieldValues, missing: &MissingValue) -> bool {
    match values {
        FieldValues::Numeric(array) => array.rows() == 0 || missing.any_present(array.values()),
        FieldValues::Strings(strings) => {
            strings.is_empty() || strings.iter().any(|value| !value.is_empty())
        }
    }
}
