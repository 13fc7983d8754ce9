//! Export variables
//!
//! A variable turns the batch's raw fields into one typed output artifact. The
//! kind is chosen by the key present in its configuration block: `datetime`
//! composes timestamps, `mnemonic` reads a field directly. A block naming both
//! is rejected.

pub mod datetime;
pub mod mnemonic;

pub use datetime::{DatetimeFormat, DatetimeSource, DatetimeVariable};
pub use mnemonic::MnemonicVariable;

use crate::app::models::{MissingValue, RawFieldMap};
use crate::app::services::encoder::DataObject;
use crate::schema::{ConfKey, ConfNode, VARIABLE_KEYS};
use crate::{Error, Result};
use tracing::warn;

/// Output variable, one variant per configured kind
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Mnemonic(MnemonicVariable),
    Datetime(DatetimeVariable),
}

impl Variable {
    /// Build a variable from an `export::variables::<name>` block
    pub fn from_conf(node: &ConfNode<'_>) -> Result<Self> {
        node.validate(VARIABLE_KEYS)?;

        if node.has(ConfKey::Datetime) && node.has(ConfKey::Mnemonic) {
            return Err(Error::invalid_config(
                node.path(),
                "either a datetime block or a mnemonic, not both",
            ));
        }

        if let Some(datetime) = node.get(ConfKey::Datetime) {
            if node.has(ConfKey::Transforms) {
                warn!("Ignoring transforms on datetime variable '{}'", node.path());
            }
            Ok(Variable::Datetime(DatetimeVariable::from_conf(&datetime)?))
        } else if node.has(ConfKey::Mnemonic) {
            Ok(Variable::Mnemonic(MnemonicVariable::from_conf(node)?))
        } else {
            let found = node.keys().first().copied().unwrap_or("<empty>").to_string();
            Err(Error::unknown_kind("variable", node.path(), found))
        }
    }

    /// Produce the variable's artifact for the batch
    pub fn resolve(
        &self,
        name: &str,
        data: &RawFieldMap,
        missing: &MissingValue,
    ) -> Result<DataObject> {
        match self {
            Variable::Mnemonic(variable) => variable.resolve(name, data, missing),
            Variable::Datetime(variable) => variable.resolve(name, data, missing),
        }
    }

    /// Every field the variable may read
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Variable::Mnemonic(variable) => {
                variable.candidates().iter().map(String::as_str).collect()
            }
            Variable::Datetime(variable) => variable.fields(),
        }
    }
}
