use crate::app::models::{Array2, FieldValues, MissingValue, RawFieldMap};
use crate::app::services::encoder::DataObject;
use crate::constants::ISO8601_FORMAT;
use crate::schema::{ConfKey, ConfNode, DATETIME_KEYS};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate};
use tracing::debug;

const SECONDS_PER_HOUR: i64 = 3600;
const MAX_HOURS_FROM_UTC: f64 = 24.0;

/// Fields a timestamp is composed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatetimeSource {
    /// Separate calendar fields; minute and second default to zero when unset
    Components {
        year: String,
        month: String,
        day: String,
        hour: String,
        minute: Option<String>,
        second: Option<String>,
    },
    /// A single field already holding seconds since the Unix epoch
    Epoch(String),
}

/// Representation of the resolved timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatetimeFormat {
    /// Numeric seconds since 1970-01-01T00:00:00Z
    #[default]
    EpochSeconds,
    /// `YYYY-MM-DDThh:mm:ssZ` strings, empty for missing records
    Iso8601,
}

impl DatetimeFormat {
    fn parse(node: &ConfNode<'_>) -> Result<Self> {
        match node.as_str()? {
            "epoch" => Ok(DatetimeFormat::EpochSeconds),
            "iso8601" => Ok(DatetimeFormat::Iso8601),
            _ => Err(Error::invalid_config(node.path(), "\"epoch\" or \"iso8601\"")),
        }
    }
}

/// Timestamp composed per record and shifted to UTC
#[derive(Debug, Clone, PartialEq)]
pub struct DatetimeVariable {
    source: DatetimeSource,
    hours_from_utc: i64,
    format: DatetimeFormat,
}

impl DatetimeVariable {
    pub fn new(source: DatetimeSource, hours_from_utc: i64, format: DatetimeFormat) -> Self {
        Self {
            source,
            hours_from_utc,
            format,
        }
    }

    /// Build from an `export::variables::<name>::datetime` block
    pub fn from_conf(node: &ConfNode<'_>) -> Result<Self> {
        node.validate(DATETIME_KEYS)?;

        let source = if let Some(epoch) = node.get(ConfKey::Epoch) {
            if node.has(ConfKey::Year) {
                return Err(Error::invalid_config(
                    node.path(),
                    "either an epoch field or calendar component fields, not both",
                ));
            }
            DatetimeSource::Epoch(epoch.as_str()?.to_string())
        } else {
            DatetimeSource::Components {
                year: node.string(ConfKey::Year)?,
                month: node.string(ConfKey::Month)?,
                day: node.string(ConfKey::Day)?,
                hour: node.string(ConfKey::Hour)?,
                minute: node.opt_string(ConfKey::Minute)?,
                second: node.opt_string(ConfKey::Second)?,
            }
        };

        let hours_from_utc = node.float_or_default(DATETIME_KEYS, ConfKey::HoursFromUtc)?;
        if hours_from_utc.abs() > MAX_HOURS_FROM_UTC {
            return Err(Error::invalid_config(
                format!("{}::{}", node.path(), ConfKey::HoursFromUtc.as_str()),
                format!("an offset within ±{} hours (found {})", MAX_HOURS_FROM_UTC, hours_from_utc),
            ));
        }
        let format = match node.get(ConfKey::Format) {
            Some(format) => DatetimeFormat::parse(&format)?,
            None => DatetimeFormat::default(),
        };

        Ok(Self::new(source, hours_from_utc as i64, format))
    }

    pub fn source(&self) -> &DatetimeSource {
        &self.source
    }

    pub fn hours_from_utc(&self) -> i64 {
        self.hours_from_utc
    }

    pub fn format(&self) -> DatetimeFormat {
        self.format
    }

    /// Fields this variable reads
    pub fn fields(&self) -> Vec<&str> {
        match &self.source {
            DatetimeSource::Components {
                year,
                month,
                day,
                hour,
                minute,
                second,
            } => [Some(year), Some(month), Some(day), Some(hour), minute.as_ref(), second.as_ref()]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect(),
            DatetimeSource::Epoch(field) => vec![field.as_str()],
        }
    }

    pub fn resolve(
        &self,
        name: &str,
        data: &RawFieldMap,
        missing: &MissingValue,
    ) -> Result<DataObject> {
        let timestamps = match &self.source {
            DatetimeSource::Components {
                year,
                month,
                day,
                hour,
                minute,
                second,
            } => {
                let year = component(name, data, year)?;
                let month = component(name, data, month)?;
                let day = component(name, data, day)?;
                let hour = component(name, data, hour)?;
                let minute = minute.as_ref().map(|f| component(name, data, f)).transpose()?;
                let second = second.as_ref().map(|f| component(name, data, f)).transpose()?;

                (0..year.rows())
                    .map(|row| {
                        let value = |array: &Array2| {
                            let value = array.row(row)[0];
                            missing.is_present(value).then_some(value)
                        };
                        // An unset optional component reads as zero
                        let optional = |array: Option<&Array2>| match array {
                            Some(array) => value(array),
                            None => Some(0.0),
                        };

                        compose(
                            value(year)?,
                            value(month)?,
                            value(day)?,
                            value(hour)?,
                            optional(minute)?,
                            optional(second)?,
                        )
                    })
                    .collect::<Vec<Option<i64>>>()
            }
            DatetimeSource::Epoch(field) => {
                let epoch = component(name, data, field)?;
                (0..epoch.rows())
                    .map(|row| {
                        let value = epoch.row(row)[0];
                        epoch_seconds(value, missing)
                    })
                    .collect()
            }
        };

        let offset = self.hours_from_utc.checked_mul(SECONDS_PER_HOUR).ok_or_else(|| {
            Error::invalid_config(
                format!("{}::{}", name, ConfKey::HoursFromUtc.as_str()),
                format!("an offset within ±{} hours", MAX_HOURS_FROM_UTC),
            )
        })?;
        // A shift past the representable range leaves the record without a timestamp
        let utc = timestamps
            .into_iter()
            .map(|ts| ts.and_then(|seconds| seconds.checked_sub(offset)));

        let invalid = utc.clone().filter(Option::is_none).count();
        if invalid > 0 {
            debug!(
                "Variable '{}': {} records without a usable timestamp",
                name, invalid
            );
        }

        match self.format {
            DatetimeFormat::EpochSeconds => {
                let values = utc
                    .map(|ts| ts.map_or(missing.sentinel, |seconds| seconds as f64))
                    .collect();
                Ok(DataObject::numeric(Array2::from_column(values)))
            }
            DatetimeFormat::Iso8601 => {
                let values = utc
                    .map(|ts| {
                        ts.and_then(|seconds| DateTime::from_timestamp(seconds, 0))
                            .map(|datetime| datetime.format(ISO8601_FORMAT).to_string())
                            .unwrap_or_default()
                    })
                    .collect();
                Ok(DataObject::strings(values))
            }
        }
    }
}

/// First column of a numeric component field
fn component<'a>(variable: &str, data: &'a RawFieldMap, field: &str) -> Result<&'a Array2> {
    match data.get(field) {
        Some(FieldValues::Numeric(array)) if array.cols() > 0 => Ok(array),
        Some(FieldValues::Numeric(_)) => Err(Error::shape_mismatch(
            field,
            "datetime component has no columns",
        )),
        Some(FieldValues::Strings(_)) => Err(Error::type_mismatch(
            field,
            format!("datetime component of '{}' must be numeric", variable),
        )),
        None => Err(Error::unresolvable(variable, &[field.to_string()])),
    }
}

/// Whole seconds of an observed epoch value, `None` outside the `i64` range
fn epoch_seconds(value: f64, missing: &MissingValue) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (missing.is_present(value) && in_range).then(|| value.floor() as i64)
}

/// Whole, non-negative component value
fn whole(value: f64) -> Option<u32> {
    (value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX)).then_some(value as u32)
}

/// Seconds since the epoch, `None` for an impossible calendar date
fn compose(year: f64, month: f64, day: f64, hour: f64, minute: f64, second: f64) -> Option<i64> {
    let year = i32::try_from(whole(year)?).ok()?;
    NaiveDate::from_ymd_opt(year, whole(month)?, whole(day)?)?
        .and_hms_opt(whole(hour)?, whole(minute)?, whole(second)?)
        .map(|datetime| datetime.and_utc().timestamp())
}
