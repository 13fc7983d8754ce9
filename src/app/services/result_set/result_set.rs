//! Accumulation of per-record frames into rectangular field arrays

use super::data_frame::{DataField, DataFrame, FieldData};
use crate::app::models::{Array2, FieldValues, MissingValue, RawFieldMap};
use crate::{Error, Result};
use tracing::debug;

/// Field-major rectangular array for one field across every record
///
/// `dims` is `[rows, max_1, .., max_d]`; the flattened data holds one row of
/// `max_1 * .. * max_d` values per record, or per group instance when the
/// result was grouped.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResult {
    pub field_name: String,
    /// Field whose repeated group defines the rows, `None` for one row per record
    pub group_by_field_name: Option<String>,
    pub dims: Vec<usize>,
    pub dim_paths: Vec<String>,
    pub data: FieldData,
}

impl FieldResult {
    pub fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(0)
    }

    /// Values per row
    pub fn width(&self) -> usize {
        self.dims.iter().skip(1).product()
    }

    pub fn is_string(&self) -> bool {
        self.data.is_string()
    }

    /// Convert into a RawFieldMap entry
    ///
    /// String fields must be one value wide.
    pub fn into_field_values(self) -> Result<FieldValues> {
        let rows = self.rows();
        let width = self.width();

        match self.data {
            FieldData::Numeric(values) => Ok(FieldValues::Numeric(Array2::new(rows, width, values)?)),
            FieldData::Strings(_) if width > 1 => Err(Error::shape_mismatch(
                self.field_name,
                format!("string field is {} values wide", width),
            )),
            FieldData::Strings(values) => Ok(FieldValues::Strings(values)),
        }
    }
}

/// Ordered collection of per-record frames for a declared set of fields
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    names: Vec<String>,
    frames: Vec<DataFrame>,
    missing: MissingValue,
}

impl ResultSet {
    pub fn new(names: Vec<String>) -> Self {
        Self::with_missing(names, MissingValue::default())
    }

    pub fn with_missing(names: Vec<String>, missing: MissingValue) -> Self {
        Self {
            names,
            frames: Vec::new(),
            missing,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn frames(&self) -> &[DataFrame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn missing(&self) -> &MissingValue {
        &self.missing
    }

    /// Append one record's frame
    ///
    /// Every field's repeat counts must be self-consistent, and fields sharing
    /// enclosing repeated groups must agree on the counts of those groups.
    pub fn push_frame(&mut self, frame: DataFrame) -> Result<()> {
        let record = self.frames.len();

        for field in frame.fields() {
            field.validate(record)?;
        }

        let present: Vec<&DataField> = frame.fields().iter().filter(|f| !f.missing).collect();
        for (i, field) in present.iter().enumerate() {
            for sibling in &present[i + 1..] {
                check_siblings(field, sibling, record)?;
            }
        }

        self.frames.push(frame);
        Ok(())
    }

    /// Rectangular array of one declared field across every record
    ///
    /// Each nesting level is padded to its largest repeat count in the batch;
    /// unused slots hold the missing sentinel (empty string for strings).
    /// Records where the field is absent or flagged missing get a fully missing
    /// row.
    pub fn get(&self, name: &str) -> Result<FieldResult> {
        let fields = self.observed(name)?;

        let Some((depth, is_string)) = shape_of(name, &fields)? else {
            // Nothing observed anywhere: one missing value per record
            return Ok(FieldResult {
                field_name: name.to_string(),
                group_by_field_name: None,
                dims: vec![self.frames.len()],
                dim_paths: Vec::new(),
                data: FieldData::Numeric(vec![self.missing.sentinel; self.frames.len()]),
            });
        };

        let mut maxima = vec![1usize; depth];
        for field in fields.iter().flatten() {
            for (max, counts) in maxima.iter_mut().zip(&field.seq_counts) {
                *max = counts.iter().copied().fold(*max, usize::max);
            }
        }

        let width: usize = maxima.iter().product();
        let strides: Vec<usize> = (0..depth)
            .map(|level| maxima[level + 1..].iter().product())
            .collect();

        let rows = self.frames.len();
        let data = if is_string {
            let mut values = vec![String::new(); rows * width];
            for (record, field) in fields.iter().enumerate() {
                if let Some(DataField {
                    data: FieldData::Strings(leaves),
                    seq_counts,
                    ..
                }) = field
                {
                    for (offset, leaf) in leaf_offsets(seq_counts, &strides).into_iter().zip(leaves) {
                        values[record * width + offset] = leaf.clone();
                    }
                }
            }
            FieldData::Strings(values)
        } else {
            let mut values = vec![self.missing.sentinel; rows * width];
            for (record, field) in fields.iter().enumerate() {
                if let Some(DataField {
                    data: FieldData::Numeric(leaves),
                    seq_counts,
                    ..
                }) = field
                {
                    for (offset, leaf) in leaf_offsets(seq_counts, &strides).into_iter().zip(leaves) {
                        values[record * width + offset] = *leaf;
                    }
                }
            }
            FieldData::Numeric(values)
        };

        debug!(
            "Field '{}': {} records padded to width {}",
            name, rows, width
        );

        let mut dims = Vec::with_capacity(depth + 1);
        dims.push(rows);
        dims.extend(maxima);

        Ok(FieldResult {
            field_name: name.to_string(),
            group_by_field_name: None,
            dims,
            dim_paths: dim_paths(&fields),
            data,
        })
    }

    /// Array of one field with a row per instance of another field's repeated group
    ///
    /// Rows are the innermost repeat instances of `group_by`, record after record.
    /// A field nested no deeper than that group repeats its enclosing value on
    /// every row; a deeper field spreads its remaining levels across the columns,
    /// padded as in [`get`](Self::get). A record without the group-by field
    /// contributes one fully missing row.
    pub fn get_grouped(&self, name: &str, group_by: &str) -> Result<FieldResult> {
        let fields = self.observed(name)?;
        let groups = self.observed(group_by)?;

        let (depth, is_string) = shape_of(name, &fields)?.unwrap_or((0, false));
        let group_depth = shape_of(group_by, &groups)?.map_or(0, |(depth, _)| depth);

        for (record, (field, group)) in fields.iter().zip(&groups).enumerate() {
            if let (Some(field), Some(group)) = (field, group) {
                let shared = depth.min(group_depth);
                if field.seq_path[..shared] != group.seq_path[..shared]
                    || field.seq_counts[..shared] != group.seq_counts[..shared]
                {
                    return Err(Error::structural_mismatch(
                        name,
                        record,
                        format!("not nested in the repeated groups of '{}'", group_by),
                    ));
                }
            }
        }

        // Levels below the group become columns
        let inner = depth.saturating_sub(group_depth);
        let mut maxima = vec![1usize; inner];
        for field in fields.iter().flatten() {
            for (max, counts) in maxima.iter_mut().zip(&field.seq_counts[depth - inner..]) {
                *max = counts.iter().copied().fold(*max, usize::max);
            }
        }
        let width: usize = maxima.iter().product();
        let strides: Vec<usize> = (0..inner)
            .map(|level| maxima[level + 1..].iter().product())
            .collect();

        let row_counts: Vec<usize> = groups
            .iter()
            .map(|group| match group {
                Some(group) if group_depth > 0 => group.seq_counts[group_depth - 1].iter().sum(),
                _ => 1,
            })
            .collect();
        let rows: usize = row_counts.iter().sum();

        let mut data = if is_string {
            FieldData::Strings(vec![String::new(); rows * width])
        } else {
            FieldData::Numeric(vec![self.missing.sentinel; rows * width])
        };

        let mut base = 0;
        for ((field, group), count) in fields.iter().zip(&groups).zip(&row_counts) {
            if let (Some(field), Some(group)) = (field, group) {
                if inner == 0 {
                    // One enclosing value per group instance
                    let tree = RepeatTree::new(&group.seq_counts);
                    for row in 0..*count {
                        let source = match depth {
                            0 => 0,
                            _ => tree.ancestor(row, group_depth - 1, depth - 1),
                        };
                        copy_value(&mut data, &field.data, base + row, source);
                    }
                } else {
                    let tree = RepeatTree::new(&field.seq_counts);
                    for leaf in 0..field.data.len() {
                        let mut index = leaf;
                        let mut offset = 0;
                        for level in (group_depth..depth).rev() {
                            offset += tree.positions[level][index] * strides[level - group_depth];
                            index = tree.parents[level][index];
                        }
                        copy_value(&mut data, &field.data, (base + index) * width + offset, leaf);
                    }
                }
            }
            base += count;
        }

        debug!(
            "Field '{}' grouped by '{}': {} rows of width {}",
            name, group_by, rows, width
        );

        let mut dims = Vec::with_capacity(inner + 1);
        dims.push(rows);
        dims.extend(maxima);

        Ok(FieldResult {
            field_name: name.to_string(),
            group_by_field_name: Some(group_by.to_string()),
            dims,
            dim_paths: dim_paths(&fields),
            data,
        })
    }

    /// Per-record view of a declared field, `None` where absent or flagged missing
    fn observed(&self, name: &str) -> Result<Vec<Option<&DataField>>> {
        if !self.names.iter().any(|n| n == name) {
            return Err(Error::field_not_found(name));
        }

        Ok(self
            .frames
            .iter()
            .map(|frame| frame.field(name).filter(|field| !field.missing))
            .collect())
    }

    /// Assemble every declared field into a RawFieldMap
    pub fn to_raw_field_map(&self) -> Result<RawFieldMap> {
        let mut map = RawFieldMap::new();
        for name in &self.names {
            map.insert(name.as_str(), self.get(name)?.into_field_values()?);
        }
        Ok(map)
    }
}

/// Fields sharing leading repeated groups must agree on those groups' counts
fn check_siblings(a: &DataField, b: &DataField, record: usize) -> Result<()> {
    let shared = a
        .seq_path
        .iter()
        .zip(&b.seq_path)
        .take_while(|(x, y)| x == y)
        .count();

    if a.seq_counts[..shared] != b.seq_counts[..shared] {
        return Err(Error::structural_mismatch(
            b.name.as_str(),
            record,
            format!("repeat counts disagree with sibling field '{}'", a.name),
        ));
    }

    Ok(())
}

/// Nesting depth and string flag shared by every record holding the field
fn shape_of(name: &str, fields: &[Option<&DataField>]) -> Result<Option<(usize, bool)>> {
    let Some(reference) = fields.iter().flatten().next() else {
        return Ok(None);
    };
    let depth = reference.depth();
    let is_string = reference.data.is_string();

    for (record, field) in fields.iter().enumerate() {
        let Some(field) = field else { continue };

        if field.depth() != depth {
            return Err(Error::structural_mismatch(
                name,
                record,
                format!(
                    "nesting depth {} differs from depth {} in other records",
                    field.depth(),
                    depth
                ),
            ));
        }
        if field.data.is_string() != is_string {
            return Err(Error::structural_mismatch(
                name,
                record,
                "field mixes string and numeric values across records",
            ));
        }
    }

    Ok(Some((depth, is_string)))
}

fn dim_paths(fields: &[Option<&DataField>]) -> Vec<String> {
    fields
        .iter()
        .flatten()
        .next()
        .map(|field| field.dim_paths.clone())
        .unwrap_or_default()
}

fn copy_value(out: &mut FieldData, data: &FieldData, to: usize, from: usize) {
    match (out, data) {
        (FieldData::Numeric(out), FieldData::Numeric(data)) => out[to] = data[from],
        (FieldData::Strings(out), FieldData::Strings(data)) => out[to] = data[from].clone(),
        _ => {}
    }
}

/// Parent instance and position within that parent, per level, for every repeat instance
struct RepeatTree {
    parents: Vec<Vec<usize>>,
    positions: Vec<Vec<usize>>,
}

impl RepeatTree {
    fn new(seq_counts: &[Vec<usize>]) -> Self {
        let mut parents = Vec::with_capacity(seq_counts.len());
        let mut positions = Vec::with_capacity(seq_counts.len());

        for counts in seq_counts {
            let mut level_parents = Vec::new();
            let mut level_positions = Vec::new();
            for (parent, &count) in counts.iter().enumerate() {
                level_parents.extend(std::iter::repeat_n(parent, count));
                level_positions.extend(0..count);
            }
            parents.push(level_parents);
            positions.push(level_positions);
        }

        Self { parents, positions }
    }

    /// Instance at level `to` enclosing instance `index` of level `from`
    fn ancestor(&self, mut index: usize, from: usize, to: usize) -> usize {
        for level in (to + 1..=from).rev() {
            index = self.parents[level][index];
        }
        index
    }
}

/// Position of each leaf within a padded row, in leaf order
fn leaf_offsets(seq_counts: &[Vec<usize>], strides: &[usize]) -> Vec<usize> {
    let mut offsets = vec![0usize];

    for (counts, stride) in seq_counts.iter().zip(strides) {
        offsets = offsets
            .iter()
            .zip(counts)
            .flat_map(|(base, &count)| (0..count).map(move |j| base + j * stride))
            .collect();
    }

    offsets
}
