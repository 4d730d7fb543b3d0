//! Atomic record edits.
//!
//! Every operation addresses the *first* segment whose tag matches, except
//! [`delete_segment`] which removes all of them. A missing segment or an
//! unusable index never fails: the record is left as is and the reason is
//! returned in [`OpOutcome::Skipped`].
//!
//! Padding policy differs per operation and is kept on purpose:
//! [`modify_field`] never creates fields, while [`reorder_fields`],
//! [`copy_value`] and [`insert_fields`] grow the segment as needed.

use std::fmt;

use hl7_model::{Action, Record, Segment};

/// Largest field count an edit may pad a segment to. Indices that would need
/// more are skipped as out of range.
pub const MAX_FIELDS: usize = 10_000;

/// Result of one atomic edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    Applied,
    Skipped(SkipReason),
}

impl OpOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Why an edit left the record untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    SegmentNotFound {
        segment: String,
    },
    FieldOutOfRange {
        segment: String,
        index: usize,
        field_count: usize,
    },
    /// A reorder with no indices would leave a segment without its tag.
    EmptyOrder {
        segment: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SegmentNotFound { segment } => write!(f, "segment {segment} not found"),
            Self::FieldOutOfRange {
                segment,
                index,
                field_count,
            } => write!(
                f,
                "field {index} out of range for {segment} ({field_count} fields)"
            ),
            Self::EmptyOrder { segment } => write!(f, "empty field order for {segment}"),
        }
    }
}

/// Field count needed to address `index`, if within [`MAX_FIELDS`].
fn padded_len(index: usize) -> Option<usize> {
    index.checked_add(1).filter(|len| *len <= MAX_FIELDS)
}

fn out_of_range(segment: &Segment, index: usize) -> OpOutcome {
    OpOutcome::Skipped(SkipReason::FieldOutOfRange {
        segment: segment.tag().to_string(),
        index,
        field_count: segment.field_count(),
    })
}

fn not_found(segment: &str) -> OpOutcome {
    OpOutcome::Skipped(SkipReason::SegmentNotFound {
        segment: segment.to_string(),
    })
}

/// Dispatch one [`Action`] to its operation.
pub fn apply_action(record: &mut Record, action: &Action) -> OpOutcome {
    match action {
        Action::DeleteSegment { segment } => delete_segment(record, segment),
        Action::AddSegment {
            new_segment,
            position,
            values,
        } => add_segment(record, new_segment, *position, values),
        Action::ModifyField {
            segment,
            field_index,
            new_value,
        } => modify_field(record, segment, *field_index, new_value),
        Action::ReorderFields { segment, new_order } => {
            reorder_fields(record, segment, new_order)
        }
        Action::CopyValue {
            source_segment,
            source_field,
            dest_segment,
            dest_field,
        } => copy_value(
            record,
            source_segment,
            *source_field,
            dest_segment,
            *dest_field,
        ),
        Action::InsertFields {
            segment,
            values,
            start_index,
        } => insert_fields(record, segment, values, *start_index),
    }
}

/// Remove every segment tagged `tag`.
pub fn delete_segment(record: &mut Record, tag: &str) -> OpOutcome {
    if record.remove_segments(tag) == 0 {
        return not_found(tag);
    }
    OpOutcome::Applied
}

/// Insert `[tag] + values` at `position`.
///
/// `None`, negative, or past-the-end positions append.
pub fn add_segment(
    record: &mut Record,
    tag: &str,
    position: Option<i64>,
    values: &[String],
) -> OpOutcome {
    let len = record.segment_count();
    let index = position
        .and_then(|p| usize::try_from(p).ok())
        .filter(|p| *p <= len)
        .unwrap_or(len);
    record.insert_segment(index, Segment::with_values(tag, values.iter().cloned()));
    OpOutcome::Applied
}

/// Overwrite field `index` of the first `tag` segment if it already exists.
pub fn modify_field(record: &mut Record, tag: &str, index: usize, value: &str) -> OpOutcome {
    let Some(segment) = record.first_mut(tag) else {
        return not_found(tag);
    };
    let field_count = segment.field_count();
    match segment.set_field(index, value) {
        Some(_) => OpOutcome::Applied,
        None => OpOutcome::Skipped(SkipReason::FieldOutOfRange {
            segment: tag.to_string(),
            index,
            field_count,
        }),
    }
}

/// Rebuild the first `tag` segment as `[fields[i] for i in order]`.
///
/// The segment is padded with empty fields up to `max(order) + 1` first, so
/// any index up to [`MAX_FIELDS`] is valid; repeats duplicate and omissions
/// truncate.
pub fn reorder_fields(record: &mut Record, tag: &str, order: &[usize]) -> OpOutcome {
    let Some(max_index) = order.iter().copied().max() else {
        return OpOutcome::Skipped(SkipReason::EmptyOrder {
            segment: tag.to_string(),
        });
    };
    let Some(segment) = record.first_mut(tag) else {
        return not_found(tag);
    };
    let Some(len) = padded_len(max_index) else {
        return out_of_range(segment, max_index);
    };
    segment.pad_to(len);
    let fields = segment.fields();
    let reordered: Vec<String> = order.iter().map(|&i| fields[i].clone()).collect();
    match segment.replace_fields(reordered) {
        Ok(()) => OpOutcome::Applied,
        Err(_) => OpOutcome::Skipped(SkipReason::EmptyOrder {
            segment: tag.to_string(),
        }),
    }
}

/// Copy field `source_index` of the first `source` segment into field
/// `dest_index` of the first `dest` segment, padding the destination.
pub fn copy_value(
    record: &mut Record,
    source: &str,
    source_index: usize,
    dest: &str,
    dest_index: usize,
) -> OpOutcome {
    let Some(source_segment) = record.first(source) else {
        return not_found(source);
    };
    let Some(value) = source_segment.field(source_index).map(str::to_string) else {
        return OpOutcome::Skipped(SkipReason::FieldOutOfRange {
            segment: source.to_string(),
            index: source_index,
            field_count: source_segment.field_count(),
        });
    };
    let Some(dest_segment) = record.first_mut(dest) else {
        return not_found(dest);
    };
    let Some(len) = padded_len(dest_index) else {
        return out_of_range(dest_segment, dest_index);
    };
    dest_segment.pad_to(len);
    dest_segment.set_field(dest_index, value);
    OpOutcome::Applied
}

/// Insert `values` into the first `tag` segment at `start_index`.
///
/// `None` or an index at or past the end appends.
pub fn insert_fields(
    record: &mut Record,
    tag: &str,
    values: &[String],
    start_index: Option<usize>,
) -> OpOutcome {
    let Some(segment) = record.first_mut(tag) else {
        return not_found(tag);
    };
    match start_index {
        Some(start) if start < segment.field_count() => {
            segment.insert_fields(start, values.iter().cloned());
        }
        _ => segment.append_fields(values.iter().cloned()),
    }
    OpOutcome::Applied
}
