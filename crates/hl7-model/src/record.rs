//! Segment-based record model.
//!
//! A message is held as an ordered list of [`Segment`]s, one per line, each an
//! ordered list of `|`-separated fields. Field 0 is the segment tag (`MSH`,
//! `PID`, ...) and is what every lookup matches against.
//!
//! Field contents are opaque: component (`^`), repetition (`~`), escape (`\`)
//! and sub-component (`&`) characters are kept as plain text.

use std::fmt;

use crate::error::{ModelError, Result};

/// Reserved field separator.
pub const FIELD_DELIMITER: char = '|';

/// Line terminator written after every segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SegmentTerminator {
    /// `\n`, used for files on disk.
    #[default]
    Lf,
    /// `\r`, the native HL7 segment separator.
    Cr,
    /// `\r\n`.
    CrLf,
}

impl SegmentTerminator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Cr => "\r",
            Self::CrLf => "\r\n",
        }
    }
}

/// One line of a message.
///
/// Always holds at least one field (the tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    fields: Vec<String>,
}

impl Segment {
    /// Create a segment holding only its tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            fields: vec![tag.into()],
        }
    }

    /// Create a segment from a tag followed by field values.
    pub fn with_values<I, S>(tag: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields = vec![tag.into()];
        fields.extend(values.into_iter().map(Into::into));
        Self { fields }
    }

    /// Create a segment from a complete field list (tag included).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptySegment`] if `fields` is empty.
    pub fn from_fields(fields: Vec<String>) -> Result<Self> {
        if fields.is_empty() {
            return Err(ModelError::EmptySegment);
        }
        Ok(Self { fields })
    }

    /// Split one line on the field delimiter.
    pub fn parse_line(line: &str) -> Self {
        Self {
            fields: line.split(FIELD_DELIMITER).map(str::to_string).collect(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.fields[0]
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Number of fields, tag included.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Overwrite an existing field.
    ///
    /// Returns the previous value, or `None` (segment untouched) when `index`
    /// is out of range.
    pub fn set_field(&mut self, index: usize, value: impl Into<String>) -> Option<String> {
        let slot = self.fields.get_mut(index)?;
        Some(std::mem::replace(slot, value.into()))
    }

    /// Append empty fields until the segment holds at least `count` fields.
    ///
    /// Returns the number of fields added.
    pub fn pad_to(&mut self, count: usize) -> usize {
        let missing = count.saturating_sub(self.fields.len());
        if missing > 0 {
            self.fields.resize(count, String::new());
        }
        missing
    }

    /// Insert `values` as a contiguous block starting at `start`.
    ///
    /// A `start` at or beyond the end appends.
    pub fn insert_fields<I>(&mut self, start: usize, values: I)
    where
        I: IntoIterator<Item = String>,
    {
        let start = start.min(self.fields.len());
        self.fields.splice(start..start, values);
    }

    pub fn append_fields<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.fields.extend(values);
    }

    /// Replace the whole field list.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptySegment`] and leaves the segment unchanged
    /// if `fields` is empty.
    pub fn replace_fields(&mut self, fields: Vec<String>) -> Result<()> {
        if fields.is_empty() {
            return Err(ModelError::EmptySegment);
        }
        self.fields = fields;
        Ok(())
    }

    /// Render the segment as one delimited line without a terminator.
    pub fn to_line(&self) -> String {
        self.fields.join(&FIELD_DELIMITER.to_string())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// A parsed message: segments in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    segments: Vec<Segment>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse message text into segments.
    ///
    /// Lines may end in `\n`, `\r\n` or a bare `\r`. Blank and whitespace-only
    /// lines are dropped; every other line is kept verbatim and split on `|`.
    pub fn parse(text: &str) -> Self {
        let segments = text
            .split(['\r', '\n'])
            .filter(|line| !line.trim().is_empty())
            .map(Segment::parse_line)
            .collect();
        Self { segments }
    }

    /// Serialize with a `\n` after every segment, the last one included.
    pub fn serialize(&self) -> String {
        self.serialize_with(SegmentTerminator::Lf)
    }

    pub fn serialize_with(&self, terminator: SegmentTerminator) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push_str(&segment.to_line());
            out.push_str(terminator.as_str());
        }
        out
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Tags of all segments in order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(Segment::tag)
    }

    /// First segment whose tag equals `tag`.
    pub fn first(&self, tag: &str) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.tag() == tag)
    }

    pub fn first_mut(&mut self, tag: &str) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|segment| segment.tag() == tag)
    }

    /// Insert a segment at `index`, or at the end when `index` is past it.
    ///
    /// Returns the index the segment landed at.
    pub fn insert_segment(&mut self, index: usize, segment: Segment) -> usize {
        let index = index.min(self.segments.len());
        self.segments.insert(index, segment);
        index
    }

    pub fn push_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Remove every segment whose tag equals `tag`.
    ///
    /// Returns the number of segments removed.
    pub fn remove_segments(&mut self, tag: &str) -> usize {
        let before = self.segments.len();
        self.segments.retain(|segment| segment.tag() != tag);
        before - self.segments.len()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl From<Vec<Segment>> for Record {
    fn from(segments: Vec<Segment>) -> Self {
        Self::from_segments(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_lines_and_fields() {
        let record = Record::parse("MSH|^~\\&|A\nPID|1|John|M\n");
        assert_eq!(record.segment_count(), 2);
        assert_eq!(record.segments()[0].fields(), ["MSH", "^~\\&", "A"]);
        assert_eq!(record.segments()[1].field(2), Some("John"));
    }

    #[test]
    fn parse_accepts_carriage_return_separators() {
        let record = Record::parse("MSH|A\rPID|1\r\nPV1|2");
        assert_eq!(record.tags().collect::<Vec<_>>(), ["MSH", "PID", "PV1"]);
    }

    #[test]
    fn parse_drops_blank_lines() {
        let record = Record::parse("\nMSH|A\n\n   \nPID|1\n\n");
        assert_eq!(record.segment_count(), 2);
        assert_eq!(record.serialize(), "MSH|A\nPID|1\n");
    }

    #[test]
    fn parse_keeps_trailing_empty_fields() {
        let record = Record::parse("PID|1||\n");
        assert_eq!(record.segments()[0].field_count(), 4);
        assert_eq!(record.serialize(), "PID|1||\n");
    }

    #[test]
    fn serialize_with_cr_terminator() {
        let record = Record::parse("MSH|A\nPID|1\n");
        assert_eq!(
            record.serialize_with(SegmentTerminator::Cr),
            "MSH|A\rPID|1\r"
        );
    }

    #[test]
    fn empty_record_serializes_to_empty_text() {
        assert_eq!(Record::parse("").serialize(), "");
        assert!(Record::parse("\n\n").is_empty());
    }

    #[test]
    fn first_returns_first_matching_segment() {
        let mut record = Record::parse("OBX|1|A\nOBX|2|B\n");
        assert_eq!(record.first("OBX").and_then(|s| s.field(1)), Some("1"));
        record.first_mut("OBX").unwrap().set_field(2, "Z");
        assert_eq!(record.serialize(), "OBX|1|Z\nOBX|2|B\n");
        assert!(record.first("PID").is_none());
    }

    #[test]
    fn set_field_out_of_range_is_untouched() {
        let mut segment = Segment::with_values("PID", ["1"]);
        assert_eq!(segment.set_field(5, "X"), None);
        assert_eq!(segment.field_count(), 2);
        assert_eq!(segment.set_field(1, "2"), Some("1".to_string()));
    }

    #[test]
    fn pad_and_insert_fields() {
        let mut segment = Segment::with_values("PID", ["a", "b"]);
        assert_eq!(segment.pad_to(5), 2);
        assert_eq!(segment.pad_to(3), 0);
        segment.insert_fields(1, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(segment.fields(), ["PID", "x", "y", "a", "b", "", ""]);
    }

    #[test]
    fn segments_reject_empty_field_lists() {
        assert!(matches!(
            Segment::from_fields(Vec::new()),
            Err(ModelError::EmptySegment)
        ));
        let mut segment = Segment::new("PID");
        assert!(segment.replace_fields(Vec::new()).is_err());
        assert_eq!(segment.tag(), "PID");
    }

    #[test]
    fn insert_segment_past_end_appends() {
        let mut record = Record::parse("MSH|A\n");
        assert_eq!(record.insert_segment(10, Segment::new("ZZZ")), 1);
        assert_eq!(record.insert_segment(0, Segment::new("AAA")), 0);
        assert_eq!(record.tags().collect::<Vec<_>>(), ["AAA", "MSH", "ZZZ"]);
    }
}
