//! Delimited record codec used by HNAP channel fields
//!
//! Channel tables arrive as a single string: records separated by `|+|`,
//! fields within a record separated by `^`. Firmware usually terminates each
//! record with a trailing `^`, which yields one empty trailing field.

use tracing::warn;

use crate::error::ExtractionError;

pub const RECORD_SEPARATOR: &str = "|+|";
pub const FIELD_SEPARATOR: char = '^';

/// One `^`-delimited record with trimmed fields
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    fields: Vec<&'a str>,
}

impl<'a> Record<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            fields: raw.split(FIELD_SEPARATOR).map(str::trim).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(|f| f.is_empty())
    }

    /// Fail unless the record carries at least `expected` fields
    pub fn require(&self, expected: usize) -> Result<(), ExtractionError> {
        if self.fields.len() < expected {
            return Err(ExtractionError::FieldCount {
                expected,
                found: self.fields.len(),
            });
        }
        Ok(())
    }

    /// Raw text of field `index`
    pub fn text(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }

    /// Non-empty owned text of field `index`
    pub fn string(&self, index: usize) -> Option<String> {
        self.text(index).filter(|s| !s.is_empty()).map(str::to_string)
    }

    /// Parse field `index` as a number, naming `field` in the error
    pub fn number<T: std::str::FromStr>(
        &self,
        index: usize,
        field: &'static str,
    ) -> Result<T, ExtractionError> {
        let raw = self.text(index).ok_or(ExtractionError::MissingField(field))?;
        raw.parse().map_err(|_| ExtractionError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
    }

    /// Frequency field given in MHz, converted to integer Hz
    pub fn mhz_as_hz(&self, index: usize, field: &'static str) -> Result<u64, ExtractionError> {
        let mhz: f64 = self.number(index, field)?;
        if !mhz.is_finite() || mhz < 0.0 {
            return Err(ExtractionError::InvalidNumber {
                field,
                value: mhz.to_string(),
            });
        }
        Ok((mhz * 1_000_000.0).round() as u64)
    }
}

/// Split `data` into records and convert each with `convert`.
///
/// Records with fewer than `min_fields` fields or that fail conversion are
/// logged and skipped; blank records are ignored silently.
pub fn parse_records<T, F>(data: &str, min_fields: usize, mut convert: F) -> Vec<T>
where
    F: FnMut(&Record<'_>) -> Result<T, ExtractionError>,
{
    let mut out = Vec::new();
    for raw in data.split(RECORD_SEPARATOR) {
        let record = Record::parse(raw);
        if record.is_empty() {
            continue;
        }
        match record.require(min_fields).and_then(|_| convert(&record)) {
            Ok(value) => out.push(value),
            Err(e) => warn!(record = %raw.trim(), error = %e, "Skipping malformed record"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_separator_adds_empty_field() {
        let record = Record::parse("1^Locked^QAM256^");
        assert_eq!(record.len(), 4);
        assert_eq!(record.text(3), Some(""));
        assert_eq!(record.string(3), None);
    }

    #[test]
    fn test_mhz_conversion() {
        let record = Record::parse("543.0^ 609.5 ^abc");
        assert_eq!(record.mhz_as_hz(0, "frequency"), Ok(543_000_000));
        assert_eq!(record.mhz_as_hz(1, "frequency"), Ok(609_500_000));
        assert!(matches!(
            record.mhz_as_hz(2, "frequency"),
            Err(ExtractionError::InvalidNumber { field: "frequency", .. })
        ));
    }

    #[test]
    fn test_short_record_skipped() {
        let data = "1^a^b|+|2^a|+|3^a^b|+|";
        let ids: Vec<u32> = parse_records(data, 3, |r| r.number(0, "channel_id"));
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_bad_number_skipped() {
        let data = "1^x|+|two^x|+|3^x";
        let ids: Vec<u32> = parse_records(data, 2, |r| r.number(0, "channel_id"));
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_empty_input() {
        let ids: Vec<u32> = parse_records("", 1, |r| r.number(0, "channel_id"));
        assert!(ids.is_empty());
    }
}
