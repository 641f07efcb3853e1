//! A tolerant parser for newline-delimited TLE catalogs.
//!
//! Catalogs are sequences of `name`, `line 1`, `line 2` triplets. A triplet whose element
//! lines don't carry their `1 ` / `2 ` prefixes is skipped one line at a time, so a single
//! malformed entry never desynchronizes the entries that follow it.

use nom::{
    bytes::complete::tag,
    character::complete::{digit1, satisfy, space1},
    combinator::{opt, recognize, rest},
    sequence::{pair, preceded},
    IResult,
};
use sattypes::prelude::*;
use tracing::{debug, warn};

use crate::LOOKUP_NAME_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Missing line 1 after the name line")]
    MissingLine1,
    #[error("Missing line 2 after line 1")]
    MissingLine2,
    #[error("Line 1 does not start with '1 '")]
    Line1Prefix,
    #[error("Line 2 does not start with '2 '")]
    Line2Prefix,
}

/// The outcome for one scan position of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEntry {
    Accepted(TleRecord),
    Skipped {
        /// Index of the offending line among the non-empty, trimmed lines
        line: usize,
        text: String,
        reason: ParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogParse {
    pub entries: Vec<ParsedEntry>,
}

impl CatalogParse {
    pub fn records(&self) -> impl Iterator<Item = &TleRecord> {
        self.entries.iter().filter_map(|e| match e {
            ParsedEntry::Accepted(r) => Some(r),
            ParsedEntry::Skipped { .. } => None,
        })
    }

    pub fn into_records(self) -> Vec<TleRecord> {
        self.entries
            .into_iter()
            .filter_map(|e| match e {
                ParsedEntry::Accepted(r) => Some(r),
                ParsedEntry::Skipped { .. } => None,
            })
            .collect()
    }

    pub fn accepted_count(&self) -> usize {
        self.records().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries.len() - self.accepted_count()
    }
}

/// Parse a catalog, returning only the accepted records.
pub fn parse(raw: &str) -> Vec<TleRecord> {
    parse_catalog(raw).into_records()
}

/// Parse a catalog, keeping a tagged entry for every accepted triplet and every skipped line.
pub fn parse_catalog(raw: &str) -> CatalogParse {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut entries = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let name = lines[idx];
        match triplet(name, lines.get(idx + 1).copied(), lines.get(idx + 2).copied()) {
            Ok(record) => {
                entries.push(ParsedEntry::Accepted(record));
                idx += 3;
            }
            Err(reason) => {
                warn!(line = idx, name, %reason, "Skipping malformed TLE entry");
                entries.push(ParsedEntry::Skipped {
                    line: idx,
                    text: name.to_owned(),
                    reason,
                });
                idx += 1;
            }
        }
    }

    debug!(
        accepted = entries
            .iter()
            .filter(|e| matches!(e, ParsedEntry::Accepted(_)))
            .count(),
        scanned_lines = lines.len(),
        "Parsed TLE catalog"
    );

    CatalogParse { entries }
}

fn triplet(name: &str, line1: Option<&str>, line2: Option<&str>) -> Result<TleRecord, ParseError> {
    let line1 = line1.ok_or(ParseError::MissingLine1)?;
    element_line(LINE1_PREFIX, line1).map_err(|_| ParseError::Line1Prefix)?;
    let line2 = line2.ok_or(ParseError::MissingLine2)?;
    element_line(LINE2_PREFIX, line2).map_err(|_| ParseError::Line2Prefix)?;
    Ok(TleRecord::new(name, line1, line2))
}

fn element_line<'a>(prefix: &'static str, line: &'a str) -> IResult<&'a str, &'a str> {
    preceded(tag(prefix), rest)(line)
}

/// The catalog number field of line 1: an optional Alpha-5 letter followed by digits.
fn catalog_number(line1: &str) -> IResult<&str, &str> {
    preceded(
        pair(tag("1"), space1),
        recognize(pair(opt(satisfy(|c| c.is_ascii_uppercase())), digit1)),
    )(line1)
}

/// Derive the tracking id of a record, falling back to its name.
pub fn satellite_id(record: &TleRecord) -> SatelliteId {
    match catalog_number(&record.line1) {
        Ok((_, number)) => SatelliteId::from(number),
        Err(_) => SatelliteId::from(record.name.as_str()),
    }
}

/// Parse the response of a single-object lookup by catalog number.
///
/// Three or more lines are `name, line 1, line 2`; exactly two lines are the element lines
/// alone and get a synthetic `SAT-<id>` name.
pub fn parse_lookup_response(text: &str, catalog_number: &str) -> Option<TleRecord> {
    let lines: Vec<&str> = text
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let record = match lines.as_slice() {
        [line1, line2] => TleRecord::new(
            format!("{LOOKUP_NAME_PREFIX}{catalog_number}"),
            *line1,
            *line2,
        ),
        [name, line1, line2, ..] => TleRecord::new(*name, *line1, *line2),
        _ => return None,
    };

    record.has_valid_prefixes().then_some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const ISS_L1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_L2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    const TLE_SET: &str = indoc! {r#"
        ISS (ZARYA)
        1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
        2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537

        VANGUARD 1
        1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753
        2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667
        "#};

    #[test]
    fn well_formed_triplets_are_kept_verbatim() {
        let records = parse(TLE_SET);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], TleRecord::new("ISS (ZARYA)", ISS_L1, ISS_L2));
        assert_eq!(records[1].name, "VANGUARD 1");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let raw = format!("   ISS (ZARYA)  \n\t{ISS_L1}   \n{ISS_L2}\n\n\n");
        let records = parse(&raw);
        assert_eq!(records, vec![TleRecord::new("ISS (ZARYA)", ISS_L1, ISS_L2)]);
    }

    #[test]
    fn bad_line2_prefix_skips_only_that_entry() {
        let raw = indoc! {r#"
            BAD
            1 11111U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
            3 11111  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
            ISS (ZARYA)
            1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
            2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
            "#};
        let catalog = parse_catalog(raw);
        let records: Vec<_> = catalog.records().cloned().collect();
        assert_eq!(records, vec![TleRecord::new("ISS (ZARYA)", ISS_L1, ISS_L2)]);
        assert_eq!(catalog.skipped_count(), 3);
        assert_eq!(
            catalog.entries[0],
            ParsedEntry::Skipped {
                line: 0,
                text: "BAD".to_owned(),
                reason: ParseError::Line2Prefix,
            }
        );
    }

    #[test]
    fn bad_line1_prefix_skips_only_that_entry() {
        let raw = format!("BAD\nX{}\n{ISS_L2}\nISS (ZARYA)\n{ISS_L1}\n{ISS_L2}\n", &ISS_L1[1..]);
        let catalog = parse_catalog(&raw);
        assert_eq!(catalog.accepted_count(), 1);
        assert_eq!(
            catalog.records().next().map(|r| r.name.as_str()),
            Some("ISS (ZARYA)")
        );
        assert!(matches!(
            catalog.entries[0],
            ParsedEntry::Skipped {
                reason: ParseError::Line1Prefix,
                ..
            }
        ));
    }

    #[test]
    fn truncated_tail_is_skipped() {
        let raw = format!("ISS (ZARYA)\n{ISS_L1}\n{ISS_L2}\nLONELY\n{ISS_L1}\n");
        let catalog = parse_catalog(&raw);
        assert_eq!(catalog.accepted_count(), 1);
        let reasons: Vec<_> = catalog
            .entries
            .iter()
            .filter_map(|e| match e {
                ParsedEntry::Skipped { reason, .. } => Some(reason.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![ParseError::MissingLine2, ParseError::MissingLine1]
        );
    }

    #[test]
    fn empty_and_garbage_input() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
        let catalog = parse_catalog("<html>\n404 Not Found\n</html>");
        assert_eq!(catalog.accepted_count(), 0);
        assert_eq!(catalog.skipped_count(), 3);
    }

    #[test]
    fn parse_is_idempotent() {
        assert_eq!(parse(TLE_SET), parse(TLE_SET));
    }

    #[test]
    fn duplicate_entries_are_all_returned() {
        let raw = format!("{TLE_SET}\nISS AGAIN\n{ISS_L1}\n{ISS_L2}\n");
        let records = parse(&raw);
        assert_eq!(records.len(), 3);
        assert_eq!(satellite_id(&records[0]), satellite_id(&records[2]));
    }

    #[test]
    fn ids_from_catalog_number() {
        let iss = TleRecord::new("ISS (ZARYA)", ISS_L1, ISS_L2);
        assert_eq!(satellite_id(&iss).as_str(), "25544");

        let alpha5 = TleRecord::new(
            "ALPHA",
            "1 A0001U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
            ISS_L2,
        );
        assert_eq!(satellite_id(&alpha5).as_str(), "A0001");

        let unnumbered = TleRecord::new("MYSTERY", "1 U 98067A", ISS_L2);
        assert_eq!(satellite_id(&unnumbered).as_str(), "MYSTERY");
    }

    #[test]
    fn lookup_response_with_name() {
        let text = format!("ISS (ZARYA)\r\n{ISS_L1}\r\n{ISS_L2}\r\n");
        assert_eq!(
            parse_lookup_response(&text, "25544"),
            Some(TleRecord::new("ISS (ZARYA)", ISS_L1, ISS_L2))
        );
    }

    #[test]
    fn lookup_response_without_name() {
        let text = format!("{ISS_L1}\n{ISS_L2}\n");
        assert_eq!(
            parse_lookup_response(&text, "25544"),
            Some(TleRecord::new("SAT-25544", ISS_L1, ISS_L2))
        );
    }

    #[test]
    fn lookup_response_not_found() {
        assert_eq!(parse_lookup_response("No GP data found", "1"), None);
        assert_eq!(parse_lookup_response("", "1"), None);
        assert_eq!(parse_lookup_response("a\nb\nc", "1"), None);
    }
}
