//! Input adapter: turns a CSV column or a synthetic generator into [`Keys`].
//!
//! Non-numeric columns are mapped onto integer keys first: timestamps become
//! nanoseconds since the epoch, categories become their rank in the category
//! order and alphanumeric codes like `12A3N` become one packed integer that
//! sorts like the tuple of their parts.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::{BenchError, Keys, Result};

/// How the raw cells of a column are turned into keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColumnType {
    /// Integers, or floats when any kept cell is not integral
    #[default]
    Numeric,
    /// Date or date-time, as nanoseconds since the Unix epoch
    #[value(aliases = ["datetime", "timestamp", "date"])]
    Time,
    /// Rank of the value in the category order
    #[value(alias = "categorical")]
    Category,
    /// `<digits><letter><digits><letter>` codes
    #[value(alias = "alphanum")]
    Code,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Time => "time",
            ColumnType::Category => "category",
            ColumnType::Code => "code",
        }
    }
}

/// Column type plus the orderings the category and code encodings accept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnEncoding {
    pub kind: ColumnType,
    /// Explicit category order; values outside it are dropped.
    /// Sorted distinct values when absent.
    pub category_order: Option<Vec<String>>,
    /// Rank of each code suffix letter; `N` then `S` when absent
    pub code_suffix_order: Option<Vec<String>>,
}

/// Suffix letters not in the suffix order rank after every listed one
const UNLISTED_SUFFIX_BASE: i64 = 100;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

impl ColumnEncoding {
    pub fn new(kind: ColumnType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_category_order(mut self, order: Vec<String>) -> Self {
        self.category_order = Some(order);
        self
    }

    pub fn with_code_suffix_order(mut self, order: Vec<String>) -> Self {
        self.code_suffix_order = Some(order);
        self
    }

    /// Encode raw cells, returning the keys and the number of dropped cells
    pub fn encode<S: AsRef<str>>(&self, cells: &[S]) -> Result<(Keys, usize)> {
        match self.kind {
            ColumnType::Numeric => coerce_numeric(cells),
            ColumnType::Time => encode_time(cells),
            ColumnType::Category => encode_category(cells, self.category_order.as_deref()),
            ColumnType::Code => encode_codes(cells, self.code_suffix_order.as_deref()),
        }
    }
}

/// Load one named column from a comma-separated file with a header row
pub fn load_csv_column<P: AsRef<Path>>(
    path: P,
    column: &str,
    encoding: &ColumnEncoding,
) -> Result<Column> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        BenchError::InvalidInput(format!("cannot open {}: {}", path.display(), e))
    })?;
    let column = read_csv_column(BufReader::new(file), column, encoding)?;
    info!(
        "Loaded {} column '{}' from {}: {} {} keys ({} cells dropped)",
        encoding.kind.name(),
        column.name,
        path.display(),
        column.keys.len(),
        column.keys.dtype().name(),
        column.dropped
    );
    Ok(column)
}

/// A loaded column with the bookkeeping of what was dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub keys: Keys,
    /// Cells dropped because they were empty or did not parse as the column type
    pub dropped: usize,
}

/// Same as [`load_csv_column`] over any reader
pub fn read_csv_column<R: Read>(
    reader: R,
    column: &str,
    encoding: &ColumnEncoding,
) -> Result<Column> {
    let mut lines = BufReader::new(reader).lines();

    let header = match lines.next() {
        Some(line) => line.map_err(|e| BenchError::InvalidInput(e.to_string()))?,
        None => return Err(BenchError::InvalidInput("empty CSV input".to_string())),
    };
    let header = split_fields(header.trim_start_matches('\u{feff}'));
    let idx = header.iter().position(|h| h == column).ok_or_else(|| {
        BenchError::InvalidInput(format!(
            "column '{}' not found (columns: {})",
            column,
            header.join(", ")
        ))
    })?;

    let mut cells = Vec::new();
    for line in lines {
        let line = line.map_err(|e| BenchError::InvalidInput(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = split_fields(&line);
        cells.push(if idx < fields.len() {
            fields.swap_remove(idx)
        } else {
            String::new()
        });
    }

    let (keys, dropped) = encoding.encode(&cells)?;
    debug!("Column '{}': {} rows, {} dropped", column, cells.len(), dropped);
    Ok(Column {
        name: column.to_string(),
        keys,
        dropped,
    })
}

/// Numeric coercion: empty and unparsable cells are dropped. The column is
/// `Int` when every kept cell parses as i64, `Float` otherwise.
pub fn coerce_numeric<S: AsRef<str>>(cells: &[S]) -> Result<(Keys, usize)> {
    let kept: Vec<&str> = cells
        .iter()
        .map(|c| c.as_ref().trim())
        .filter(|c| c.parse::<f64>().is_ok_and(|v| !v.is_nan()))
        .collect();
    if kept.is_empty() {
        return Err(BenchError::InvalidInput("no numeric values in column".to_string()));
    }
    let dropped = cells.len() - kept.len();

    let ints: Option<Vec<i64>> = kept.iter().map(|c| c.parse::<i64>().ok()).collect();
    let keys = match ints {
        Some(ints) => Keys::Int(ints),
        None => Keys::from_floats(kept.iter().filter_map(|c| c.parse::<f64>().ok()).collect())?,
    };
    Ok((keys, dropped))
}

/// Nanoseconds since the epoch. Naive values are taken as UTC.
fn parse_timestamp(cell: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return dt.timestamp_nanos_opt();
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cell, fmt) {
            return dt.and_utc().timestamp_nanos_opt();
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cell, fmt) {
            return date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_nanos_opt();
        }
    }
    None
}

fn encode_time<S: AsRef<str>>(cells: &[S]) -> Result<(Keys, usize)> {
    let keys: Vec<i64> = cells
        .iter()
        .filter_map(|c| parse_timestamp(c.as_ref().trim()))
        .collect();
    if keys.is_empty() {
        return Err(BenchError::InvalidInput(
            "no value parses as a date or date-time".to_string(),
        ));
    }
    let dropped = cells.len() - keys.len();
    Ok((Keys::Int(keys), dropped))
}

/// Category codes. Empty cells and values outside an explicit order are dropped.
fn encode_category<S: AsRef<str>>(cells: &[S], order: Option<&[String]>) -> Result<(Keys, usize)> {
    let categories: Vec<&str> = match order {
        Some(order) => order.iter().map(String::as_str).collect(),
        None => {
            let mut distinct: Vec<&str> = cells
                .iter()
                .map(|c| c.as_ref())
                .filter(|c| !c.is_empty())
                .collect();
            distinct.sort_unstable();
            distinct.dedup();
            distinct
        }
    };
    let mut codes = HashMap::with_capacity(categories.len());
    for (code, category) in categories.iter().enumerate() {
        if codes.insert(*category, code as i64).is_some() {
            return Err(BenchError::InvalidInput(format!(
                "category '{}' listed twice in the category order",
                category
            )));
        }
    }

    let keys: Vec<i64> = cells
        .iter()
        .filter_map(|c| codes.get(c.as_ref()).copied())
        .collect();
    if keys.is_empty() {
        return Err(BenchError::InvalidInput("no valid categories in column".to_string()));
    }
    let dropped = cells.len() - keys.len();
    Ok((Keys::Int(keys), dropped))
}

fn leading_number(s: &str) -> Option<(i64, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((s[..end].parse().ok()?, &s[end..]))
}

fn leading_letter(s: &str) -> Option<(char, &str)> {
    let mut chars = s.chars();
    let letter = chars.next().filter(char::is_ascii_alphabetic)?;
    Some((letter.to_ascii_uppercase(), chars.as_str()))
}

/// Split `12A3N` into `[12, 0, 3, rank(N)]`; the second part is the letter's
/// offset from `A`
fn parse_code(cell: &str, suffix_rank: &HashMap<char, i64>) -> Option<[i64; 4]> {
    let (major, rest) = leading_number(cell.trim())?;
    let (series, rest) = leading_letter(rest)?;
    let (minor, rest) = leading_number(rest)?;
    let (suffix, rest) = leading_letter(rest)?;
    if !rest.is_empty() {
        return None;
    }
    let rank = suffix_rank
        .get(&suffix)
        .copied()
        .unwrap_or(suffix as i64 - 'A' as i64 + UNLISTED_SUFFIX_BASE);
    Some([major, series as i64 - 'A' as i64, minor, rank])
}

/// Pack each code into one integer with a mixed radix sized to the column, so
/// integer order equals lexicographic order of the parts
fn encode_codes<S: AsRef<str>>(cells: &[S], suffix_order: Option<&[String]>) -> Result<(Keys, usize)> {
    let suffix_rank: HashMap<char, i64> = match suffix_order {
        Some(order) => order
            .iter()
            .enumerate()
            .filter_map(|(rank, s)| {
                let mut chars = s.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c.to_ascii_uppercase(), rank as i64)),
                    _ => None,
                }
            })
            .collect(),
        None => HashMap::from([('N', 0), ('S', 1)]),
    };

    let parts: Vec<[i64; 4]> = cells
        .iter()
        .filter_map(|c| parse_code(c.as_ref(), &suffix_rank))
        .collect();
    if parts.is_empty() {
        return Err(BenchError::InvalidInput(
            "no value matches the <digits><letter><digits><letter> code pattern".to_string(),
        ));
    }

    let minor_radix = parts.iter().map(|p| p[2]).max().unwrap_or(0).saturating_add(1);
    let suffix_radix = parts.iter().map(|p| p[3]).max().unwrap_or(0).saturating_add(1);
    let pack = |p: &[i64; 4]| -> Option<i64> {
        p[0].checked_mul(26)?
            .checked_add(p[1])?
            .checked_mul(minor_radix)?
            .checked_add(p[2])?
            .checked_mul(suffix_radix)?
            .checked_add(p[3])
    };
    let keys: Vec<i64> = parts
        .iter()
        .map(|p| {
            pack(p).ok_or_else(|| {
                BenchError::InvalidInput(format!("code parts {:?} overflow a 64-bit key", p))
            })
        })
        .collect::<Result<_>>()?;
    let dropped = cells.len() - keys.len();
    Ok((Keys::Int(keys), dropped))
}

fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// `n` uniform integers in `[0, max]`
pub fn synthetic_ints(n: usize, max: i64, seed: u64) -> Keys {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let upper = max.max(0);
    Keys::Int((0..n).map(|_| rng.gen_range(0..=upper)).collect())
}

/// `n` uniform floats in `[0, 1)`
pub fn synthetic_floats(n: usize, seed: u64) -> Keys {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Keys::Float((0..n).map(|_| rng.gen_range(0.0..1.0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dtype;
    use std::io::Write;

    fn numeric() -> ColumnEncoding {
        ColumnEncoding::default()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn ints(keys: Keys) -> Vec<i64> {
        match keys {
            Keys::Int(v) => v,
            Keys::Float(_) => panic!("expected integer keys"),
        }
    }

    #[test]
    fn test_int_column_with_junk() {
        let csv = "id,year,name\n1,2001,a\n2,,b\n3,n/a,c\n4,1999,d\n";
        let column = read_csv_column(csv.as_bytes(), "year", &numeric()).unwrap();
        assert_eq!(column.keys, Keys::Int(vec![2001, 1999]));
        assert_eq!(column.dropped, 2);
    }

    #[test]
    fn test_float_column() {
        let csv = "price\n1.5\n2\n-0.25\n";
        let column = read_csv_column(csv.as_bytes(), "price", &numeric()).unwrap();
        assert_eq!(column.keys, Keys::Float(vec![1.5, 2.0, -0.25]));
        assert_eq!(column.keys.dtype(), Dtype::Float);
    }

    #[test]
    fn test_junk_cells_do_not_force_float() {
        let (keys, dropped) = coerce_numeric(&["3", "x", "7", ""]).unwrap();
        assert_eq!(keys, Keys::Int(vec![3, 7]));
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_nan_cells_dropped() {
        let (keys, dropped) = coerce_numeric(&["0.5", "NaN", "1.5"]).unwrap();
        assert_eq!(keys, Keys::Float(vec![0.5, 1.5]));
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_quoted_fields() {
        let csv = "\"name, full\",score\n\"Doe, J\",10\n\"Roe \"\"R\"\"\",20\n";
        let column = read_csv_column(csv.as_bytes(), "score", &numeric()).unwrap();
        assert_eq!(column.keys, Keys::Int(vec![10, 20]));
    }

    #[test]
    fn test_missing_column_and_no_values() {
        let csv = "a,b\n1,2\n";
        assert!(read_csv_column(csv.as_bytes(), "c", &numeric()).is_err());
        assert!(read_csv_column("a\nx\ny\n".as_bytes(), "a", &numeric()).is_err());
        assert!(read_csv_column("".as_bytes(), "a", &numeric()).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x,y").unwrap();
        for i in 0..100 {
            writeln!(file, "{},{}", i, 100 - i).unwrap();
        }
        let column = load_csv_column(file.path(), "y", &numeric()).unwrap();
        assert_eq!(column.keys.len(), 100);
        assert!(load_csv_column("/nonexistent/file.csv", "y", &numeric()).is_err());
    }

    #[test]
    fn test_synthetic_generators_are_seeded() {
        assert_eq!(synthetic_ints(500, 1000, 7), synthetic_ints(500, 1000, 7));
        assert_ne!(synthetic_ints(500, 1000, 7), synthetic_ints(500, 1000, 8));
        match synthetic_ints(1000, 9, 1) {
            Keys::Int(v) => assert!(v.iter().all(|x| (0..=9).contains(x))),
            _ => unreachable!(),
        }
        match synthetic_floats(1000, 1) {
            Keys::Float(v) => assert!(v.iter().all(|x| (0.0..1.0).contains(x))),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_time_column_as_epoch_nanos() {
        let encoding = ColumnEncoding::new(ColumnType::Time);
        let cells = [
            "2021-03-04 05:06:07",
            "2021-03-04",
            "not a date",
            "2021-03-04T05:06:07+02:00",
            "",
            "2021-03-04T05:06:07.5",
        ];
        let (keys, dropped) = encoding.encode(&cells).unwrap();
        assert_eq!(
            ints(keys),
            vec![
                1_614_834_367_000_000_000,
                1_614_816_000_000_000_000,
                1_614_827_167_000_000_000,
                1_614_834_367_500_000_000,
            ]
        );
        assert_eq!(dropped, 2);
        assert!(encoding.encode(&["yesterday", "12:00"]).is_err());
    }

    #[test]
    fn test_category_codes_follow_sorted_values() {
        let encoding = ColumnEncoding::new(ColumnType::Category);
        let (keys, dropped) = encoding
            .encode(&["pear", "apple", "", "fig", "apple"])
            .unwrap();
        assert_eq!(ints(keys), vec![2, 0, 1, 0]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_category_codes_follow_explicit_order() {
        let encoding = ColumnEncoding::new(ColumnType::Category)
            .with_category_order(strings(&["low", "mid", "high"]));
        let (keys, dropped) = encoding
            .encode(&["high", "low", "unknown", "mid", "low"])
            .unwrap();
        assert_eq!(ints(keys), vec![2, 0, 1, 0]);
        assert_eq!(dropped, 1);

        assert!(encoding.encode(&["none", "of", "these"]).is_err());
        let repeated = ColumnEncoding::new(ColumnType::Category)
            .with_category_order(strings(&["a", "b", "a"]));
        assert!(repeated.encode(&["a"]).is_err());
    }

    #[test]
    fn test_codes_sort_like_their_parts() {
        let encoding = ColumnEncoding::new(ColumnType::Code);
        // Ascending by (number, series letter, minor number, suffix N < S)
        let ordered = ["1A2N", "1A2S", "1a10n", "1B0N", " 2A1S ", "10A1N"];
        let (keys, dropped) = encoding.encode(&ordered).unwrap();
        let keys = ints(keys);
        assert_eq!(dropped, 0);
        assert!(keys.windows(2).all(|w| w[0] < w[1]), "{:?}", keys);

        // Unlisted suffixes rank after N and S
        let (keys, _) = encoding.encode(&["3C4X", "3C4S"]).unwrap();
        let keys = ints(keys);
        assert!(keys[0] > keys[1]);

        let (keys, dropped) = encoding.encode(&["12A3N", "12A3", "A3N", "12A3N4", ""]).unwrap();
        assert_eq!(ints(keys).len(), 1);
        assert_eq!(dropped, 4);
        assert!(encoding.encode(&["1234", "abc"]).is_err());
    }

    #[test]
    fn test_code_suffix_order_overrides_default() {
        let encoding = ColumnEncoding::new(ColumnType::Code)
            .with_code_suffix_order(strings(&["s", "n"]));
        let (keys, _) = encoding.encode(&["5A1N", "5A1S"]).unwrap();
        let keys = ints(keys);
        assert!(keys[0] > keys[1]);
    }

    #[test]
    fn test_typed_csv_column() {
        let csv = "when,tier\n2020-01-02,gold\n,silver\n2020-01-01,gold\n";
        let times = read_csv_column(csv.as_bytes(), "when", &ColumnEncoding::new(ColumnType::Time))
            .unwrap();
        assert_eq!(times.dropped, 1);
        assert_eq!(
            ints(times.keys),
            vec![1_577_923_200_000_000_000, 1_577_836_800_000_000_000]
        );
        let tiers = read_csv_column(
            csv.as_bytes(),
            "tier",
            &ColumnEncoding::new(ColumnType::Category),
        )
        .unwrap();
        assert_eq!(ints(tiers.keys), vec![0, 1, 0]);
    }
}
