//! Matrix Market coordinate files
//!
//! The reader accepts the `coordinate` format with `real`, `integer` or
//! `pattern` values and `general`, `symmetric` or `skew-symmetric`
//! symmetry. Input is consumed through a fixed-size buffer one line at a
//! time, so memory use is bounded by the buffer plus the entries kept.
//! Every parse failure carries the 1-based line number it was found on.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::error::{AlgebraError, Result};
use crate::matrix::{CompressedMatrix, DuplicatePolicy, Matrix, Scalar, StorageOrder};
use crate::params::ParallelizationThresholds;

const BANNER: &str = "%%matrixmarket";

/// Cap on the up-front allocation for declared entries
const MAX_PREALLOCATED_ENTRIES: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Integer,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
    SkewSymmetric,
}

/// Parsed `%%MatrixMarket` banner
#[derive(Debug, Clone, Copy)]
struct Header {
    field: Field,
    symmetry: Symmetry,
}

/// Line source that tracks the current line number and reuses one buffer
struct Lines<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    number: usize,
}

impl<R: Read> Lines<R> {
    fn new(source: R, capacity: usize) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, source),
            buf: Vec::new(),
            number: 0,
        }
    }

    /// Next raw line, trimmed; bytes that are not UTF-8 are malformed input
    fn next_line(&mut self) -> Result<Option<&str>> {
        self.buf.clear();
        if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.number += 1;
        match std::str::from_utf8(&self.buf) {
            Ok(text) => Ok(Some(text.trim())),
            Err(_) => Err(AlgebraError::malformed(
                self.number,
                "line is not valid UTF-8",
            )),
        }
    }

    /// Next line that is neither blank nor a `%` comment, with its number
    fn next_content(&mut self) -> Result<Option<(usize, &str)>> {
        loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if !line.is_empty() && !line.starts_with('%') => break,
                Some(_) => {}
            }
        }
        // validated by next_line
        let text = std::str::from_utf8(&self.buf).unwrap_or_default();
        Ok(Some((self.number, text.trim())))
    }
}

/// Streaming Matrix Market reader
#[derive(Debug, Clone)]
pub struct MatrixMarketReader {
    buffer_size: usize,
    order: StorageOrder,
    duplicates: DuplicatePolicy,
}

impl MatrixMarketReader {
    /// Reader using the buffer size from `thresholds`; produces CSR and
    /// rejects duplicate entries unless configured otherwise
    pub fn new(thresholds: &ParallelizationThresholds) -> Self {
        Self {
            buffer_size: thresholds.buffer_size.max(1),
            order: StorageOrder::RowMajor,
            duplicates: DuplicatePolicy::Reject,
        }
    }

    pub fn with_order(mut self, order: StorageOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Opens and reads the file at `path`
    pub fn read_path<T, P>(&self, path: P) -> Result<CompressedMatrix<T>>
    where
        T: Scalar + FromStr,
        P: AsRef<Path>,
    {
        let file = File::open(path.as_ref())?;
        debug!("reading Matrix Market file {}", path.as_ref().display());
        self.read(file)
    }

    /// Parses a Matrix Market stream into compressed storage
    ///
    /// # Errors
    ///
    /// `MalformedInput` with the offending line for a bad banner, an
    /// unsupported format, a bad size line, an unparsable or out-of-range
    /// entry, an entry count that differs from the declared one, or a
    /// rejected duplicate. `Io` when the stream itself fails.
    pub fn read<T, R>(&self, source: R) -> Result<CompressedMatrix<T>>
    where
        T: Scalar + FromStr,
        R: Read,
    {
        let mut lines = Lines::new(source, self.buffer_size);

        let header = match lines.next_line()? {
            Some(banner) => parse_banner(banner).map_err(|reason| AlgebraError::malformed(1, reason))?,
            None => return Err(AlgebraError::malformed(1, "empty input, expected a banner")),
        };

        let (n_rows, n_cols, declared) = match lines.next_content()? {
            Some((line, size)) => {
                parse_size(size).map_err(|reason| AlgebraError::malformed(line, reason))?
            }
            None => {
                return Err(AlgebraError::malformed(
                    lines.number + 1,
                    "missing size line",
                ))
            }
        };
        debug!(
            "Matrix Market header: {:?} {:?}, {}x{} with {} entries",
            header.field, header.symmetry, n_rows, n_cols, declared
        );

        // (row, col, value, line the value came from)
        let mut entries: Vec<(usize, usize, T, usize)> =
            Vec::with_capacity(declared.min(MAX_PREALLOCATED_ENTRIES));

        for seen in 0..declared {
            let Some((line, text)) = lines.next_content()? else {
                return Err(AlgebraError::malformed(
                    lines.number + 1,
                    format!("expected {declared} entries, found {seen}"),
                ));
            };
            let (i, j, value) = parse_entry::<T>(text, header.field, n_rows, n_cols)
                .map_err(|reason| AlgebraError::malformed(line, reason))?;

            if i == j && header.symmetry == Symmetry::SkewSymmetric && value != T::zero() {
                return Err(AlgebraError::malformed(
                    line,
                    format!(
                        "skew-symmetric diagonal entry ({}, {}) must be zero",
                        i + 1,
                        j + 1
                    ),
                ));
            }

            entries.push((i, j, value, line));
            if i != j {
                match header.symmetry {
                    Symmetry::General => {}
                    Symmetry::Symmetric => entries.push((j, i, value, line)),
                    Symmetry::SkewSymmetric => {
                        let negated = value.checked_neg().ok_or_else(|| {
                            AlgebraError::malformed(line, format!("cannot negate {value}"))
                        })?;
                        entries.push((j, i, negated, line));
                    }
                }
            }
        }

        if let Some((line, _)) = lines.next_content()? {
            return Err(AlgebraError::malformed(
                line,
                format!("more entries than the {declared} declared"),
            ));
        }

        self.assemble(n_rows, n_cols, entries)
    }

    fn assemble<T: Scalar>(
        &self,
        n_rows: usize,
        n_cols: usize,
        mut entries: Vec<(usize, usize, T, usize)>,
    ) -> Result<CompressedMatrix<T>> {
        let order = self.order;
        entries.sort_by_key(|&(i, j, _, _)| match order {
            StorageOrder::RowMajor => (i, j),
            StorageOrder::ColumnMajor => (j, i),
        });

        if self.duplicates == DuplicatePolicy::Reject {
            if let Some(pair) = entries
                .windows(2)
                .find(|pair| pair[0].0 == pair[1].0 && pair[0].1 == pair[1].1)
            {
                let (i, j, _, first) = pair[0];
                let second = pair[1].3;
                return Err(AlgebraError::malformed(
                    first.max(second),
                    format!("duplicate entry ({}, {})", i + 1, j + 1),
                ));
            }
        }

        CompressedMatrix::from_triplets(
            n_rows,
            n_cols,
            order,
            entries.into_iter().map(|(i, j, v, _)| (i, j, v)),
            DuplicatePolicy::Accumulate,
        )
    }
}

fn parse_banner(line: &str) -> std::result::Result<Header, String> {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
    if tokens.first().map(String::as_str) != Some(BANNER) {
        return Err(format!("expected a %%MatrixMarket banner, found {line:?}"));
    }
    if tokens.len() != 5 {
        return Err(format!("banner needs 5 fields, found {}", tokens.len()));
    }
    if tokens[1] != "matrix" {
        return Err(format!("unsupported object {:?}", tokens[1]));
    }
    if tokens[2] != "coordinate" {
        return Err(format!("unsupported format {:?}", tokens[2]));
    }
    let field = match tokens[3].as_str() {
        "real" => Field::Real,
        "integer" => Field::Integer,
        "pattern" => Field::Pattern,
        other => return Err(format!("unsupported field {other:?}")),
    };
    let symmetry = match tokens[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        "skew-symmetric" => Symmetry::SkewSymmetric,
        other => return Err(format!("unsupported symmetry {other:?}")),
    };
    Ok(Header { field, symmetry })
}

fn parse_size(line: &str) -> std::result::Result<(usize, usize, usize), String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(format!(
            "size line needs rows, cols and entries, found {:?}",
            line
        ));
    }
    let number = |s: &str, what: &str| {
        s.parse::<usize>()
            .map_err(|_| format!("invalid number of {what}: {s:?}"))
    };
    Ok((
        number(parts[0], "rows")?,
        number(parts[1], "columns")?,
        number(parts[2], "entries")?,
    ))
}

fn parse_entry<T: Scalar + FromStr>(
    line: &str,
    field: Field,
    n_rows: usize,
    n_cols: usize,
) -> std::result::Result<(usize, usize, T), String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let expected = if field == Field::Pattern { 2 } else { 3 };
    if parts.len() != expected {
        return Err(format!(
            "expected {expected} fields per entry, found {}",
            parts.len()
        ));
    }

    let index = |s: &str, extent: usize, what: &str| -> std::result::Result<usize, String> {
        let one_based = s
            .parse::<usize>()
            .map_err(|_| format!("invalid {what} index {s:?}"))?;
        if one_based == 0 || one_based > extent {
            return Err(format!("{what} index {one_based} outside 1..={extent}"));
        }
        Ok(one_based - 1)
    };
    let i = index(parts[0], n_rows, "row")?;
    let j = index(parts[1], n_cols, "column")?;

    let value = match field {
        Field::Pattern => T::one(),
        Field::Real | Field::Integer => parts[2]
            .parse::<T>()
            .map_err(|_| format!("cannot parse value {:?}", parts[2]))?,
    };
    Ok((i, j, value))
}

/// Writes `matrix` as a `coordinate real general` Matrix Market stream
pub fn write_matrix_market<T: Scalar, W: Write>(matrix: &CompressedMatrix<T>, writer: W) -> Result<()> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(out, "{} {} {}", matrix.rows(), matrix.cols(), matrix.nnz())?;
    for (i, j, value) in matrix.triplets() {
        writeln!(out, "{} {} {}", i + 1, j + 1, value)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes `matrix` to a new file at `path`
pub fn write_matrix_market_path<T: Scalar, P: AsRef<Path>>(
    matrix: &CompressedMatrix<T>,
    path: P,
) -> Result<()> {
    let file = File::create(path)?;
    write_matrix_market(matrix, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> MatrixMarketReader {
        MatrixMarketReader::new(&ParallelizationThresholds::default())
    }

    fn read(text: &str) -> Result<CompressedMatrix<f64>> {
        reader().read(text.as_bytes())
    }

    #[test]
    fn test_single_entry() {
        let m = read("%%MatrixMarket matrix coordinate real general\n2 2 1\n1 1 5.0\n").unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.nnz(), 1);
        assert_eq!(m.get(0, 0).unwrap(), 5.0);
        assert_eq!(m.get(1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let text = "%%MatrixMarket matrix coordinate real general\n\
                    % a comment\n\
                    \n\
                    3 3 2\n\
                    % between entries\n\
                    1 3 2.5\n\
                    \n\
                    3 1 -1\n";
        let m = read(text).unwrap();
        assert_eq!(m.get(0, 2).unwrap(), 2.5);
        assert_eq!(m.get(2, 0).unwrap(), -1.0);
    }

    #[test]
    fn test_symmetric_mirrors() {
        let text = "%%MatrixMarket matrix coordinate integer symmetric\n\
                    3 3 3\n\
                    1 1 4\n\
                    2 1 7\n\
                    3 2 9\n";
        let m: CompressedMatrix<i32> = reader().read(text.as_bytes()).unwrap();
        assert_eq!(m.nnz(), 5);
        assert_eq!(m.get(0, 1).unwrap(), 7);
        assert_eq!(m.get(1, 0).unwrap(), 7);
        assert_eq!(m.get(1, 2).unwrap(), 9);
    }

    #[test]
    fn test_skew_symmetric_negates() {
        let text = "%%MatrixMarket matrix coordinate real skew-symmetric\n2 2 1\n2 1 3.0\n";
        let m = read(text).unwrap();
        assert_eq!(m.get(1, 0).unwrap(), 3.0);
        assert_eq!(m.get(0, 1).unwrap(), -3.0);
    }

    #[test]
    fn test_skew_symmetric_diagonal_must_be_zero() {
        let text = "%%MatrixMarket matrix coordinate real skew-symmetric\n2 2 2\n2 1 3.0\n2 2 1.0\n";
        assert_eq!(malformed_line(text), Some(4));

        let zero_diagonal =
            "%%MatrixMarket matrix coordinate real skew-symmetric\n2 2 2\n2 1 3.0\n1 1 0.0\n";
        assert_eq!(read(zero_diagonal).unwrap().nnz(), 3);
    }

    #[test]
    fn test_pattern_values_are_one() {
        let text = "%%MatrixMarket matrix coordinate pattern general\n2 3 2\n1 2\n2 3\n";
        let m = reader()
            .with_order(StorageOrder::ColumnMajor)
            .read::<f64, _>(text.as_bytes())
            .unwrap();
        assert_eq!(m.order(), StorageOrder::ColumnMajor);
        assert_eq!(m.get(0, 1).unwrap(), 1.0);
        assert_eq!(m.get(1, 2).unwrap(), 1.0);
    }

    fn malformed_line(text: &str) -> Option<usize> {
        match read(text) {
            Err(AlgebraError::MalformedInput { line, .. }) => line,
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_inputs_report_lines() {
        assert_eq!(malformed_line(""), Some(1));
        assert_eq!(malformed_line("%%MatrixMarket matrix array real general\n"), Some(1));
        assert_eq!(
            malformed_line("%%MatrixMarket matrix coordinate complex general\n"),
            Some(1)
        );
        assert_eq!(
            malformed_line("%%MatrixMarket matrix coordinate real general\n2 2\n"),
            Some(2)
        );
        // index 0
        assert_eq!(
            malformed_line("%%MatrixMarket matrix coordinate real general\n2 2 1\n0 1 1.0\n"),
            Some(3)
        );
        // out of range
        assert_eq!(
            malformed_line("%%MatrixMarket matrix coordinate real general\n2 2 2\n1 1 1.0\n3 1 1.0\n"),
            Some(4)
        );
        // unparsable value
        assert_eq!(
            malformed_line("%%MatrixMarket matrix coordinate real general\n2 2 1\n1 1 abc\n"),
            Some(3)
        );
    }

    #[test]
    fn test_entry_count_mismatch() {
        let fewer = "%%MatrixMarket matrix coordinate real general\n2 2 2\n1 1 1.0\n";
        assert!(matches!(read(fewer), Err(AlgebraError::MalformedInput { .. })));

        let more = "%%MatrixMarket matrix coordinate real general\n2 2 1\n1 1 1.0\n2 2 1.0\n";
        assert_eq!(malformed_line(more), Some(4));
    }

    #[test]
    fn test_duplicates() {
        let text = "%%MatrixMarket matrix coordinate real general\n2 2 2\n1 1 1.0\n1 1 2.0\n";
        assert_eq!(malformed_line(text), Some(4));

        let m = reader()
            .with_duplicates(DuplicatePolicy::Accumulate)
            .read::<f64, _>(text.as_bytes())
            .unwrap();
        assert_eq!(m.nnz(), 1);
        assert_eq!(m.get(0, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_small_buffer_reads_long_lines() {
        let reader = MatrixMarketReader::new(&ParallelizationThresholds::default().with_buffer_size(4));
        let m: CompressedMatrix<f64> = reader
            .read("%%MatrixMarket matrix coordinate real general\n1 1 1\n1 1 123.456\n".as_bytes())
            .unwrap();
        assert_eq!(m.get(0, 0).unwrap(), 123.456);
    }

    #[test]
    fn test_write_then_read() {
        let m = CompressedMatrix::from_raw(
            2,
            3,
            StorageOrder::RowMajor,
            vec![0, 2, 3],
            vec![0, 2, 1],
            vec![1.5, -2.0, 4.0],
        )
        .unwrap();
        let mut buf = Vec::new();
        write_matrix_market(&m, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("%%MatrixMarket matrix coordinate real general\n2 3 3\n"));

        let back = read(&text).unwrap();
        assert_eq!(back.to_dense(), m.to_dense());
    }
}
