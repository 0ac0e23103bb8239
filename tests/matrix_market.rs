//! Reading and writing Matrix Market files on disk

use std::fs;
use std::io::Write;

use matalg::{
    random_sparse_matrix, write_matrix_market, write_matrix_market_path, AlgebraError,
    CompressedMatrix, DuplicatePolicy, Matrix, MatrixMarketReader, ParallelizationThresholds,
    StorageOrder,
};
use tempfile::{tempdir, NamedTempFile};

fn reader() -> MatrixMarketReader {
    MatrixMarketReader::new(&ParallelizationThresholds::default())
}

#[test]
fn test_read_path_single_entry() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "%%MatrixMarket matrix coordinate real general\n2 2 1\n1 1 5.0\n"
    )
    .unwrap();

    let m: CompressedMatrix<f64> = reader().read_path(file.path()).unwrap();
    assert_eq!(m.shape(), (2, 2));
    assert_eq!(m.nnz(), 1);
    assert_eq!(m.get(0, 0).unwrap(), 5.0);
    for (i, j) in [(0, 1), (1, 0), (1, 1)] {
        assert_eq!(m.get(i, j).unwrap(), 0.0);
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let result = reader().read_path::<f64, _>(dir.path().join("absent.mtx"));
    assert!(matches!(result, Err(AlgebraError::Io(_))));
}

#[test]
fn test_tiny_buffer_reads_long_lines() {
    let mut text = String::from("%%MatrixMarket matrix coordinate real general\n");
    text.push_str(&format!("% {}\n", "x".repeat(500)));
    text.push_str("3 3 2\n1 2 1.25\n3 3 -4.5\n");

    let small = MatrixMarketReader::new(&ParallelizationThresholds::default().with_buffer_size(8));
    assert_eq!(small.buffer_size(), 8);
    let m: CompressedMatrix<f64> = small.read(text.as_bytes()).unwrap();
    assert_eq!(m.get(0, 1).unwrap(), 1.25);
    assert_eq!(m.get(2, 2).unwrap(), -4.5);
}

#[test]
fn test_write_then_read_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("random.mtx");
    let original =
        random_sparse_matrix(40, 25, 0.1, -100i64..=100, StorageOrder::RowMajor, 17).unwrap();

    write_matrix_market_path(&original, &path).unwrap();
    let back: CompressedMatrix<i64> = reader().read_path(&path).unwrap();

    assert_eq!(back.shape(), original.shape());
    assert_eq!(back.to_dense(), original.to_dense());

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("%%MatrixMarket matrix coordinate real general\n40 25 "));
}

#[test]
fn test_column_major_output_and_accumulated_duplicates() {
    let text = "%%MatrixMarket matrix coordinate real general\n\
                3 2 3\n\
                3 2 1.0\n\
                1 1 2.0\n\
                3 2 0.5\n";
    let m: CompressedMatrix<f64> = reader()
        .with_order(StorageOrder::ColumnMajor)
        .with_duplicates(DuplicatePolicy::Accumulate)
        .read(text.as_bytes())
        .unwrap();

    assert_eq!(m.order(), StorageOrder::ColumnMajor);
    assert_eq!(m.nnz(), 2);
    assert_eq!(m.get(2, 1).unwrap(), 1.5);

    let mut out = Vec::new();
    write_matrix_market(&m, &mut out).unwrap();
    let written = String::from_utf8(out).unwrap();
    assert_eq!(written.lines().nth(1), Some("3 2 2"));
}

#[test]
fn test_invalid_utf8_reports_line() {
    let mut bytes = b"%%MatrixMarket matrix coordinate real general\n2 2 1\n1 1 ".to_vec();
    bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);

    let result: Result<CompressedMatrix<f64>, _> = reader().read(bytes.as_slice());
    assert!(matches!(
        result,
        Err(AlgebraError::MalformedInput { line: Some(3), .. })
    ));
}
