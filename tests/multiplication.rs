//! Integration tests for the multiplication engine

use matalg::{
    AlgebraError, CompressedMatrix, DenseMatrix, Engine, Matrix, Operand,
    ParallelizationThresholds, Product, ProductKind, StorageOrder, Strategy, ThresholdBoundary,
    Vector,
};

fn sequential_engine() -> Engine {
    Engine::new(ParallelizationThresholds::always_sequential().with_threads(2)).unwrap()
}

fn two_by_two() -> (DenseMatrix<i64>, DenseMatrix<i64>, DenseMatrix<i64>) {
    (
        DenseMatrix::from_rows(&[vec![1, 2], vec![3, 4]]).unwrap(),
        DenseMatrix::from_rows(&[vec![5, 6], vec![7, 8]]).unwrap(),
        DenseMatrix::from_rows(&[vec![19, 22], vec![43, 50]]).unwrap(),
    )
}

#[test]
fn test_two_by_two_on_every_strategy_and_storage() {
    let engine = sequential_engine();
    let (a, b, expected) = two_by_two();
    let a_csr = a.compress(StorageOrder::RowMajor);
    let a_csc = a.compress(StorageOrder::ColumnMajor);
    let b_csc = b.compress(StorageOrder::ColumnMajor);

    let pairs = [
        (Operand::Dense(&a), Operand::Dense(&b)),
        (Operand::Compressed(&a_csr), Operand::Dense(&b)),
        (Operand::Dense(&a), Operand::Compressed(&b_csc)),
        (Operand::Compressed(&a_csc), Operand::Compressed(&b_csc)),
    ];

    for (lhs, rhs) in pairs {
        for strategy in Strategy::ALL {
            let product = engine.multiply_with(lhs, rhs, strategy).unwrap();
            assert_eq!(product.to_dense(), expected, "{strategy}");
        }
    }
}

#[test]
fn test_result_storage_follows_operands() {
    let engine = sequential_engine();
    let (a, b, expected) = two_by_two();
    let a_csr = a.compress(StorageOrder::RowMajor);
    let b_csr = b.compress(StorageOrder::RowMajor);

    let both = engine
        .multiply(Operand::Compressed(&a_csr), Operand::Compressed(&b_csr))
        .unwrap();
    let c = both.into_compressed().expect("compressed times compressed");
    assert_eq!(c.order(), StorageOrder::RowMajor);
    assert_eq!(c.to_dense(), expected);

    let mixed = engine
        .multiply(Operand::Compressed(&a_csr), Operand::Dense(&b))
        .unwrap();
    assert!(matches!(mixed, Product::Dense(_)));
}

#[test]
fn test_dimension_mismatch_is_rejected() {
    let engine = sequential_engine();
    let a = DenseMatrix::<f64>::zeros(2, 3);
    let b = DenseMatrix::<f64>::zeros(4, 2);

    for strategy in Strategy::ALL {
        let err = engine
            .multiply_with(Operand::Dense(&a), Operand::Dense(&b), strategy)
            .unwrap_err();
        assert!(matches!(
            err,
            AlgebraError::DimensionMismatch {
                lhs: (2, 3),
                rhs: (4, 2)
            }
        ));
    }

    let x = Vector::from_vec(vec![1.0, 2.0]);
    assert!(engine
        .multiply(Operand::Dense(&a), Operand::Vector(&x))
        .is_err());
}

#[test]
fn test_vector_products() {
    let engine = sequential_engine();
    // [ 1 0 2 ]
    // [ 0 3 0 ]
    let m = DenseMatrix::from_rows(&[vec![1, 0, 2], vec![0, 3, 0]]).unwrap();
    let csc = m.compress(StorageOrder::ColumnMajor);
    let x = Vector::from_vec(vec![1, 2, 3]);
    let y = Vector::from_vec(vec![4, 5]);

    for strategy in Strategy::ALL {
        for lhs in [Operand::Dense(&m), Operand::Compressed(&csc)] {
            let mx = engine
                .multiply_with(lhs, Operand::Vector(&x), strategy)
                .unwrap();
            assert_eq!(mx.into_vector().unwrap(), Vector::from_vec(vec![7, 6]));

            let ym = engine
                .multiply_with(Operand::Vector(&y), lhs, strategy)
                .unwrap();
            assert_eq!(ym.into_vector().unwrap(), Vector::from_vec(vec![4, 15, 8]));
        }
    }

    let dot = engine
        .multiply(Operand::Vector(&x), Operand::Vector(&x))
        .unwrap();
    assert_eq!(dot.into_vector().unwrap(), Vector::from_vec(vec![14]));
}

#[test]
fn test_plan_thresholds() {
    let thresholds = ParallelizationThresholds::default()
        .with_nrows_limit(10)
        .with_ncols_limit(10)
        .with_threads(2);
    let exclusive = Engine::new(thresholds.clone()).unwrap();
    let inclusive =
        Engine::new(thresholds.with_boundary(ThresholdBoundary::Inclusive)).unwrap();

    let at_limit = CompressedMatrix::<f64>::identity(10, StorageOrder::RowMajor);
    let above = CompressedMatrix::<f64>::identity(11, StorageOrder::RowMajor);
    let x10 = Vector::<f64>::zeros(10);
    let x11 = Vector::<f64>::zeros(11);

    let plan = exclusive
        .plan(&Operand::Compressed(&at_limit), &Operand::Vector(&x10))
        .unwrap();
    assert_eq!(plan.strategy, Strategy::CompressedSequential);
    assert_eq!(plan.kind, ProductKind::MatrixVector);
    assert_eq!(plan.output, (10, 1));

    let plan = inclusive
        .plan(&Operand::Compressed(&at_limit), &Operand::Vector(&x10))
        .unwrap();
    assert_eq!(plan.strategy, Strategy::CompressedParallel);

    let plan = exclusive
        .plan(&Operand::Compressed(&above), &Operand::Vector(&x11))
        .unwrap();
    assert_eq!(plan.strategy, Strategy::CompressedParallel);

    let dense = DenseMatrix::<f64>::zeros(11, 3);
    let small = DenseMatrix::<f64>::zeros(3, 3);
    let plan = exclusive
        .plan(&Operand::Dense(&dense), &Operand::Dense(&small))
        .unwrap();
    assert_eq!(plan.strategy, Strategy::DenseParallel);
    assert_eq!(plan.output, (11, 3));
}

#[test]
fn test_inputs_are_untouched() {
    let engine = sequential_engine();
    let (a, b, _) = two_by_two();
    let before = (a.clone(), b.clone());
    engine
        .multiply(Operand::Dense(&a), Operand::Dense(&b))
        .unwrap();
    assert_eq!((a, b), before);
}

#[test]
fn test_cancellation_is_not_stored() {
    let engine = sequential_engine();
    let a = DenseMatrix::from_rows(&[vec![1.0, 1.0]])
        .unwrap()
        .compress(StorageOrder::RowMajor);
    let b = DenseMatrix::from_rows(&[vec![2.0], vec![-2.0]])
        .unwrap()
        .compress(StorageOrder::RowMajor);

    let c = engine
        .multiply(Operand::Compressed(&a), Operand::Compressed(&b))
        .unwrap()
        .into_compressed()
        .unwrap();
    assert_eq!(c.shape(), (1, 1));
    assert_eq!(c.nnz(), 0);
}
