//! Reporting collaborators for timing and correctness results

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::harness::SpeedReport;

/// One timed repetition
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub strategy: String,
    pub rows: usize,
    pub cols: usize,
    /// 0-based repetition index
    pub trial: usize,
    pub elapsed: Duration,
}

/// Outcome of one correctness case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub name: String,
    pub passed: bool,
    /// Failure message or panic payload
    pub detail: Option<String>,
}

/// Receives harness results as they are produced
///
/// Every method has a no-op default so implementations only handle what
/// they care about.
pub trait Reporter {
    fn trial(&mut self, _record: &TrialRecord) -> Result<()> {
        Ok(())
    }

    fn report(&mut self, _report: &SpeedReport) -> Result<()> {
        Ok(())
    }

    fn case(&mut self, _outcome: &CaseOutcome) -> Result<()> {
        Ok(())
    }

    /// Called once when a harness run is over
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Prints aligned tables to stdout
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    /// Also print every individual trial, not just means
    pub verbose: bool,
    header_printed: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trials() -> Self {
        Self {
            verbose: true,
            header_printed: false,
        }
    }

    fn header(&mut self) {
        if !self.header_printed {
            println!(
                "{:<36} {:>13} {:>8} {:>12}",
                "Strategy", "Size", "Trials", "Mean (ms)"
            );
            println!("{}", "-".repeat(72));
            self.header_printed = true;
        }
    }
}

impl Reporter for ConsoleReporter {
    fn trial(&mut self, record: &TrialRecord) -> Result<()> {
        if self.verbose {
            println!(
                "  {} {}x{} trial {}: {:.3} ms",
                record.strategy,
                record.rows,
                record.cols,
                record.trial,
                millis(record.elapsed)
            );
        }
        Ok(())
    }

    fn report(&mut self, report: &SpeedReport) -> Result<()> {
        self.header();
        println!(
            "{:<36} {:>13} {:>8} {:>12.3}",
            report.strategy,
            format!("{}x{}", report.rows, report.cols),
            report.trials.len(),
            millis(report.mean())
        );
        Ok(())
    }

    fn case(&mut self, outcome: &CaseOutcome) -> Result<()> {
        match (&outcome.detail, outcome.passed) {
            (_, true) => println!("[PASS] {}", outcome.name),
            (Some(detail), false) => println!("[FAIL] {}: {}", outcome.name, detail),
            (None, false) => println!("[FAIL] {}", outcome.name),
        }
        Ok(())
    }
}

/// Writes every trial as a CSV row: `Iteration,Method,MatrixSize,TimeMs`
pub struct CsvReporter<W: Write> {
    out: W,
}

impl<W: Write> CsvReporter<W> {
    /// Wraps `out` and writes the header line
    pub fn new(mut out: W) -> Result<Self> {
        writeln!(out, "Iteration,Method,MatrixSize,TimeMs")?;
        Ok(Self { out })
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl CsvReporter<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> Reporter for CsvReporter<W> {
    fn trial(&mut self, record: &TrialRecord) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{:.6}",
            record.trial,
            record.strategy,
            record.rows,
            millis(record.elapsed)
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps everything in memory for later inspection
#[derive(Debug, Default)]
pub struct MemoryReporter {
    pub trials: Vec<TrialRecord>,
    pub reports: Vec<SpeedReport>,
    pub cases: Vec<CaseOutcome>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for MemoryReporter {
    fn trial(&mut self, record: &TrialRecord) -> Result<()> {
        self.trials.push(record.clone());
        Ok(())
    }

    fn report(&mut self, report: &SpeedReport) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }

    fn case(&mut self, outcome: &CaseOutcome) -> Result<()> {
        self.cases.push(outcome.clone());
        Ok(())
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
