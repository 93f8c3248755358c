//! Human-readable text reports.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::analyzers::coverage::{self, LowCoverageFunc};
use crate::analyzers::index::Declaration;
use crate::analyzers::placement::{self, MisplacedTest};
use crate::analyzers::{testgap, untested};
use crate::core::Result;

const WIDTH: usize = 80;

/// A report that knows its own text layout.
pub trait Report: Serialize {
    /// Write the human-readable form.
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<()>;
}

impl Report for testgap::Analysis {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<()> {
        banner(writer, '=')?;
        writeln!(writer, "{}", "GO TEST COVERAGE ANALYSIS".bold())?;
        banner(writer, '=')?;
        writeln!(writer, "Project: {}\n", self.root)?;

        write_untested(writer, &self.functions_without_tests)?;
        writeln!(writer)?;
        write_misplaced(writer, &self.misplaced_tests)?;

        if !self.low_coverage_funcs.is_empty() {
            writeln!(writer)?;
            write_low_coverage(writer, &self.low_coverage_funcs, self.threshold)?;
        }

        writeln!(writer)?;
        banner(writer, '=')?;

        let mut summary = format!(
            "Summary: {} functions without tests, {} misplaced tests",
            self.functions_without_tests.len(),
            self.misplaced_tests.len()
        );
        if !self.low_coverage_funcs.is_empty() {
            summary.push_str(&format!(
                ", {} low coverage functions",
                self.low_coverage_funcs.len()
            ));
        }
        writeln!(writer, "{}", summary.bold())?;
        writeln!(
            writer,
            "{}",
            format!(
                "Analyzed {} files ({} skipped), {} declarations, {} test routines",
                self.summary.files_analyzed,
                self.summary.files_skipped,
                self.summary.declarations,
                self.summary.test_routines
            )
            .dimmed()
        )?;
        Ok(())
    }
}

impl Report for untested::Analysis {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_untested(writer, &self.functions_without_tests)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "Summary: {} functions without tests ({} files analyzed)",
            self.functions_without_tests.len(),
            self.summary.files_analyzed
        )?;
        Ok(())
    }
}

impl Report for placement::Analysis {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_misplaced(writer, &self.misplaced_tests)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "Summary: {} misplaced tests ({} files analyzed)",
            self.misplaced_tests.len(),
            self.summary.files_analyzed
        )?;
        Ok(())
    }
}

impl Report for coverage::Analysis {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.low_coverage_funcs.is_empty() {
            section_header(
                writer,
                &format!("LOW COVERAGE FUNCTIONS (below {:.1}%) (0)", self.threshold),
            )?;
            writeln!(writer, "{}", "No functions below the threshold!".green())?;
        } else {
            write_low_coverage(writer, &self.low_coverage_funcs, self.threshold)?;
        }
        writeln!(writer)?;
        writeln!(
            writer,
            "Summary: {} low coverage functions of {} measured",
            self.low_coverage_funcs.len(),
            self.functions_measured
        )?;
        Ok(())
    }
}

fn banner<W: Write>(writer: &mut W, c: char) -> Result<()> {
    writeln!(writer, "{}", c.to_string().repeat(WIDTH))?;
    Ok(())
}

fn section_header<W: Write>(writer: &mut W, title: &str) -> Result<()> {
    banner(writer, '-')?;
    writeln!(writer, "{}", title.bold())?;
    banner(writer, '-')?;
    Ok(())
}

/// Print `\n<file>:` whenever the file changes, with a blank line between
/// groups.
fn file_heading<W: Write>(writer: &mut W, current: &mut Option<String>, file: &str) -> Result<()> {
    if current.as_deref() == Some(file) {
        return Ok(());
    }
    if current.is_some() {
        writeln!(writer)?;
    }
    writeln!(writer, "\n{}:", file.cyan())?;
    *current = Some(file.to_string());
    Ok(())
}

fn write_untested<W: Write>(writer: &mut W, functions: &[Declaration]) -> Result<()> {
    section_header(
        writer,
        &format!("FUNCTIONS WITHOUT TEST COVERAGE ({})", functions.len()),
    )?;

    if functions.is_empty() {
        writeln!(writer, "{}", "All functions have test coverage!".green())?;
        return Ok(());
    }

    let mut current = None;
    for decl in functions {
        file_heading(writer, &mut current, &decl.file)?;
        writeln!(writer, "  Line {}: {}", decl.line, decl.display_name().yellow())?;
    }
    Ok(())
}

fn write_misplaced<W: Write>(writer: &mut W, misplaced: &[MisplacedTest]) -> Result<()> {
    section_header(writer, &format!("MISPLACED TESTS ({})", misplaced.len()))?;

    if misplaced.is_empty() {
        writeln!(writer, "{}", "All tests are in the correct files!".green())?;
        return Ok(());
    }

    for entry in misplaced {
        writeln!(
            writer,
            "\n{} (line {}):",
            entry.test.name.yellow(),
            entry.test.line
        )?;
        writeln!(writer, "  Current file:  {}", entry.actual_file)?;
        writeln!(writer, "  Expected file: {}", entry.expected_file.cyan())?;
    }
    Ok(())
}

fn write_low_coverage<W: Write>(
    writer: &mut W,
    functions: &[LowCoverageFunc],
    threshold: f64,
) -> Result<()> {
    section_header(
        writer,
        &format!(
            "LOW COVERAGE FUNCTIONS (below {:.1}%) ({})",
            threshold,
            functions.len()
        ),
    )?;

    let mut current = None;
    for func in functions {
        file_heading(writer, &mut current, &func.file)?;
        writeln!(
            writer,
            "  Line {}: {} ({})",
            func.line,
            func.name,
            format!("{:.1}%", func.coverage).red()
        )?;
    }
    Ok(())
}
