//! Markdown formatting for run outcomes.
//!
//! The wrappers here borrow a [`RunResult`] or a [`StageError`] and render
//! markdown suitable for the CLI's terminal renderer:
//!
//! ```rust
//! use seedling_core::{display::SeedReport, RunResult};
//!
//! let mut result = RunResult::new("mongodb://localhost:27017/app");
//! result.cleared.push("User".to_string());
//! result.populated.insert("User".to_string(), 2);
//!
//! let output = SeedReport::new(&result).to_string();
//! assert!(output.contains("- User: 2"));
//! ```

use std::error::Error as _;
use std::fmt;

use crate::{
    check::CheckResult,
    error::{PartialEffects, StageError},
    models::RunResult,
};

/// Wrapper type for displaying a successful run.
pub struct SeedReport<'a> {
    result: &'a RunResult,
}

impl<'a> SeedReport<'a> {
    pub fn new(result: &'a RunResult) -> Self {
        Self { result }
    }
}

impl fmt::Display for SeedReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Seeded {}", self.result.database_uri)?;
        writeln!(f)?;

        writeln!(f, "## Cleared")?;
        if self.result.cleared.is_empty() {
            writeln!(f, "No models cleared.")?;
        } else {
            for model in &self.result.cleared {
                writeln!(f, "- {model}")?;
            }
        }
        writeln!(f)?;

        writeln!(f, "## Populated")?;
        if self.result.populated.is_empty() {
            writeln!(f, "No documents inserted.")?;
        } else {
            for (model, count) in &self.result.populated {
                writeln!(f, "- {model}: {count}")?;
            }
            writeln!(f)?;
            writeln!(
                f,
                "**Total:** {} document(s)",
                self.result.total_inserted()
            )?;
        }
        Ok(())
    }
}

/// Wrapper type for displaying a failed run.
pub struct FailureReport<'a> {
    error: &'a StageError,
}

impl<'a> FailureReport<'a> {
    pub fn new(error: &'a StageError) -> Self {
        Self { error }
    }
}

impl fmt::Display for FailureReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Seeding failed ({})", self.error.code())?;
        writeln!(f)?;
        writeln!(f, "{}", self.error)?;

        let mut cause = self.error.source();
        while let Some(err) = cause {
            writeln!(f, "- caused by: {err}")?;
            cause = err.source();
        }

        if let Some(partial) = self.error.partial.as_ref().filter(|p| !p.is_empty()) {
            writeln!(f)?;
            write!(f, "{}", AppliedEffects(partial))?;
        }
        Ok(())
    }
}

/// Wrapper type for displaying the outcome of a setup check.
pub struct CheckReport<'a> {
    check: &'a CheckResult,
}

impl<'a> CheckReport<'a> {
    pub fn new(check: &'a CheckResult) -> Self {
        Self { check }
    }
}

impl fmt::Display for CheckReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Check {}", self.check.database_uri)?;
        writeln!(f)?;

        writeln!(f, "## Fixtures")?;
        if self.check.fixtures.is_empty() {
            writeln!(f, "No fixtures found.")?;
        }
        for fixture in &self.check.fixtures {
            writeln!(
                f,
                "- {}: {} document(s) in `{}`",
                fixture.model, fixture.documents, fixture.file
            )?;
        }
        writeln!(f)?;

        writeln!(f, "## Problems")?;
        if self.check.is_ok() {
            writeln!(f, "None.")?;
        }
        for problem in &self.check.problems {
            writeln!(f, "- {problem}")?;
        }
        Ok(())
    }
}

/// Effects left in the database by a failed stage.
struct AppliedEffects<'a>(&'a PartialEffects);

impl fmt::Display for AppliedEffects<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Applied before the failure (not rolled back)")?;
        for model in &self.0.cleared {
            writeln!(f, "- cleared {model}")?;
        }
        for (model, count) in &self.0.populated {
            writeln!(f, "- inserted {count} into {model}")?;
        }
        Ok(())
    }
}
