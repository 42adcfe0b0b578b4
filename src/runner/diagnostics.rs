use std::fmt::{Display, Formatter};
use std::time::Duration;

use camino::Utf8PathBuf;
use console::style;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The external generator ran and succeeded.
    Generated,
    /// Inputs unchanged since the last successful run, generator skipped.
    UpToDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitExecution {
    pub unit: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

/// Summary of a generation run.
///
/// This struct is returned by [`crate::Pipeline::run`]. Executions are listed
/// in registry order regardless of the execution mode.
#[derive(Debug, Default, Serialize)]
pub struct Diagnostics {
    pub executions: Vec<UnitExecution>,
    /// Index file written by the script variant.
    pub index: Option<Utf8PathBuf>,
}

impl Diagnostics {
    pub fn generated(&self) -> usize {
        self.count(Outcome::Generated)
    }

    pub fn up_to_date(&self) -> usize {
        self.count(Outcome::UpToDate)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.executions
            .iter()
            .filter(|execution| execution.outcome == outcome)
            .count()
    }

    pub fn total_time(&self) -> Duration {
        self.executions.iter().map(|execution| execution.duration).sum()
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.executions.is_empty() {
            return write!(f, "{}", style("Nothing to generate").yellow());
        }

        for execution in &self.executions {
            let label = match execution.outcome {
                Outcome::Generated => style("generated").green(),
                Outcome::UpToDate => style("up-to-date").blue(),
            };
            writeln!(f, "  {:<24} {} {:.2?}", execution.unit, label, execution.duration)?;
        }

        write!(
            f,
            "{} generated, {} up to date",
            style(self.generated()).bold(),
            style(self.up_to_date()).bold()
        )?;

        if let Some(index) = &self.index {
            write!(f, ", index at {index}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let diagnostics = Diagnostics {
            executions: vec![
                UnitExecution {
                    unit: "billing".into(),
                    outcome: Outcome::Generated,
                    duration: Duration::from_millis(30),
                },
                UnitExecution {
                    unit: "hexTractor".into(),
                    outcome: Outcome::UpToDate,
                    duration: Duration::from_millis(2),
                },
            ],
            index: None,
        };

        assert_eq!(diagnostics.generated(), 1);
        assert_eq!(diagnostics.up_to_date(), 1);
        assert_eq!(diagnostics.total_time(), Duration::from_millis(32));

        let text = diagnostics.to_string();
        assert!(text.contains("billing"));
        assert!(text.contains("up-to-date"));
        assert!(text.contains("generated,"));
    }
}
