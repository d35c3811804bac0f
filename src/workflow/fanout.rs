//! Fan-out / fan-in barrier over section tasks.
//!
//! One task per section, at most `concurrency` in flight. The barrier
//! returns only after every task has finished; results arrive in completion
//! order and are keyed by section name.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{info, warn};

use crate::types::{CompletedSection, Result, ScribeError, Section};

/// Outcome of one barrier
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Successful sections in arrival order
    pub completed: Vec<CompletedSection>,
    /// Failed section names with their errors, in arrival order
    pub failures: Vec<(String, ScribeError)>,
}

impl FanOutReport {
    /// First failure, if any task failed
    pub fn into_first_error(self) -> Option<ScribeError> {
        self.failures.into_iter().next().map(|(_, e)| e)
    }
}

/// Run `task` for each section and wait for all of them.
///
/// A task that reports a section under a different name breaks the join key
/// and is recorded as a failure.
pub async fn fan_out<F, Fut>(
    label: &str,
    sections: Vec<Section>,
    concurrency: usize,
    task: F,
) -> FanOutReport
where
    F: Fn(Section) -> Fut,
    Fut: Future<Output = Result<CompletedSection>>,
{
    let total = sections.len();
    info!(stage = label, sections = total, concurrency, "Fan-out started");

    let results: Vec<(String, Result<CompletedSection>)> = stream::iter(sections)
        .map(|section| {
            let name = section.name.clone();
            let fut = task(section);
            async move { (name, fut.await) }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = FanOutReport::default();
    for (name, result) in results {
        match result {
            Ok(done) if done.name() == name => report.completed.push(done),
            Ok(done) => report.failures.push((
                name.clone(),
                ScribeError::ConsistencyFault(format!(
                    "task for section '{}' returned section '{}'",
                    name,
                    done.name()
                )),
            )),
            Err(e) => {
                warn!(stage = label, section = %name, error = %e, "Section task failed");
                report.failures.push((name, e));
            }
        }
    }

    info!(
        stage = label,
        completed = report.completed.len(),
        failed = report.failures.len(),
        "Fan-in complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompletionKind;
    use std::time::Duration;

    fn done(section: Section) -> CompletedSection {
        CompletedSection {
            section,
            completion: CompletionKind::Unresearched,
            search_rounds: 0,
        }
    }

    #[tokio::test]
    async fn test_results_arrive_in_completion_order() {
        let sections: Vec<Section> = (0..3)
            .map(|i| Section::new(i, format!("s{}", i), "", true))
            .collect();

        let report = fan_out("test", sections, 3, |section| async move {
            let wait = 30 - 10 * section.ordinal as u64;
            tokio::time::sleep(Duration::from_millis(wait)).await;
            Ok(done(section))
        })
        .await;

        let names: Vec<_> = report.completed.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["s2", "s1", "s0"]);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_failure_waits_for_barrier() {
        let sections: Vec<Section> = (0..3)
            .map(|i| Section::new(i, format!("s{}", i), "", true))
            .collect();

        let report = fan_out("test", sections, 2, |section| async move {
            if section.ordinal == 0 {
                Err(ScribeError::protocol("boom"))
            } else {
                Ok(done(section))
            }
        })
        .await;

        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "s0");
    }

    #[tokio::test]
    async fn test_mismatched_name_is_consistency_fault() {
        let sections = vec![Section::new(0, "real", "", true)];
        let report = fan_out("test", sections, 1, |_| async move {
            Ok(done(Section::new(0, "other", "", true)))
        })
        .await;

        assert!(matches!(
            report.into_first_error(),
            Some(ScribeError::ConsistencyFault(_))
        ));
    }
}
