//! Test Case Suite
//!
//! Declarative scenarios composed from timing, artifact and compile stages around
//! the process runner, plus the sequential suite runner and its report.

pub mod multi_process;
pub mod single_process;

use crate::config::types::{HarnessError, Result};
use crate::harness::layers::{self, Stage};
use crate::harness::{Harness, Runtime};
use crate::utils::fd::FdSnapshot;
use crate::verdict::outcome::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Process topology a scenario exercises
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioGroup {
    SingleProcess,
    MultiProcess,
}

impl std::fmt::Display for ScenarioGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioGroup::SingleProcess => write!(f, "single_process"),
            ScenarioGroup::MultiProcess => write!(f, "multi_process"),
        }
    }
}

/// One registered scenario
#[derive(Clone, Copy, Debug)]
pub struct Scenario {
    pub name: &'static str,
    pub group: ScenarioGroup,
    /// Optional runtimes; when missing the scenario is skipped, not failed
    pub requires: &'static [Runtime],
    pub description: &'static str,
    /// Builds the stage chain afresh for each run
    pub chain: fn() -> Stage<'static>,
}

/// Every scenario, in execution order
pub fn all() -> Vec<Scenario> {
    let mut scenarios = single_process::scenarios();
    scenarios.extend(multi_process::scenarios());
    scenarios
}

pub fn find(name: &str) -> Result<Scenario> {
    all()
        .into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| HarnessError::Config(format!("unknown scenario: {}", name)))
}

/// Scenarios whose name contains `filter`; all of them without a filter
pub fn select(filter: Option<&str>) -> Vec<Scenario> {
    all()
        .into_iter()
        .filter(|s| filter.map_or(true, |f| s.name.contains(f)))
        .collect()
}

/// Result of one scenario run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub group: ScenarioGroup,
    pub outcome: Outcome,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub retained_artifacts: Vec<PathBuf>,
}

/// Aggregate result of a suite run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub wrapper: Option<PathBuf>,
    pub results: Vec<ScenarioResult>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    /// True when no scenario failed
    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| HarnessError::Config(format!("failed to serialise report: {}", e)))
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        match &self.wrapper {
            Some(wrapper) => out.push_str(&format!("wrapper: {}\n", wrapper.display())),
            None => out.push_str("wrapper: none (commands ran unwrapped)\n"),
        }
        for result in &self.results {
            out.push_str(&format!(
                "{:<4} {:<22} {:>7.3}s",
                result.outcome.label(),
                result.name,
                result.elapsed_secs
            ));
            match &result.outcome {
                Outcome::Passed => {}
                Outcome::Failed { kind, message } => {
                    out.push_str(&format!("  [{}] {}", kind, message))
                }
                Outcome::Skipped { reason } => out.push_str(&format!("  {}", reason)),
            }
            out.push('\n');
            for path in &result.retained_artifacts {
                out.push_str(&format!("     kept {}\n", path.display()));
            }
        }
        out.push_str(&format!(
            "{} passed, {} failed, {} skipped\n",
            self.passed(),
            self.failed(),
            self.skipped()
        ));
        out
    }
}

/// Run one scenario: skip on a missing runtime, otherwise execute its chain
pub fn run_scenario(harness: &Harness, scenario: &Scenario) -> ScenarioResult {
    log::info!("Running scenario {}", scenario.name);
    let started = Instant::now();
    let fds_before = FdSnapshot::take().ok();

    let (result, retained) = match scenario
        .requires
        .iter()
        .try_for_each(|runtime| harness.require(*runtime))
    {
        Ok(()) => layers::execute(harness, (scenario.chain)()),
        Err(e) => (Err(e), Vec::new()),
    };

    let elapsed = started.elapsed();
    if let (Some(before), Ok(after)) = (fds_before, FdSnapshot::take()) {
        let leaked = after.leaked_since(&before);
        if !leaked.is_empty() {
            log::warn!(
                "Scenario {} left harness descriptors open: {:?}",
                scenario.name,
                leaked
            );
        }
    }

    let outcome = Outcome::classify(&result);
    match &outcome {
        Outcome::Failed { message, .. } => log::warn!("{} failed: {}", scenario.name, message),
        other => log::info!("{} {}", scenario.name, other),
    }

    ScenarioResult {
        name: scenario.name.to_string(),
        group: scenario.group,
        outcome,
        elapsed_secs: elapsed.as_secs_f64(),
        retained_artifacts: retained,
    }
}

/// Run scenarios one after another; nothing runs concurrently
pub fn run(harness: &Harness, scenarios: &[Scenario]) -> SuiteReport {
    let started_at = Utc::now();
    let results = scenarios
        .iter()
        .map(|scenario| run_scenario(harness, scenario))
        .collect();

    SuiteReport {
        started_at,
        wrapper: harness.config().wrapper_path.clone(),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{FailureKind, HarnessConfig};
    use crate::harness::layers::body;

    fn failing_chain() -> Stage<'static> {
        body(|h, _| {
            h.system("exit 9")?;
            Ok(())
        })
    }

    fn passing_chain() -> Stage<'static> {
        body(|h, _| {
            h.system("true")?;
            Ok(())
        })
    }

    fn scenario(name: &'static str, requires: &'static [Runtime], chain: fn() -> Stage<'static>) -> Scenario {
        Scenario {
            name,
            group: ScenarioGroup::SingleProcess,
            requires,
            description: "",
            chain,
        }
    }

    #[test]
    fn test_registry() {
        let names: Vec<_> = all().iter().map(|s| s.name).collect();
        assert!(names.contains(&"bash_sleep"));
        assert!(names.contains(&"fd_accounting"));
        assert_eq!(find("native_nanosleep").unwrap().group, ScenarioGroup::SingleProcess);
        assert!(matches!(find("nope"), Err(HarnessError::Config(_))));
        assert_eq!(select(None).len(), all().len());
        assert!(select(Some("python_")).iter().all(|s| s.name.starts_with("python_")));
    }

    #[test]
    fn test_run_reports_each_outcome() {
        let mut config = HarnessConfig::default();
        config.node = "no-such-node-binary".to_string();
        let harness = Harness::new(config);

        let scenarios = [
            scenario("passes", &[], passing_chain),
            scenario("fails", &[], failing_chain),
            scenario("needs_node", &[Runtime::Node], passing_chain),
        ];
        let report = run(&harness, &scenarios);

        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(!report.success());
        assert_eq!(report.wrapper, None);
        match &report.results[1].outcome {
            Outcome::Failed { kind, message } => {
                assert_eq!(*kind, FailureKind::Assertion);
                assert!(message.contains("exited with 9, expected 0"));
            }
            other => panic!("unexpected outcome: {other}"),
        }

        let text = report.render_text();
        assert!(text.contains("unwrapped"));
        assert!(text.contains("1 passed, 1 failed, 1 skipped"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["results"][2]["outcome"]["status"], "skipped");
    }
}
