/// Scenarios spanning several processes: concurrent children, deep spawn chains
/// with message passing, and descriptor accounting across nested launches.
use crate::config::types::{HarnessError, Result};
use crate::harness::layers::{at_most, body, save, Stage};
use crate::harness::{Harness, Runtime};
use crate::suite::{Scenario, ScenarioGroup};
use std::ops::RangeInclusive;
use std::path::Path;

/// Declared start offsets of the concurrent children, in seconds
const CHILD_OFFSETS: [u32; 3] = [0, 60, 120];

/// Accepted gap between consecutive child completions, in declared seconds
const COMPLETION_WINDOW: RangeInclusive<f64> = 55.0..=65.0;

/// Ceiling for every multi-process scenario
const CEILING_SECS: f64 = 10.0;

/// Declared sleeps of the process tree: per inner level, then at the leaf
const TREE_PAUSE_SECS: f64 = 10.0;
const TREE_LEAF_SECS: f64 = 60.0;

/// Declared sleeps of the descriptor chain: per inner level, then at the leaf
const FD_PAUSE_SECS: f64 = 5.0;
const FD_LEAF_SECS: f64 = 30.0;

/// Levels the descriptor chain reports, depth 0 included
const FD_CHAIN_LEVELS: u32 = 5;

const TREE_SCRIPT: &str = r#"
import subprocess
import sys
import time

MAX_DEPTH = 5
depth = int(sys.argv[1])
pause = float(sys.argv[2])
leaf = float(sys.argv[3])


def say(msg):
    sys.stdout.write(msg + "\n")
    sys.stdout.flush()


if depth > 0:
    say("ready %d" % depth)
    if sys.stdin.readline().strip() != "go":
        sys.exit(2)

if depth < MAX_DEPTH:
    child = subprocess.Popen(
        [sys.executable, sys.argv[0], str(depth + 1), sys.argv[2], sys.argv[3]],
        stdin=subprocess.PIPE,
        stdout=subprocess.PIPE,
    )
    if child.stdout.readline().decode().strip() != "ready %d" % (depth + 1):
        sys.exit(3)
    child.stdin.write(b"go\n")
    child.stdin.flush()
    time.sleep(pause)
    reply = child.stdout.readline().decode().strip()
    child.wait()
    if child.returncode != 0 or reply != "done %d" % (depth + 1):
        sys.exit(4)
else:
    time.sleep(leaf)

say("done %d" % depth)
"#;

const FD_CHAIN_SCRIPT: &str = r#"
import os
import sys
import time

MAX_DEPTH = 4
depth = int(sys.argv[1])
pause = float(sys.argv[2])
leaf = float(sys.argv[3])


def open_fds():
    return len(os.listdir("/proc/self/fd"))


def say(msg):
    sys.stdout.write(msg + "\n")
    sys.stdout.flush()


if depth == 0:
    say("before %d" % open_fds())
say("level %d %d" % (depth, open_fds()))

if depth < MAX_DEPTH:
    pid = os.fork()
    if pid == 0:
        try:
            os.execv(
                sys.executable,
                [sys.executable, sys.argv[0], str(depth + 1), sys.argv[2], sys.argv[3]],
            )
        finally:
            os._exit(127)
    time.sleep(pause)
    _, status = os.waitpid(pid, 0)
    if status != 0:
        sys.exit(1)
else:
    time.sleep(leaf)

if depth == 0:
    say("after %d" % open_fds())
"#;

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "parallel_children",
            group: ScenarioGroup::MultiProcess,
            requires: &[Runtime::Python],
            description: "children sleeping 0/60/120s complete ~60s apart",
            chain: parallel_children,
        },
        Scenario {
            name: "nested_process_tree",
            group: ScenarioGroup::MultiProcess,
            requires: &[Runtime::Python],
            description: "depth-5 spawn chain synchronised over pipes",
            chain: nested_process_tree,
        },
        Scenario {
            name: "fd_accounting",
            group: ScenarioGroup::MultiProcess,
            requires: &[Runtime::Python],
            description: "descriptor counts stable across nested fork/exec",
            chain: fd_accounting,
        },
    ]
}

/// Shell line launching one Python child per offset, each printing
/// `<offset> <timestamp>` when its sleep ends
pub fn parallel_command(python: &str, offsets: &[u32]) -> String {
    let children: Vec<String> = offsets
        .iter()
        .map(|offset| {
            format!(
                "{} -c \"import time; time.sleep({o}); print({o}, time.time())\" &",
                python,
                o = offset
            )
        })
        .collect();
    format!("bash -c '{} wait'", children.join(" "))
}

/// Shell line starting a chain script at depth 0 with the given declared sleeps
pub fn script_command(python: &str, script: &Path, pause_secs: f64, leaf_secs: f64) -> String {
    format!(
        "{} {} 0 {} {}",
        python,
        script.display(),
        pause_secs,
        leaf_secs
    )
}

/// Parse `<offset> <timestamp>` lines, sorted by offset
pub fn parse_completion_times(stdout: &str) -> Result<Vec<(u32, f64)>> {
    let mut times = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut fields = line.split_whitespace();
        let parsed = match (fields.next(), fields.next(), fields.next()) {
            (Some(offset), Some(stamp), None) => offset.parse::<u32>().ok().zip(stamp.parse::<f64>().ok()),
            _ => None,
        };
        let entry = parsed.ok_or_else(|| {
            HarnessError::Assertion(format!("unparseable completion line `{}`", line))
        })?;
        times.push(entry);
    }
    times.sort_by_key(|(offset, _)| *offset);
    Ok(times)
}

/// Check that every consecutive completion gap falls inside `window`
pub fn check_completion_gaps(
    times: &[(u32, f64)],
    expected: &[u32],
    window: &RangeInclusive<f64>,
) -> Result<()> {
    let offsets: Vec<u32> = times.iter().map(|(offset, _)| *offset).collect();
    if offsets != expected {
        return Err(HarnessError::Assertion(format!(
            "expected completions for offsets {:?}, got {:?}",
            expected, offsets
        )));
    }

    for pair in times.windows(2) {
        let gap = pair[1].1 - pair[0].1;
        if !window.contains(&gap) {
            return Err(HarnessError::Assertion(format!(
                "children {}s and {}s completed {:.1}s apart, expected {:.0}-{:.0}s",
                pair[0].0,
                pair[1].0,
                gap,
                window.start(),
                window.end()
            )));
        }
    }
    Ok(())
}

/// Descriptor counts reported by the fd chain script
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FdReport {
    pub before: Option<usize>,
    pub after: Option<usize>,
    pub levels: Vec<(u32, usize)>,
}

impl FdReport {
    pub fn parse(stdout: &str) -> Result<Self> {
        let mut report = FdReport::default();
        for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let bad = || HarnessError::Assertion(format!("unparseable descriptor line `{}`", line));
            match fields.as_slice() {
                ["before", n] => report.before = Some(n.parse().map_err(|_| bad())?),
                ["after", n] => report.after = Some(n.parse().map_err(|_| bad())?),
                ["level", d, n] => report
                    .levels
                    .push((d.parse().map_err(|_| bad())?, n.parse().map_err(|_| bad())?)),
                _ => return Err(bad()),
            }
        }
        report.levels.sort_unstable();
        Ok(report)
    }

    /// Every level and the final count must match the count taken before the chain
    pub fn check(&self, expected_levels: u32) -> Result<()> {
        let (before, after) = match (self.before, self.after) {
            (Some(before), Some(after)) => (before, after),
            _ => {
                return Err(HarnessError::Assertion(
                    "descriptor chain did not report before/after counts".to_string(),
                ))
            }
        };

        let depths: Vec<u32> = self.levels.iter().map(|(depth, _)| *depth).collect();
        let expected: Vec<u32> = (0..expected_levels).collect();
        if depths != expected {
            return Err(HarnessError::Assertion(format!(
                "expected chain levels {:?}, got {:?}",
                expected, depths
            )));
        }

        if after != before {
            return Err(HarnessError::Assertion(format!(
                "{} descriptors open after the chain, {} before",
                after, before
            )));
        }

        if let Some((depth, count)) = self.levels.iter().find(|(_, count)| *count != before) {
            return Err(HarnessError::Assertion(format!(
                "level {} sees {} descriptors, expected {}",
                depth, count, before
            )));
        }
        Ok(())
    }
}

fn run_tree(h: &Harness, script: &Path, pause_secs: f64, leaf_secs: f64) -> Result<()> {
    let python = h.interpreter(Runtime::Python);
    let stdout = h.output(script_command(python, script, pause_secs, leaf_secs))?;
    if stdout.trim() != "done 0" {
        return Err(HarnessError::Assertion(format!(
            "process tree reported `{}`, expected `done 0`",
            stdout.trim()
        )));
    }
    Ok(())
}

fn run_fd_chain(h: &Harness, script: &Path, pause_secs: f64, leaf_secs: f64) -> Result<()> {
    let python = h.interpreter(Runtime::Python);
    let stdout = h.output(script_command(python, script, pause_secs, leaf_secs))?;
    FdReport::parse(&stdout)?.check(FD_CHAIN_LEVELS)
}

fn parallel_children() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        body(|h, _| {
            let command = parallel_command(h.interpreter(Runtime::Python), &CHILD_OFFSETS);
            let stdout = h.output(command)?;
            let times = parse_completion_times(&stdout)?;
            check_completion_gaps(&times, &CHILD_OFFSETS, &COMPLETION_WINDOW)
        }),
    )
}

fn nested_process_tree() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        save(
            "tree",
            ".py",
            TREE_SCRIPT,
            body(|h, ctx| {
                let script = ctx.artifact("tree")?;
                run_tree(h, script, TREE_PAUSE_SECS, TREE_LEAF_SECS)
            }),
        ),
    )
}

fn fd_accounting() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        save(
            "chain",
            ".py",
            FD_CHAIN_SCRIPT,
            body(|h, ctx| {
                let script = ctx.artifact("chain")?;
                run_fd_chain(h, script, FD_PAUSE_SECS, FD_LEAF_SECS)
            }),
        ),
    )
}
