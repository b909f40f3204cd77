/// Scenarios exercising one blocking primitive in a single process
use crate::exec::runner::CommandInvocation;
use crate::harness::layers::{at_most, body, compile, Stage};
use crate::harness::Runtime;
use crate::suite::{Scenario, ScenarioGroup};

const SLEEP_SOURCE: &str = r#"
#include <unistd.h>
int main() {
    sleep(10);
    return(0);
}
"#;

const NANOSLEEP_SOURCE: &str = r#"
#include <time.h>
int main() {
    struct timespec ts = {1, 0};
    nanosleep(&ts, NULL);
    return(0);
}
"#;

/// Ceiling for every single-process acceleration scenario
const CEILING_SECS: f64 = 0.5;

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "bash_sleep",
            group: ScenarioGroup::SingleProcess,
            requires: &[],
            description: "shell `sleep 10`",
            chain: bash_sleep,
        },
        Scenario {
            name: "bash_bash_sleep",
            group: ScenarioGroup::SingleProcess,
            requires: &[],
            description: "`sleep 120` inside a nested bash",
            chain: bash_bash_sleep,
        },
        Scenario {
            name: "python_select",
            group: ScenarioGroup::SingleProcess,
            requires: &[Runtime::Python],
            description: "select() with a 10s timeout",
            chain: python_select,
        },
        Scenario {
            name: "python_poll",
            group: ScenarioGroup::SingleProcess,
            requires: &[Runtime::Python],
            description: "poll() with a 10s timeout",
            chain: python_poll,
        },
        Scenario {
            name: "python_epoll",
            group: ScenarioGroup::SingleProcess,
            requires: &[Runtime::Python],
            description: "epoll_wait() with a 10s timeout",
            chain: python_epoll,
        },
        Scenario {
            name: "node_epoll",
            group: ScenarioGroup::SingleProcess,
            requires: &[Runtime::Node],
            description: "node event loop with a 10s timer",
            chain: node_epoll,
        },
        Scenario {
            name: "bad_command",
            group: ScenarioGroup::SingleProcess,
            requires: &[],
            description: "missing command exits 127",
            chain: bad_command,
        },
        Scenario {
            name: "return_status",
            group: ScenarioGroup::SingleProcess,
            requires: &[Runtime::Python],
            description: "exit codes 188 and -1 propagate",
            chain: return_status,
        },
        Scenario {
            name: "native_sleep",
            group: ScenarioGroup::SingleProcess,
            requires: &[],
            description: "compiled sleep(10)",
            chain: native_sleep,
        },
        Scenario {
            name: "native_nanosleep",
            group: ScenarioGroup::SingleProcess,
            requires: &[],
            description: "compiled nanosleep(1s)",
            chain: native_nanosleep,
        },
    ]
}

fn bash_sleep() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        body(|h, _| {
            h.system("sleep 10")?;
            Ok(())
        }),
    )
}

fn bash_bash_sleep() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        body(|h, _| {
            h.system("bash -c 'sleep 120;'")?;
            Ok(())
        }),
    )
}

fn python_select() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        body(|h, _| {
            h.system(format!(
                "{} -c \"import select; select.select([],[],[], 10)\"",
                h.interpreter(Runtime::Python)
            ))?;
            Ok(())
        }),
    )
}

fn python_poll() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        body(|h, _| {
            h.system(format!(
                "{} -c \"import select; select.poll().poll(10000)\"",
                h.interpreter(Runtime::Python)
            ))?;
            Ok(())
        }),
    )
}

fn python_epoll() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        body(|h, _| {
            h.system(format!(
                "{} -c \"import select; select.epoll().poll(10000)\"",
                h.interpreter(Runtime::Python)
            ))?;
            Ok(())
        }),
    )
}

fn node_epoll() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        body(|h, _| {
            h.system(format!(
                "{} -e \"setTimeout(function(){{}},10000);\"",
                h.interpreter(Runtime::Node)
            ))?;
            Ok(())
        }),
    )
}

fn bad_command() -> Stage<'static> {
    body(|h, _| {
        h.run(
            &CommandInvocation::new("command_that_doesnt exist")
                .expect_code(127)
                .ignore_stderr(),
        )?;
        Ok(())
    })
}

fn return_status() -> Stage<'static> {
    body(|h, _| {
        let python = h.interpreter(Runtime::Python);
        h.system_expect(format!("{} -c \"import sys; sys.exit(188)\"", python), 188)?;
        h.system_expect(format!("{} -c \"import sys; sys.exit(-1)\"", python), 255)?;
        Ok(())
    })
}

fn native_sleep() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        compile(
            SLEEP_SOURCE,
            body(|h, ctx| {
                h.system(ctx.compiled()?.display().to_string())?;
                Ok(())
            }),
        ),
    )
}

fn native_nanosleep() -> Stage<'static> {
    at_most(
        CEILING_SECS,
        compile(
            NANOSLEEP_SOURCE,
            body(|h, ctx| {
                h.system(ctx.compiled()?.display().to_string())?;
                Ok(())
            }),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::HarnessConfig;
    use crate::harness::layers::execute;
    use crate::harness::Harness;

    #[test]
    fn test_names_are_unique() {
        let all = scenarios();
        let mut names: Vec<_> = all.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn test_bad_command_passes_unwrapped() {
        let harness = Harness::new(HarnessConfig::default());
        let (result, _) = execute(&harness, bad_command());
        assert!(result.is_ok());
    }

    #[test]
    fn test_sleep_is_slow_unwrapped() {
        // Without a wrapper nothing is accelerated, so a 10s sleep must blow a
        // 0.5s ceiling; use a short sleep to keep the test fast.
        let harness = Harness::new(HarnessConfig::default());
        let chain = at_most(
            0.05,
            body(|h, _| {
                h.system("sleep 0.2")?;
                Ok(())
            }),
        );
        let (result, _) = execute(&harness, chain);
        assert!(matches!(
            result,
            Err(crate::config::types::HarnessError::TimeCeilingExceeded { .. })
        ));
    }
}
