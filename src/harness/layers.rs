/// Explicit stage chain for scenario bodies
///
/// Each concern is a function taking the next stage and returning a new stage.
/// Outer stages run first, so `at_most(0.5, compile(SRC, body(f)))` times the
/// compile step together with the body, exactly in the order written.
use crate::config::types::Result;
use crate::exec::compiler::{self, CompileSpec};
use crate::harness::{Harness, TestContext, COMPILED};
use crate::safety::artifact::ScopedArtifact;
use crate::verdict::timing;
use std::path::PathBuf;

/// One link of the chain
pub type Stage<'a> = Box<dyn FnOnce(&Harness, &mut TestContext) -> Result<()> + 'a>;

/// Innermost stage: the scenario body itself
pub fn body<'a, F>(f: F) -> Stage<'a>
where
    F: FnOnce(&Harness, &mut TestContext) -> Result<()> + 'a,
{
    Box::new(f)
}

/// Fail when `next` takes longer than `seconds` of wall-clock time
pub fn at_most<'a>(seconds: f64, next: Stage<'a>) -> Stage<'a> {
    Box::new(
        move |harness: &Harness, ctx: &mut TestContext| -> Result<()> {
            let ceiling = timing::ceiling_secs(seconds)?;
            timing::at_most(ceiling, || next(harness, ctx))
        },
    )
}

/// Build `code` and publish the binary to `next` as [`COMPILED`]
pub fn compile<'a>(code: &'a str, next: Stage<'a>) -> Stage<'a> {
    Box::new(
        move |harness: &Harness, ctx: &mut TestContext| -> Result<()> {
            let spec = CompileSpec::new(harness.config(), code);
            let compiled = compiler::compile(harness.config(), &spec)?;

            ctx.insert(COMPILED, compiled.path().to_path_buf());
            let result = next(harness, ctx);
            ctx.remove(COMPILED);

            ctx.retain(compiled.release());
            result
        },
    )
}

/// Write `content` to a `suffix` file and publish it to `next` under `name`
pub fn save<'a>(name: &'a str, suffix: &'a str, content: &'a str, next: Stage<'a>) -> Stage<'a> {
    Box::new(
        move |harness: &Harness, ctx: &mut TestContext| -> Result<()> {
            let mut artifact = ScopedArtifact::for_config(harness.config(), suffix, Some(content))?;

            ctx.insert(name, artifact.path().to_path_buf());
            let result = next(harness, ctx);
            ctx.remove(name);

            ctx.retain(artifact.release());
            result
        },
    )
}

/// Run a chain with a fresh context; returns the result and any retained artifacts
pub fn execute(harness: &Harness, stage: Stage<'_>) -> (Result<()>, Vec<PathBuf>) {
    let mut ctx = TestContext::new();
    let result = stage(harness, &mut ctx);
    (result, ctx.retained().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{HarnessConfig, HarnessError};
    use std::cell::RefCell;
    use std::time::Duration;

    fn harness() -> Harness {
        Harness::new(HarnessConfig::default())
    }

    #[test]
    fn test_save_provides_path_then_removes_it() {
        let seen = RefCell::new(None);
        let chain = save(
            "script",
            ".sh",
            "exit 5",
            body(|h, ctx| {
                let path = ctx.artifact("script")?.to_path_buf();
                assert!(path.exists());
                assert!(path.to_string_lossy().ends_with(".sh"));
                h.system_expect(format!("sh {}", path.display()), 5)?;
                *seen.borrow_mut() = Some(path);
                Ok(())
            }),
        );

        let (result, retained) = execute(&harness(), chain);
        assert!(result.is_ok());
        assert!(retained.is_empty());
        let path = seen.borrow().clone().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_save_removes_on_failure() {
        let seen = RefCell::new(None);
        let chain = save(
            "data",
            ".txt",
            "payload",
            body(|_, ctx| {
                *seen.borrow_mut() = Some(ctx.artifact("data")?.to_path_buf());
                Err(HarnessError::Assertion("boom".to_string()))
            }),
        );

        let (result, _) = execute(&harness(), chain);
        assert!(matches!(result, Err(HarnessError::Assertion(_))));
        assert!(!seen.borrow().clone().unwrap().exists());
    }

    #[test]
    fn test_debug_mode_retains_and_reports() {
        let harness = Harness::new(HarnessConfig::default().with_debug(true));
        let chain = save("data", ".txt", "payload", body(|_, _| Ok(())));

        let (result, retained) = execute(&harness, chain);
        assert!(result.is_ok());
        assert_eq!(retained.len(), 1);
        assert!(retained[0].exists());
        std::fs::remove_file(&retained[0]).unwrap();
    }

    #[test]
    fn test_at_most_wraps_inner_stages() {
        let chain = at_most(
            0.01,
            save(
                "data",
                "",
                "",
                body(|_, _| {
                    std::thread::sleep(Duration::from_millis(50));
                    Ok(())
                }),
            ),
        );
        let (result, _) = execute(&harness(), chain);
        assert!(matches!(
            result,
            Err(HarnessError::TimeCeilingExceeded { .. })
        ));
    }

    type Trace = RefCell<Vec<String>>;
    type Seen = RefCell<Vec<(String, PathBuf)>>;

    /// Placed inside `save(name, ..)`: records entry once the artifact exists
    fn entered<'a>(name: &'a str, trace: &'a Trace, seen: &'a Seen, next: Stage<'a>) -> Stage<'a> {
        body(move |h, ctx| {
            let path = ctx.artifact(name)?.to_path_buf();
            assert!(path.exists());
            seen.borrow_mut().push((name.to_string(), path));
            trace.borrow_mut().push(format!("enter {}", name));
            next(h, ctx)
        })
    }

    /// Placed outside `save(name, ..)`: records release once the artifact is gone
    fn released<'a>(name: &'a str, trace: &'a Trace, seen: &'a Seen, next: Stage<'a>) -> Stage<'a> {
        body(move |h, ctx| {
            let result = next(h, ctx);
            let gone = seen
                .borrow()
                .iter()
                .any(|(seen_name, path)| seen_name == name && !path.exists());
            let event = if gone { "release" } else { "leak" };
            trace.borrow_mut().push(format!("{} {}", event, name));
            result
        })
    }

    #[test]
    fn test_stage_order_is_explicit() {
        let trace = Trace::default();
        let seen = Seen::default();
        let chain = at_most(
            5.0,
            released(
                "outer",
                &trace,
                &seen,
                save(
                    "outer",
                    "",
                    "",
                    entered(
                        "outer",
                        &trace,
                        &seen,
                        released(
                            "inner",
                            &trace,
                            &seen,
                            save(
                                "inner",
                                "",
                                "",
                                entered(
                                    "inner",
                                    &trace,
                                    &seen,
                                    body(|_, ctx| {
                                        assert!(ctx.artifact("outer")?.exists());
                                        assert!(ctx.artifact("inner")?.exists());
                                        trace.borrow_mut().push("body".to_string());
                                        Ok(())
                                    }),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        );
        let (result, retained) = execute(&harness(), chain);
        assert!(result.is_ok());
        assert!(retained.is_empty());
        assert_eq!(
            *trace.borrow(),
            vec![
                "enter outer",
                "enter inner",
                "body",
                "release inner",
                "release outer"
            ]
        );
    }

    #[test]
    fn test_compile_failure_never_reaches_body() {
        let mut config = HarnessConfig::default();
        config.cc = "definitely-not-a-compiler".to_string();
        let reached = RefCell::new(false);
        let chain = compile(
            "int main() { return 0; }",
            body(|_, _| {
                *reached.borrow_mut() = true;
                Ok(())
            }),
        );
        let (result, _) = execute(&Harness::new(config), chain);
        assert!(matches!(result, Err(HarnessError::CompileFailed { .. })));
        assert!(!*reached.borrow());
    }
}
