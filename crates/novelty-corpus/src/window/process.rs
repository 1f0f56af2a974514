//! Novelty engine backed by an external command.
//!
//! The command is invoked as
//!
//! ```text
//! <program> [args..] cooc      <layout> --start Y0 --end Y1 [--weighted] [--self-loop]
//! <program> [args..] indicator <layout> --indicator uzzi --focal-year Y
//! ```
//!
//! where `<layout>` is `--collection C --root DIR --id-var F --year-var F --var F --sub-var F`.
//! Exit status 3 reports a missing partition, 4 a missing reference field.

use std::ffi::OsString;
use std::path::PathBuf;

use serde_json::Value;
use tokio::process::Command;

use super::engine::{CooccurrenceRequest, CorpusLayout, IndicatorRequest, NoveltyEngine};
use crate::error::{EngineError, EngineResult};

/// Exit status for "no partition for this year".
pub const EXIT_PARTITION_MISSING: i32 = 3;

/// Exit status for "a paper lacks the reference field".
pub const EXIT_MISSING_REFERENCES: i32 = 4;

/// Runs the engine as a child process.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessEngine {
    /// Engine invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Arguments placed before the subcommand (e.g. a script path for an interpreter).
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    async fn run(&self, subcommand: &str, args: Vec<String>, year: i32) -> EngineResult<String> {
        tracing::debug!(program = %self.program.display(), subcommand, ?args, "Invoking novelty engine");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(subcommand)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        match output.status.code() {
            Some(0) => Ok(stdout),
            Some(EXIT_PARTITION_MISSING) => Err(EngineError::PartitionMissing { year }),
            Some(EXIT_MISSING_REFERENCES) => Err(EngineError::MissingReferenceField { year }),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let detail = if stderr.is_empty() { stdout } else { stderr };
                Err(EngineError::failed(format!("{subcommand} exited with {}: {detail}", output.status)))
            }
        }
    }
}

fn layout_args(layout: &CorpusLayout) -> Vec<String> {
    vec![
        "--collection".to_string(),
        layout.collection.clone(),
        "--root".to_string(),
        layout.root.display().to_string(),
        "--id-var".to_string(),
        layout.id_field.clone(),
        "--year-var".to_string(),
        layout.year_field.clone(),
        "--var".to_string(),
        layout.variable.clone(),
        "--sub-var".to_string(),
        layout.sub_variable.clone(),
    ]
}

#[async_trait::async_trait]
impl NoveltyEngine for ProcessEngine {
    async fn build_cooccurrence(&self, request: &CooccurrenceRequest<'_>) -> EngineResult<()> {
        let mut args = layout_args(request.layout);
        args.extend([
            "--start".to_string(),
            request.window.start.to_string(),
            "--end".to_string(),
            request.window.end.to_string(),
        ]);
        if request.weighted {
            args.push("--weighted".to_string());
        }
        if request.self_loop {
            args.push("--self-loop".to_string());
        }

        let stdout = self.run("cooc", args, request.window.start).await?;
        if !stdout.is_empty() {
            tracing::debug!(output = %stdout, "Co-occurrence engine output");
        }
        Ok(())
    }

    async fn compute_indicator(&self, request: &IndicatorRequest<'_>) -> EngineResult<Value> {
        let mut args = layout_args(request.layout);
        args.extend([
            "--indicator".to_string(),
            request.indicator.as_str().to_string(),
            "--focal-year".to_string(),
            request.focal_year.to_string(),
        ]);

        let stdout = self.run("indicator", args, request.focal_year).await?;
        Ok(serde_json::from_str(&stdout).unwrap_or(Value::String(stdout)))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::{CooccurrenceUnit, IndicatorKind};

    /// Engine running an inline shell script; `$1` is the subcommand.
    fn shell(script: &str) -> ProcessEngine {
        ProcessEngine::new("sh").with_args(["-c", script, "engine"])
    }

    fn layout() -> CorpusLayout {
        CorpusLayout::references("/tmp/corpus")
    }

    #[tokio::test]
    async fn test_indicator_json_output() {
        let engine = shell(r#"[ "$1" = indicator ] && echo '{"scored": 12}'"#);
        let layout = layout();
        let value = engine
            .compute_indicator(&IndicatorRequest {
                layout: &layout,
                indicator: IndicatorKind::Uzzi,
                focal_year: 2015,
            })
            .await
            .unwrap();
        assert_eq!(value["scored"], 12);
    }

    #[tokio::test]
    async fn test_indicator_plain_output() {
        let engine = shell("echo done");
        let layout = layout();
        let value = engine
            .compute_indicator(&IndicatorRequest {
                layout: &layout,
                indicator: IndicatorKind::Foster,
                focal_year: 2015,
            })
            .await
            .unwrap();
        assert_eq!(value, Value::String("done".into()));
    }

    #[tokio::test]
    async fn test_exit_codes_map_to_errors() {
        let layout = layout();
        let request =
            IndicatorRequest { layout: &layout, indicator: IndicatorKind::Uzzi, focal_year: 2013 };

        let err = shell("exit 3").compute_indicator(&request).await.unwrap_err();
        assert!(matches!(err, EngineError::PartitionMissing { year: 2013 }));

        let err = shell("exit 4").compute_indicator(&request).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingReferenceField { year: 2013 }));

        let err = shell("echo broken >&2; exit 1").compute_indicator(&request).await.unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn test_cooc_receives_window_and_flags() {
        // Fails unless the expected arguments are present.
        let engine = shell(
            r#"[ "$1" = cooc ] && echo "$@" | grep -q -- "--start 2010 --end 2020 --weighted --self-loop""#,
        );
        let layout = layout();
        engine
            .build_cooccurrence(&CooccurrenceRequest {
                layout: &layout,
                window: 2010..2020,
                weighted: true,
                self_loop: true,
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_topic_layout_args() {
        let layout = CorpusLayout::new("/tmp/corpus", CooccurrenceUnit::Topics);
        let args = layout_args(&layout).join(" ");
        assert!(args.contains("--var topics --sub-var display_name"));
        assert!(args.contains("--root /tmp/corpus"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let engine = ProcessEngine::new("/nonexistent/novelty-engine");
        let layout = layout();
        let err = engine
            .compute_indicator(&IndicatorRequest {
                layout: &layout,
                indicator: IndicatorKind::Uzzi,
                focal_year: 2000,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn(_)));
    }
}
