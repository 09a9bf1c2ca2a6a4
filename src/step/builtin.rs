//! Built-in step catalog.
//!
//! Small, dependency-free steps that make a default registry usable out of
//! the box. Real workloads register their own classes through project or
//! shared namespaces; these exist for smoke tests and scenario scaffolding.

use crate::context::ScenarioContext;
use crate::error::ScenarioError;
use crate::step::registry::StepNamespace;
use crate::step::{Step, StepArgs, TerminationSignal};
use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) fn catalog() -> StepNamespace {
    let mut namespace = StepNamespace::new("builtin");
    namespace.register("SampleStep", |args| {
        Ok(Arc::new(SampleStep::from_args(&args)?) as Arc<dyn Step>)
    });
    namespace.register("SleepStep", |args| {
        Ok(Arc::new(SleepStep::from_args(&args)?) as Arc<dyn Step>)
    });
    namespace.register("FailStep", |args| {
        Ok(Arc::new(FailStep::from_args(&args)?) as Arc<dyn Step>)
    });
    namespace.register("PublishStep", |args| {
        Ok(Arc::new(PublishStep::from_args(&args)?) as Arc<dyn Step>)
    });
    namespace
}

/// Logs its bound arguments and continues.
pub struct SampleStep {
    args: SampleArgs,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SampleArgs {
    memo: Option<String>,
    retry_count: u32,
}

impl SampleStep {
    fn from_args(args: &StepArgs) -> Result<Self, ScenarioError> {
        Ok(Self {
            args: args.deserialize()?,
        })
    }

    pub fn memo(&self) -> Option<&str> {
        self.args.memo.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.args.retry_count
    }
}

#[async_trait]
impl Step for SampleStep {
    fn class_name(&self) -> &'static str {
        "SampleStep"
    }

    async fn execute(
        &self,
        _ctx: &ScenarioContext,
    ) -> anyhow::Result<Option<TerminationSignal>> {
        info!(
            memo = self.args.memo.as_deref().unwrap_or(""),
            retry_count = self.args.retry_count,
            "sample step executed"
        );
        Ok(None)
    }
}

/// Sleeps for a configured number of seconds.
#[derive(Debug)]
pub struct SleepStep {
    duration: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SleepArgs {
    seconds: f64,
}

impl Default for SleepArgs {
    fn default() -> Self {
        Self { seconds: 1.0 }
    }
}

impl SleepStep {
    fn from_args(args: &StepArgs) -> Result<Self, ScenarioError> {
        let parsed: SleepArgs = args.deserialize()?;
        if !parsed.seconds.is_finite() || parsed.seconds < 0.0 {
            return Err(ScenarioError::InvalidParameter(format!(
                "'seconds' must be a non-negative number, got {}",
                parsed.seconds
            )));
        }
        Ok(Self {
            duration: Duration::from_secs_f64(parsed.seconds),
        })
    }
}

#[async_trait]
impl Step for SleepStep {
    fn class_name(&self) -> &'static str {
        "SleepStep"
    }

    async fn execute(
        &self,
        _ctx: &ScenarioContext,
    ) -> anyhow::Result<Option<TerminationSignal>> {
        tokio::time::sleep(self.duration).await;
        Ok(None)
    }
}

/// Always fails. Useful for exercising failure policies in scenarios.
pub struct FailStep {
    args: FailArgs,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FailArgs {
    message: String,
}

impl Default for FailArgs {
    fn default() -> Self {
        Self {
            message: "forced failure".to_string(),
        }
    }
}

impl FailStep {
    fn from_args(args: &StepArgs) -> Result<Self, ScenarioError> {
        Ok(Self {
            args: args.deserialize()?,
        })
    }
}

#[async_trait]
impl Step for FailStep {
    fn class_name(&self) -> &'static str {
        "FailStep"
    }

    async fn execute(
        &self,
        _ctx: &ScenarioContext,
    ) -> anyhow::Result<Option<TerminationSignal>> {
        anyhow::bail!("{}", self.args.message)
    }
}

/// Publishes a fixed value into the scenario context under `key`.
pub struct PublishStep {
    args: PublishArgs,
}

#[derive(Debug, Deserialize)]
struct PublishArgs {
    key: String,
    value: Value,
}

impl PublishStep {
    fn from_args(args: &StepArgs) -> Result<Self, ScenarioError> {
        Ok(Self {
            args: args.deserialize()?,
        })
    }
}

#[async_trait]
impl Step for PublishStep {
    fn class_name(&self) -> &'static str {
        "PublishStep"
    }

    async fn execute(
        &self,
        ctx: &ScenarioContext,
    ) -> anyhow::Result<Option<TerminationSignal>> {
        ctx.publish(self.args.key.clone(), self.args.value.clone());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Mapping;

    fn step_args(yaml: &str) -> StepArgs {
        let mapping: Mapping = serde_yaml::from_str(yaml).expect("test arguments parse");
        StepArgs::new(mapping, ScenarioContext::new())
    }

    #[tokio::test]
    async fn sample_step_binds_arguments() {
        let step = SampleStep::from_args(&step_args("{memo: hello, retry_count: 10}"))
            .expect("constructs");
        assert_eq!(step.memo(), Some("hello"));
        assert_eq!(step.retry_count(), 10);
        assert_eq!(step.execute(&ScenarioContext::new()).await.expect("runs"), None);
    }

    #[test]
    fn sample_step_defaults_without_arguments() {
        let step = SampleStep::from_args(&step_args("{}")).expect("constructs");
        assert_eq!(step.memo(), None);
        assert_eq!(step.retry_count(), 0);
    }

    #[test]
    fn sleep_step_rejects_negative_seconds() {
        let err = SleepStep::from_args(&step_args("{seconds: -1}")).expect_err("must fail");
        assert!(matches!(err, ScenarioError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn fail_step_surfaces_its_message() {
        let step = FailStep::from_args(&step_args("{message: boom}")).expect("constructs");
        let err = step
            .execute(&ScenarioContext::new())
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn publish_step_writes_into_the_context() {
        let step = PublishStep::from_args(&step_args("{key: artifact, value: out.csv}"))
            .expect("constructs");
        let ctx = ScenarioContext::new();
        step.execute(&ctx).await.expect("runs");
        assert_eq!(ctx.get("artifact"), Some(Value::String("out.csv".into())));
    }
}
