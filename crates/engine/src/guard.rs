//! Panic boundary around individual heuristic stages.

use handoff_core::Stage;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::warn;

/// Stages that failed and were replaced by an empty result.
#[derive(Debug, Default, Clone)]
pub(crate) struct Degraded {
    stages: Vec<Stage>,
}

impl Degraded {
    /// Run `f`; a panic is logged, recorded against `stage` and turned into
    /// `None`. Nothing escapes the boundary.
    pub(crate) fn run<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> Option<T> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(panic) => {
                warn!(
                    stage = %stage,
                    panic = %panic_message(&panic),
                    "Stage failed, continuing with an empty result"
                );
                self.stages.push(stage);
                None
            }
        }
    }

    /// Like [`Degraded::run`], falling back to `T::default()`.
    pub(crate) fn run_or_default<T: Default>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        self.run(stage, f).unwrap_or_default()
    }

    pub(crate) fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub(crate) fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_becomes_degraded_stage() {
        let mut degraded = Degraded::default();
        let out: Vec<u32> = degraded.run_or_default(Stage::Insights, || panic!("bad pattern"));
        assert!(out.is_empty());
        assert!(degraded.contains(Stage::Insights));
        assert_eq!(degraded.stages(), &[Stage::Insights]);
    }

    #[test]
    fn success_passes_through() {
        let mut degraded = Degraded::default();
        assert_eq!(degraded.run(Stage::Topics, || 42), Some(42));
        assert!(degraded.stages().is_empty());
    }

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&owned), "owned");
        assert_eq!(panic_message(&borrowed), "borrowed");
        assert_eq!(panic_message(&other), "unknown panic");
    }
}
