use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CallKind {
    Http,
    Llm,
}

impl CallKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Llm => "llm",
        }
    }
}

/// Counts remote calls per kind and module for one run. Shared by reference
/// with every component that makes calls; reported once by the runner.
#[derive(Debug, Default)]
pub struct CallCounter {
    counts: Mutex<BTreeMap<(CallKind, String), u64>>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, kind: CallKind, module: &str) {
        let mut counts = self.counts.lock().unwrap_or_else(|err| err.into_inner());
        *counts.entry((kind, module.to_owned())).or_insert(0) += 1;
    }

    pub fn total(&self, kind: CallKind) -> u64 {
        let counts = self.counts.lock().unwrap_or_else(|err| err.into_inner());
        counts
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn count(&self, kind: CallKind, module: &str) -> u64 {
        let counts = self.counts.lock().unwrap_or_else(|err| err.into_inner());
        counts
            .get(&(kind, module.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    pub fn report(&self) {
        tracing::info!(
            http_total = self.total(CallKind::Http),
            llm_total = self.total(CallKind::Llm),
            "call report"
        );
        let counts = self.counts.lock().unwrap_or_else(|err| err.into_inner());
        for ((kind, module), count) in counts.iter() {
            tracing::info!(kind = kind.as_str(), module = %module, count, "calls by module");
        }
    }
}
