//! Hook probes: shareable counters wrapped as coordinator callbacks.

#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use agentrun_core::orchestration::{
    CompletionHook, CompletionNotice, CompletionReason, HookContext, StepHook,
};

/// Records every completion hook invocation.
#[derive(Clone, Default)]
pub struct CompletionProbe {
    count: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<CompletionNotice>>>,
}

impl CompletionProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self) -> CompletionHook {
        let count = self.count.clone();
        let last = self.last.clone();
        Arc::new(move |notice: CompletionNotice| {
            let count = count.clone();
            let last = last.clone();
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
                *last.lock() = Some(notice);
                Ok(())
            }) as Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn last_reason(&self) -> Option<CompletionReason> {
        self.last.lock().as_ref().map(|notice| notice.reason)
    }

    pub fn last_notice(&self) -> Option<CompletionNotice> {
        self.last.lock().clone()
    }
}

/// Records the step indices a step hook fired for, in order.
#[derive(Clone, Default)]
pub struct StepProbe {
    seen: Arc<Mutex<Vec<u32>>>,
}

impl StepProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self) -> StepHook {
        let seen = self.seen.clone();
        Arc::new(move |context: HookContext| {
            let seen = seen.clone();
            Box::pin(async move {
                seen.lock().push(context.step_index);
                Ok(())
            }) as Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        })
    }

    pub fn seen(&self) -> Vec<u32> {
        self.seen.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }
}
