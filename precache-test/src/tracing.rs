//! Span capture for asserting on instrumentation.
//!
//! Only spans named `precache.*` and `offload_task` are recorded, together
//! with their fields rendered as strings.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::field::{Field, Visit};
use tracing::instrument::WithSubscriber;
use tracing::span::{Attributes, Id, Record};
use tracing::{Dispatch, Subscriber};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

/// A recorded span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSpan {
    pub id: u64,
    /// The span name (e.g. "precache.intercept").
    pub name: &'static str,
    pub fields: BTreeMap<&'static str, String>,
}

fn tracked(name: &str) -> bool {
    name.starts_with("precache.") || name == "offload_task"
}

struct Fields<'a>(&'a mut BTreeMap<&'static str, String>);

impl Visit for Fields<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name(), value.to_owned());
    }
}

type Journal = Arc<Mutex<Vec<CapturedSpan>>>;

fn lock(journal: &Journal) -> MutexGuard<'_, Vec<CapturedSpan>> {
    journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Recorder(Journal);

impl<S> Layer<S> for Recorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
        let name = attrs.metadata().name();
        if !tracked(name) {
            return;
        }
        let mut fields = BTreeMap::new();
        attrs.record(&mut Fields(&mut fields));
        lock(&self.0).push(CapturedSpan {
            id: id.into_u64(),
            name,
            fields,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut journal = lock(&self.0);
        if let Some(span) = journal.iter_mut().find(|span| span.id == id.into_u64()) {
            values.record(&mut Fields(&mut span.fields));
        }
    }
}

/// Collects tracked spans emitted while it is the active subscriber.
#[derive(Clone)]
pub struct SpanCollector {
    journal: Journal,
    dispatch: Dispatch,
}

impl Default for SpanCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanCollector {
    pub fn new() -> Self {
        let journal = Journal::default();
        let dispatch = Dispatch::new(Registry::default().with(Recorder(journal.clone())));
        Self { journal, dispatch }
    }

    /// The subscriber to install, e.g. with `tracing::dispatcher::with_default`.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `future` with this collector as the default subscriber.
    pub async fn capture<F: Future>(&self, future: F) -> F::Output {
        future.with_subscriber(self.dispatch.clone()).await
    }

    /// Everything captured so far, in creation order.
    pub fn spans(&self) -> Vec<CapturedSpan> {
        lock(&self.journal).clone()
    }

    pub fn span_names(&self) -> Vec<&'static str> {
        lock(&self.journal).iter().map(|span| span.name).collect()
    }

    pub fn has_span(&self, name: &str) -> bool {
        self.count(name) > 0
    }

    pub fn count(&self, name: &str) -> usize {
        lock(&self.journal)
            .iter()
            .filter(|span| span.name == name)
            .count()
    }

    /// Value of `field` on the most recent span named `span`.
    pub fn get_field(&self, span: &str, field: &str) -> Option<String> {
        lock(&self.journal)
            .iter()
            .rev()
            .find(|captured| captured.name == span)
            .and_then(|captured| captured.fields.get(field).cloned())
    }

    pub fn clear(&self) {
        lock(&self.journal).clear();
    }

    /// Panics unless every name in `expected` was captured at least once.
    pub fn assert_has_spans(&self, expected: &[&str]) {
        let captured = self.span_names();
        for name in expected {
            assert!(
                captured.iter().any(|captured| captured == name),
                "span '{name}' was not captured, got {captured:?}"
            );
        }
    }
}
