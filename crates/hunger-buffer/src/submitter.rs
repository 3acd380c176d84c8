//! Fire-and-forget annotation submission.
//!
//! Failures never reach the caller: they are logged and published as
//! [`AnnotationEvent::SubmissionFailed`]. Successful submissions publish
//! [`AnnotationEvent::AnnotationSubmitted`] for analytics.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use hunger_core::{AnnotationEvent, AnnotationRecord, AnnotationSink, AnnotationValue, EventBus, ItemKind};

/// Counts for one submission call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub submitted: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct AnnotationSubmitter {
    sink: Arc<dyn AnnotationSink>,
    events: EventBus,
    dry_run: bool,
}

impl AnnotationSubmitter {
    pub fn new(sink: Arc<dyn AnnotationSink>, events: EventBus) -> Self {
        Self {
            sink,
            events,
            dry_run: false,
        }
    }

    /// Log decisions instead of sending them. No analytics event is emitted.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Submit in the background. The caller does not wait on the result.
    pub fn submit(&self, records: Vec<AnnotationRecord>) -> JoinHandle<SubmissionReport> {
        let submitter = self.clone();
        tokio::spawn(async move { submitter.submit_now(records).await })
    }

    /// Submit and wait. Records are grouped by kind, value and type, one
    /// sink call per group.
    #[instrument(skip(self, records), fields(subsystem = "buffer", component = "submitter", op = "submit", item_count = records.len()))]
    pub async fn submit_now(&self, records: Vec<AnnotationRecord>) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        if records.is_empty() {
            return report;
        }

        if self.dry_run {
            for record in &records {
                info!(
                    item_id = %record.item_id,
                    kind = record.kind.as_str(),
                    value = %record.value,
                    "Dry run, annotation not sent"
                );
            }
            report.skipped = records.len();
            return report;
        }

        for group in group_records(records) {
            let start = Instant::now();
            let count = group.records.len();
            match self.sink.annotate(&group.records).await {
                Ok(()) => {
                    report.submitted += count;
                    info!(
                        item_count = count,
                        kind = group.kind.as_str(),
                        value = %group.value,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Annotations submitted"
                    );
                    self.events.emit(AnnotationEvent::AnnotationSubmitted {
                        count,
                        value: group.value,
                        kind: group.kind,
                        annotation_type: group.annotation_type,
                    });
                }
                Err(e) => {
                    report.failed += count;
                    warn!(
                        item_count = count,
                        kind = group.kind.as_str(),
                        error = %e,
                        "Annotation submission failed"
                    );
                    self.events.emit(AnnotationEvent::SubmissionFailed {
                        count,
                        kind: group.kind,
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }
}

struct RecordGroup {
    kind: ItemKind,
    value: AnnotationValue,
    annotation_type: Option<String>,
    records: Vec<AnnotationRecord>,
}

/// Group by `(kind, value, annotation_type)`, keeping first-seen order.
fn group_records(records: Vec<AnnotationRecord>) -> Vec<RecordGroup> {
    let mut groups: Vec<RecordGroup> = Vec::new();
    for record in records {
        let existing = groups.iter_mut().find(|g| {
            g.kind == record.kind
                && g.value == record.value
                && g.annotation_type == record.annotation_type
        });
        match existing {
            Some(group) => group.records.push(record),
            None => groups.push(RecordGroup {
                kind: record.kind,
                value: record.value,
                annotation_type: record.annotation_type.clone(),
                records: vec![record],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunger_core::ItemId;
    use hunger_remote::mock::MockAnnotationSink;

    fn record(id: &str, kind: ItemKind, value: AnnotationValue) -> AnnotationRecord {
        AnnotationRecord {
            item_id: ItemId::new(id),
            kind,
            value,
            annotation_type: Some("label".to_string()),
            label: None,
        }
    }

    #[tokio::test]
    async fn test_success_emits_analytics_event() {
        let sink = MockAnnotationSink::new();
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let submitter = AnnotationSubmitter::new(Arc::new(sink.clone()), events);

        let report = submitter
            .submit_now(vec![
                record("a", ItemKind::Insight, AnnotationValue::Affirmative),
                record("b", ItemKind::Insight, AnnotationValue::Affirmative),
            ])
            .await;

        assert_eq!(report.submitted, 2);
        assert_eq!(sink.call_count(), 1);
        let envelope = rx.recv().await.unwrap();
        assert_eq!(
            envelope.payload,
            AnnotationEvent::AnnotationSubmitted {
                count: 2,
                value: AnnotationValue::Affirmative,
                kind: ItemKind::Insight,
                annotation_type: Some("label".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_failure_is_swallowed_and_reported() {
        let sink = MockAnnotationSink::new();
        sink.set_failing(true);
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let submitter = AnnotationSubmitter::new(Arc::new(sink), events);

        let report = submitter
            .submit_now(vec![record("a", ItemKind::Logo, AnnotationValue::Negative)])
            .await;

        assert_eq!(report.failed, 1);
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event_type, "annotation.failed");
        assert!(!envelope.payload.is_analytics());
    }

    #[tokio::test]
    async fn test_mixed_values_grouped() {
        let sink = MockAnnotationSink::new();
        let submitter = AnnotationSubmitter::new(Arc::new(sink.clone()), EventBus::default());
        submitter
            .submit_now(vec![
                record("a", ItemKind::Insight, AnnotationValue::Affirmative),
                record("b", ItemKind::Insight, AnnotationValue::Negative),
                record("c", ItemKind::Insight, AnnotationValue::Affirmative),
            ])
            .await;
        let batches = sink.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1][0].item_id, ItemId::new("b"));
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let sink = MockAnnotationSink::new();
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let submitter =
            AnnotationSubmitter::new(Arc::new(sink.clone()), events).with_dry_run(true);

        let report = submitter
            .submit_now(vec![record("a", ItemKind::Insight, AnnotationValue::Unknown)])
            .await;

        assert_eq!(report.skipped, 1);
        assert_eq!(sink.call_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_background_submit() {
        let sink = MockAnnotationSink::new();
        let submitter = AnnotationSubmitter::new(Arc::new(sink.clone()), EventBus::default());
        let handle = submitter.submit(vec![record("a", ItemKind::Insight, AnnotationValue::Affirmative)]);
        let report = handle.await.unwrap();
        assert_eq!(report.submitted, 1);
        assert_eq!(sink.submitted_ids(), vec![ItemId::new("a")]);
    }
}
