//! Interactive stdin loop over a [`BufferController`].

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use hunger_buffer::{BufferController, BufferSnapshot, BufferStatus};
use hunger_core::{AnnotationDecision, AnnotationEvent, AnnotationValue, CandidateItem, EventEnvelope};

const LOADING_POLL: Duration = Duration::from_secs(2);

/// One line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Answer(AnnotationValue),
    Skip,
    Quit,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Command::Answer(AnnotationValue::Affirmative)),
            "n" | "no" => Some(Command::Answer(AnnotationValue::Negative)),
            "s" | "?" => Some(Command::Answer(AnnotationValue::Unknown)),
            "x" | "next" => Some(Command::Skip),
            "q" | "quit" | "exit" => Some(Command::Quit),
            "h" | "help" => Some(Command::Help),
            _ => None,
        }
    }
}

const HELP: &str = "y = yes, n = no, s = not sure, x = skip without answering, q = quit";

/// Log bus events. Failures at warn, analytics at info, the rest at debug.
pub fn log_events(mut rx: broadcast::Receiver<EventEnvelope>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => match &envelope.payload {
                    AnnotationEvent::SubmissionFailed { count, error, .. } => {
                        warn!(item_count = count, error = %error, "Annotations were not recorded");
                    }
                    event if event.is_analytics() => {
                        info!(event_type = event.event_type(), event = ?event, "Annotations recorded");
                    }
                    event => {
                        debug!(event_type = event.event_type(), event = ?event, "Buffer event");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event log lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Render one item for the terminal.
pub fn describe(item: &CandidateItem, snapshot: &BufferSnapshot) -> String {
    let payload = &item.payload;
    let mut out = String::new();
    if let Some(text) = &payload.text {
        out.push_str(text);
        out.push('\n');
    }
    if let Some(value) = payload.value.as_deref().or(payload.value_tag.as_deref()) {
        out.push_str(&format!("  value:   {}\n", value));
    }
    if let Some(barcode) = &payload.barcode {
        out.push_str(&format!("  barcode: {}\n", barcode));
    }
    if let Some(url) = &payload.image_url {
        out.push_str(&format!("  image:   {}\n", url));
    }
    out.push_str(&format!(
        "  [{} buffered, about {} left]",
        snapshot.len, snapshot.remaining
    ));
    out
}

/// Wait until the buffer leaves `Loading`. A stalled refill is retried on
/// every poll interval.
async fn wait_until_settled(controller: &BufferController) -> BufferSnapshot {
    loop {
        let waited = tokio::time::timeout(
            LOADING_POLL,
            controller.wait_for(|s| s.status != BufferStatus::Loading),
        )
        .await;
        match waited {
            Ok(snapshot) => return snapshot,
            Err(_) => {
                let snapshot = controller.snapshot();
                if let Some(error) = &snapshot.last_error {
                    eprintln!("Still loading, last fetch failed: {}", error);
                }
                if !snapshot.fetch_pending {
                    controller.refill();
                }
            }
        }
    }
}

pub async fn run(controller: BufferController) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        let snapshot = wait_until_settled(&controller).await;
        if snapshot.status == BufferStatus::NoItemsLeft {
            println!("No items left for this filter.");
            break;
        }
        let Some(item) = controller.current_item() else {
            continue;
        };
        println!("\n{}", describe(&item, &snapshot));

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match Command::parse(&line) {
            Some(Command::Answer(value)) => {
                controller.answer(AnnotationDecision::new(item.id.clone(), value))?;
            }
            Some(Command::Skip) => {
                controller.consume();
            }
            Some(Command::Quit) => break,
            Some(Command::Help) | None => println!("{}", HELP),
        }
    }

    info!(generation = %controller.generation(), "Session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunger_core::{Generation, ItemKind, ItemPayload};

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse(" Y "),
            Some(Command::Answer(AnnotationValue::Affirmative))
        );
        assert_eq!(
            Command::parse("n"),
            Some(Command::Answer(AnnotationValue::Negative))
        );
        assert_eq!(
            Command::parse("s"),
            Some(Command::Answer(AnnotationValue::Unknown))
        );
        assert_eq!(Command::parse("x"), Some(Command::Skip));
        assert_eq!(Command::parse("quit"), Some(Command::Quit));
        assert_eq!(Command::parse("maybe"), None);
    }

    #[test]
    fn test_describe_item() {
        let item = CandidateItem::new("q1", ItemKind::Insight).with_payload(ItemPayload {
            text: Some("Does the product have this label?".to_string()),
            value_tag: Some("en:organic".to_string()),
            barcode: Some("3017620422003".to_string()),
            ..Default::default()
        });
        let snapshot = BufferSnapshot {
            status: BufferStatus::Ready,
            generation: Generation::new(1),
            len: 7,
            remaining: 120,
            fetch_pending: false,
            page: 1,
            max_page: 3,
            selected: 0,
            last_error: None,
        };
        let text = describe(&item, &snapshot);
        assert!(text.starts_with("Does the product have this label?"));
        assert!(text.contains("value:   en:organic"));
        assert!(text.contains("barcode: 3017620422003"));
        assert!(text.contains("[7 buffered, about 120 left]"));
    }
}
