//! Robotoff annotation client.
//!
//! Insight decisions are posted one form request per insight, concurrently.
//! Logo decisions go out as a single JSON batch and must be affirmative.
//! Products have no annotation endpoint and are rejected with
//! [`Error::InvalidInput`].

use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use hunger_core::{AnnotationRecord, AnnotationSink, AnnotationValue, Error, ItemKind, Result};

use crate::config::RemoteConfig;
use crate::error::submission_error;

#[derive(Debug, Serialize)]
struct LogoAnnotation<'a> {
    logo_id: &'a str,
    value: &'a str,
    #[serde(rename = "type")]
    logo_type: &'a str,
}

#[derive(Debug, Serialize)]
struct LogoAnnotationBatch<'a> {
    annotations: Vec<LogoAnnotation<'a>>,
}

/// HTTP implementation of [`AnnotationSink`].
#[derive(Clone)]
pub struct RobotoffClient {
    client: Client,
    base_url: String,
}

impl RobotoffClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self {
            client,
            base_url: config.robotoff_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(RemoteConfig::from_env())
    }

    async fn annotate_insight(&self, record: &AnnotationRecord) -> Result<()> {
        let annotation = record.value.as_i8().to_string();
        let form = [
            ("insight_id", record.item_id.as_str()),
            ("annotation", annotation.as_str()),
            ("update", "1"),
        ];

        let response = self
            .client
            .post(format!("{}/insights/annotate", self.base_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::SubmissionFailed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(submission_error(status, &body));
        }
        Ok(())
    }

    async fn annotate_logos(&self, records: &[&AnnotationRecord]) -> Result<()> {
        let mut annotations = Vec::with_capacity(records.len());
        for record in records {
            let (Some(logo_type), Some(label)) =
                (record.annotation_type.as_deref(), record.label.as_deref())
            else {
                return Err(Error::InvalidInput(format!(
                    "Logo {} needs both a type and a label",
                    record.item_id
                )));
            };
            annotations.push(LogoAnnotation {
                logo_id: record.item_id.as_str(),
                value: label,
                logo_type,
            });
        }

        let response = self
            .client
            .post(format!("{}/images/logos/annotate", self.base_url))
            .json(&LogoAnnotationBatch { annotations })
            .send()
            .await
            .map_err(|e| Error::SubmissionFailed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(submission_error(status, &body));
        }
        Ok(())
    }
}

#[async_trait]
impl AnnotationSink for RobotoffClient {
    #[instrument(skip(self, records), fields(subsystem = "remote", component = "robotoff", op = "annotate", item_count = records.len()))]
    async fn annotate(&self, records: &[AnnotationRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if let Some(product) = records.iter().find(|r| r.kind == ItemKind::Product) {
            return Err(Error::InvalidInput(format!(
                "Product {} cannot be annotated through Robotoff",
                product.item_id
            )));
        }
        // A logo annotation assigns its label; there is no negative form.
        if let Some(logo) = records
            .iter()
            .find(|r| r.kind == ItemKind::Logo && r.value != AnnotationValue::Affirmative)
        {
            return Err(Error::InvalidInput(format!(
                "Logo {} can only be annotated with an affirmative label, got {}",
                logo.item_id, logo.value
            )));
        }

        let start = Instant::now();
        let insights: Vec<&AnnotationRecord> =
            records.iter().filter(|r| r.kind == ItemKind::Insight).collect();
        let logos: Vec<&AnnotationRecord> =
            records.iter().filter(|r| r.kind == ItemKind::Logo).collect();

        let results = join_all(insights.iter().map(|r| self.annotate_insight(r))).await;
        let failures: Vec<Error> = results.into_iter().filter_map(|r| r.err()).collect();

        if !logos.is_empty() {
            self.annotate_logos(&logos).await?;
        }

        let elapsed = start.elapsed().as_millis() as u64;
        if let Some(first) = failures.first() {
            warn!(
                failed = failures.len(),
                total = insights.len(),
                duration_ms = elapsed,
                "Some insight annotations failed"
            );
            return Err(Error::SubmissionFailed(format!(
                "{} of {} insight annotations failed: {}",
                failures.len(),
                insights.len(),
                first
            )));
        }

        debug!(
            insight_count = insights.len(),
            logo_count = logos.len(),
            duration_ms = elapsed,
            "Annotations recorded"
        );
        Ok(())
    }
}
