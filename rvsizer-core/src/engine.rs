use std::sync::Arc;

use futures_util::future::join3;
use rvsizer_aggregate::summarize_all;
use rvsizer_recommend::{Recommendation, Recommender, SizingRequest};
use rvsizer_scope::{PolicyScope, ScopeError};
use rvsizer_types::{PerPolicy, Policy, ScopeOptions, Summary};
use serde::Serialize;
use tracing::{info, warn};

use crate::report::{PolicyReport, Section, SizingReport};
use crate::session::SizingSession;

/// Result of one user submission.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SizingOutcome {
    /// Nothing uploaded yet; callers render a placeholder.
    AwaitingWorkbook,
    Ready(Box<SizingReport>),
}

pub struct SizingEngine {
    recommender: Arc<dyn Recommender>,
}

impl SizingEngine {
    pub fn new(recommender: Arc<dyn Recommender>) -> Self {
        Self { recommender }
    }

    pub async fn submit(
        &self,
        session: Option<&SizingSession>,
        options: &ScopeOptions,
    ) -> Result<SizingOutcome, ScopeError> {
        match session {
            None => Ok(SizingOutcome::AwaitingWorkbook),
            Some(session) => Ok(SizingOutcome::Ready(Box::new(
                self.size(session, options).await?,
            ))),
        }
    }

    /// Scope, aggregate and request recommendations for all three policies.
    ///
    /// Only a structural failure aborts; per-policy problems become unavailable
    /// sections of the report.
    pub async fn size(
        &self,
        session: &SizingSession,
        options: &ScopeOptions,
    ) -> Result<SizingReport, ScopeError> {
        let scoped = rvsizer_scope::apply(session.inventory(), options)?;
        let summaries = summarize_all(&scoped);

        let (provisioned, used, consumed) = join3(
            self.recommend(&summaries.provisioned),
            self.recommend(&summaries.used),
            self.recommend(&summaries.consumed),
        )
        .await;
        let report = |policy, recommendation| {
            policy_report(scoped.scope(policy), summaries.get(policy), recommendation)
        };
        let policies = PerPolicy {
            provisioned: report(Policy::Provisioned, provisioned),
            used: report(Policy::Used, used),
            consumed: report(Policy::Consumed, consumed),
        };

        info!(
            session = %session.id(),
            powered_off = scoped.powered_off_count,
            "sizing report ready"
        );
        Ok(SizingReport {
            session_id: session.id(),
            workbook_sha256: session.workbook_sha256().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            powered_off_count: scoped.powered_off_count as u64,
            powered_off_excluded: scoped.powered_off_excluded,
            policies,
        })
    }

    async fn recommend(
        &self,
        summary: &Result<Summary, ScopeError>,
    ) -> Section<Recommendation> {
        let summary = match summary {
            Ok(summary) => summary,
            Err(e) => return Section::unavailable(format!("no summary: {e}")),
        };
        let result = self
            .recommender
            .recommend(&SizingRequest::from_summary(summary))
            .await;
        if let Err(e) = &result {
            warn!(error = %e, "recommendation unavailable");
        }
        Section::from_result(result)
    }
}

fn policy_report(
    scope: &PolicyScope,
    summary: &Result<Summary, ScopeError>,
    recommendation: Section<Recommendation>,
) -> PolicyReport {
    let summary = match summary {
        Ok(summary) => Section::Available(summary.clone()),
        Err(e) => Section::unavailable(e),
    };
    PolicyReport {
        totals: summary.clone().map(|s| s.totals()),
        rounded: summary.clone().map(|s| s.rounded()),
        summary,
        recommendation,
        kept: Section::from_result(scope.kept.rows()),
        removed: Section::from_result(scope.removed.rows()),
        unmatched: Section::from_result(scope.unmatched.rows()),
    }
}
