//! Submitting a prepared risk assessment.

use crate::Gateway;
use hrc_core::{AssessmentFlow, AssessmentReport, FlowError};

/// Sends the flow's request and records the outcome: `Ready -> Submitting -> Result`.
///
/// A failed request is not an error here; the flow still reaches `Result` with the generic
/// message as its assessment. Errors are only returned when the flow is not `Ready`.
pub async fn submit<'a>(
    gateway: &Gateway,
    flow: &'a mut AssessmentFlow,
) -> Result<&'a AssessmentReport, FlowError> {
    let request = flow.begin_submit()?;
    tracing::debug!("submitting risk assessment for {}", request.name);

    let outcome = gateway
        .get_risk_assessment(&request)
        .await
        .map(|response| response.message);
    flow.complete(outcome)
}
