//! Patient risk assessment: ratings, request, response parsing and the per-patient flow.
//!
//! The doctor fills in a patient's clinical fields, rates how relevant each of the four
//! decision datasets is (0 to 5), and submits. The dataset-operations service answers with a
//! plain-text message: the first line is the overall assessment and every following line is
//! one component's contribution, ending in a percentage. Each component is bucketed into a
//! risk tier for display.
//!
//! ## Flow
//!
//! ```text
//! Idle -> PatientSelected -> RatingsCollected -> Ready -> Submitting -> Result
//!                                  ^   |                                  |
//!                                  +---+ all ratings zero                 +-> Ready / Idle
//! ```
//!
//! There is no cancellation: once submitted, the flow stays in `Submitting` until the
//! outcome is recorded. A failed request still ends in `Result`, carrying the generic error
//! message as its assessment.

use crate::constants::{GENERIC_ERROR_MESSAGE, MAX_RATING, MIN_RATING, ZERO_RATINGS_MESSAGE};
use crate::records::Patient;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("{field} rating must be between 0 and 5, got {value}")]
    RatingOutOfRange { field: &'static str, value: i64 },
    #[error("{}", ZERO_RATINGS_MESSAGE)]
    NoRelevantSignal,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: FlowState,
        action: &'static str,
    },
}

// ============================================================================
// RISK TIERS
// ============================================================================

/// Display bucket for a component's percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Unclassified,
}

impl RiskTier {
    /// `[0,34]` low, `[35,66]` medium, `[67,100]` high, anything else unclassified.
    ///
    /// The bands are closed and do not touch: 34.5 or 66.2 fall between them and are
    /// unclassified.
    pub fn from_percentage(percentage: f64) -> Self {
        if (0.0..=34.0).contains(&percentage) {
            RiskTier::Low
        } else if (35.0..=66.0).contains(&percentage) {
            RiskTier::Medium
        } else if (67.0..=100.0).contains(&percentage) {
            RiskTier::High
        } else {
            RiskTier::Unclassified
        }
    }

    /// Bootstrap text class used by the web front-end for this tier.
    pub fn css_class(self) -> &'static str {
        match self {
            RiskTier::Low => "text-success",
            RiskTier::Medium => "text-warning",
            RiskTier::High => "text-danger",
            RiskTier::Unclassified => "",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Unclassified => "unclassified",
        };
        f.pad(label)
    }
}

static PERCENTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(\.\d+)?)%").expect("percentage pattern is valid"));

/// The first number immediately followed by `%` in `line`.
pub fn extract_percentage(line: &str) -> Option<f64> {
    PERCENTAGE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Tier of a component line; lines without a percentage are unclassified.
pub fn risk_tier(line: &str) -> RiskTier {
    extract_percentage(line)
        .map(RiskTier::from_percentage)
        .unwrap_or(RiskTier::Unclassified)
}

// ============================================================================
// RATINGS
// ============================================================================

/// How relevant each decision dataset is to this patient, 0 to 5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceRatings {
    pub disease: u8,
    pub ckd: u8,
    pub sir: u8,
    pub maternal: u8,
}

impl RelevanceRatings {
    /// Validates the range of each rating and that at least one is non-zero.
    pub fn new(disease: i64, ckd: i64, sir: i64, maternal: i64) -> Result<Self, FlowError> {
        let ratings = Self {
            disease: checked_rating("disease", disease)?,
            ckd: checked_rating("ckd", ckd)?,
            sir: checked_rating("sir", sir)?,
            maternal: checked_rating("maternal", maternal)?,
        };
        if ratings.all_zero() {
            return Err(FlowError::NoRelevantSignal);
        }
        Ok(ratings)
    }

    pub fn all_zero(&self) -> bool {
        self.disease == 0 && self.ckd == 0 && self.sir == 0 && self.maternal == 0
    }
}

fn checked_rating(field: &'static str, value: i64) -> Result<u8, FlowError> {
    if value < i64::from(MIN_RATING) || value > i64::from(MAX_RATING) {
        return Err(FlowError::RatingOutOfRange { field, value });
    }
    Ok(value as u8)
}

/// The ranking step. Starts with every rating at 1.
///
/// Closing with all four ratings at zero keeps the dialog open and shows an error; any
/// non-zero rating closes it and hands the ratings back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankingDialog {
    disease: u8,
    ckd: u8,
    sir: u8,
    maternal: u8,
    error: Option<&'static str>,
    open: bool,
}

impl RankingDialog {
    pub fn new() -> Self {
        Self {
            disease: 1,
            ckd: 1,
            sir: 1,
            maternal: 1,
            error: None,
            open: true,
        }
    }

    /// Replaces all four ratings. Out-of-range input leaves the dialog unchanged.
    pub fn set_ratings(
        &mut self,
        disease: i64,
        ckd: i64,
        sir: i64,
        maternal: i64,
    ) -> Result<(), FlowError> {
        let disease = checked_rating("disease", disease)?;
        let ckd = checked_rating("ckd", ckd)?;
        let sir = checked_rating("sir", sir)?;
        let maternal = checked_rating("maternal", maternal)?;
        self.disease = disease;
        self.ckd = ckd;
        self.sir = sir;
        self.maternal = maternal;
        Ok(())
    }

    pub fn close(&mut self) -> Option<RelevanceRatings> {
        let ratings = RelevanceRatings {
            disease: self.disease,
            ckd: self.ckd,
            sir: self.sir,
            maternal: self.maternal,
        };
        if ratings.all_zero() {
            self.error = Some(ZERO_RATINGS_MESSAGE);
            return None;
        }
        self.error = None;
        self.open = false;
        Some(ratings)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.error
    }
}

impl Default for RankingDialog {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// REQUEST / REPORT
// ============================================================================

/// Body of `POST /get-risk-assessment`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessmentRequest {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub age: String,
    pub blood_pressure: String,
    pub blood_sugar: String,
    pub procedure_count: String,
    pub infections_reported: String,
    pub body_temperature: String,
    pub heart_rate: String,
    pub operative_procedure: String,
    pub feelings_and_urge: String,
    pub critical_feelings: String,
    pub disease: String,
    pub disease_rating: u8,
    pub ckd_rating: u8,
    pub sir_rating: u8,
    pub ma_rating: u8,
}

impl RiskAssessmentRequest {
    pub fn new(patient: &Patient, ratings: RelevanceRatings) -> Result<Self, FlowError> {
        if patient.name.trim().is_empty() {
            return Err(FlowError::MissingField("name"));
        }

        Ok(Self {
            name: patient.name.clone(),
            email: patient.email.clone(),
            phone_number: patient.phone_number.clone(),
            age: patient.age.clone(),
            blood_pressure: patient.blood_pressure.clone(),
            blood_sugar: patient.blood_sugar.clone(),
            procedure_count: patient.procedure_count.clone(),
            infections_reported: patient.infections_reported.clone(),
            body_temperature: patient.body_temperature.clone(),
            heart_rate: patient.heart_rate.clone(),
            operative_procedure: patient.operative_procedure.clone(),
            feelings_and_urge: patient.feelings_and_urge.clone(),
            critical_feelings: patient.critical_feelings.clone(),
            disease: patient.disease.clone(),
            disease_rating: ratings.disease,
            ckd_rating: ratings.ckd,
            sir_rating: ratings.sir,
            ma_rating: ratings.maternal,
        })
    }
}

/// One component line of the response with its extracted percentage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentLine {
    pub text: String,
    pub percentage: Option<f64>,
    pub tier: RiskTier,
}

impl ComponentLine {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let percentage = extract_percentage(&text);
        Self {
            tier: percentage
                .map(RiskTier::from_percentage)
                .unwrap_or(RiskTier::Unclassified),
            percentage,
            text,
        }
    }
}

/// A parsed risk-assessment response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub assessment: String,
    pub components: Vec<ComponentLine>,
}

impl AssessmentReport {
    /// Splits the service message into the overall assessment and its components.
    ///
    /// Lines are trimmed; the first `"- "` of the first line is dropped. Blank component lines
    /// (the service terminates its message with a newline) are skipped.
    pub fn parse(message: &str) -> Self {
        let mut lines = message.split('\n').map(str::trim);
        let assessment = lines
            .next()
            .map(|first| first.replacen("- ", "", 1))
            .unwrap_or_default();
        let components = lines
            .filter(|line| !line.is_empty())
            .map(ComponentLine::new)
            .collect();

        Self {
            assessment,
            components,
        }
    }

    /// The report shown when the request itself failed.
    pub fn failed() -> Self {
        Self::parse(GENERIC_ERROR_MESSAGE)
    }
}

// ============================================================================
// FLOW
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    PatientSelected,
    RatingsCollected,
    Ready,
    Submitting,
    Result,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlowState::Idle => "idle",
            FlowState::PatientSelected => "patient selected",
            FlowState::RatingsCollected => "collecting ratings",
            FlowState::Ready => "ready",
            FlowState::Submitting => "submitting",
            FlowState::Result => "showing result",
        };
        f.pad(label)
    }
}

/// The risk-assessment session for one patient-detail view.
#[derive(Clone, Debug)]
pub struct AssessmentFlow {
    state: FlowState,
    patient: Option<Patient>,
    ranking: Option<RankingDialog>,
    ratings: Option<RelevanceRatings>,
    report: Option<AssessmentReport>,
}

impl AssessmentFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::Idle,
            patient: None,
            ranking: None,
            ratings: None,
            report: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// True while a request is in flight.
    pub fn waiting(&self) -> bool {
        self.state == FlowState::Submitting
    }

    pub fn patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    pub fn ratings(&self) -> Option<RelevanceRatings> {
        self.ratings
    }

    pub fn report(&self) -> Option<&AssessmentReport> {
        self.report.as_ref()
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            state: self.state,
            action,
        }
    }

    /// Selects an existing patient, or a blank one for a new patient. Clears earlier ratings.
    pub fn select_patient(&mut self, patient: Patient) -> Result<(), FlowError> {
        if self.state == FlowState::Submitting {
            return Err(self.invalid("select a patient"));
        }
        self.patient = Some(patient);
        self.ranking = None;
        self.ratings = None;
        self.report = None;
        self.state = FlowState::PatientSelected;
        Ok(())
    }

    pub fn deselect(&mut self) -> Result<(), FlowError> {
        if self.state == FlowState::Submitting {
            return Err(self.invalid("deselect the patient"));
        }
        *self = Self::new();
        Ok(())
    }

    /// Form access for editing the selected patient's fields.
    pub fn patient_mut(&mut self) -> Result<&mut Patient, FlowError> {
        match self.state {
            FlowState::PatientSelected | FlowState::RatingsCollected | FlowState::Ready => self
                .patient
                .as_mut()
                .ok_or(FlowError::InvalidTransition {
                    state: FlowState::Idle,
                    action: "edit the patient",
                }),
            _ => Err(self.invalid("edit the patient")),
        }
    }

    /// Opens the ranking step.
    pub fn open_ranking(&mut self) -> Result<&mut RankingDialog, FlowError> {
        match self.state {
            FlowState::PatientSelected | FlowState::Ready | FlowState::RatingsCollected => {
                self.state = FlowState::RatingsCollected;
                let dialog = self.ranking.get_or_insert_with(RankingDialog::new);
                dialog.open = true;
                Ok(dialog)
            }
            _ => Err(self.invalid("open the ranking step")),
        }
    }

    pub fn ranking(&self) -> Option<&RankingDialog> {
        self.ranking.as_ref()
    }

    /// Closes the ranking step. All-zero ratings keep the flow here with the dialog error set.
    pub fn collect_ratings(&mut self) -> Result<RelevanceRatings, FlowError> {
        if self.state != FlowState::RatingsCollected {
            return Err(self.invalid("collect ratings"));
        }
        let dialog = self.ranking.get_or_insert_with(RankingDialog::new);
        match dialog.close() {
            Some(ratings) => {
                self.ratings = Some(ratings);
                self.state = FlowState::Ready;
                Ok(ratings)
            }
            None => Err(FlowError::NoRelevantSignal),
        }
    }

    /// Convenience for non-interactive callers: set all four ratings and close the step.
    pub fn rate(
        &mut self,
        disease: i64,
        ckd: i64,
        sir: i64,
        maternal: i64,
    ) -> Result<RelevanceRatings, FlowError> {
        self.open_ranking()?
            .set_ratings(disease, ckd, sir, maternal)?;
        self.collect_ratings()
    }

    /// Moves to `Submitting` and returns the request body to send.
    pub fn begin_submit(&mut self) -> Result<RiskAssessmentRequest, FlowError> {
        if self.state != FlowState::Ready {
            return Err(self.invalid("submit"));
        }
        let (Some(patient), Some(ratings)) = (self.patient.as_ref(), self.ratings) else {
            return Err(self.invalid("submit"));
        };
        let request = RiskAssessmentRequest::new(patient, ratings)?;
        self.state = FlowState::Submitting;
        Ok(request)
    }

    /// Records the outcome of the request and moves to `Result`.
    ///
    /// A failed request is logged and shown with the generic error message.
    pub fn complete<E: fmt::Display>(
        &mut self,
        outcome: Result<String, E>,
    ) -> Result<&AssessmentReport, FlowError> {
        if self.state != FlowState::Submitting {
            return Err(self.invalid("record a result"));
        }
        let report = match outcome {
            Ok(message) => AssessmentReport::parse(&message),
            Err(e) => {
                tracing::warn!("risk assessment request failed: {e}");
                AssessmentReport::failed()
            }
        };
        self.state = FlowState::Result;
        Ok(self.report.insert(report))
    }

    /// Closes the result: back to `Ready` with the same patient and ratings, or `Idle`.
    pub fn close_result(&mut self) -> Result<FlowState, FlowError> {
        if self.state != FlowState::Result {
            return Err(self.invalid("close the result"));
        }
        self.state = if self.patient.is_some() && self.ratings.is_some() {
            FlowState::Ready
        } else {
            FlowState::Idle
        };
        Ok(self.state)
    }
}

impl Default for AssessmentFlow {
    fn default() -> Self {
        Self::new()
    }
}
