//! Acceptance rules for prediction submissions.
//!
//! The rules are pure: the store loads a [`SubmissionSnapshot`] inside the
//! same transaction that performs the insert, and the rules decide on that
//! snapshot alone. Every failure is collected except a missing forecast,
//! which ends the check.

use chrono::{DateTime, Utc};

use super::error::{FieldErrors, FORM_FIELD};
use super::forecast::Forecast;
use super::group::Group;
use super::id::{GroupId, UserId};
use super::prediction::{Prediction, PredictionScope};

pub const FORECAST_NOT_FOUND: &str = "Forecast not found";
pub const FORECAST_CLOSED: &str =
    "This forecast has already closed. Predictions can no longer be submitted.";
pub const FORECAST_CLOSED_FOR_UPDATE: &str =
    "This forecast has already closed. Predictions can no longer be updated.";
pub const ALREADY_SUBMITTED_INDIVIDUAL: &str = "You have already submitted an individual prediction for this forecast. Please update your existing prediction instead.";
pub const GROUP_ALREADY_SUBMITTED: &str =
    "This group has already submitted a prediction for this forecast.";
pub const MEMBER_GROUP_ALREADY_SUBMITTED: &str = "Your group has already submitted a prediction for this forecast. You cannot submit an individual prediction.";
pub const GROUP_NOT_FOUND: &str = "Selected group was not found.";
pub const GROUP_OUTSIDE_ORGANIZATION: &str =
    "This group does not belong to the forecast's organization.";
pub const NOT_A_MEMBER: &str =
    "You must belong to this group in order to submit a group prediction.";

/// Everything the submission rules need to know, read in one transaction.
#[derive(Debug, Clone, Default)]
pub struct SubmissionSnapshot {
    pub forecast: Option<Forecast>,
    /// Scope of a prediction the submitter already made on the forecast.
    pub own_prediction: Option<PredictionScope>,
    /// Group the submitter currently belongs to.
    pub member_of: Option<GroupId>,
    /// The group named by the submission, when it exists.
    pub requested_group: Option<Group>,
    /// Whether the deciding group already predicted on the forecast.
    ///
    /// The deciding group is the requested group for group submissions and
    /// the submitter's own group for individual ones.
    pub group_has_prediction: bool,
}

/// Decide whether a new prediction may be stored.
pub fn check_submission(
    snapshot: &SubmissionSnapshot,
    group: Option<&GroupId>,
    value: &str,
    now: DateTime<Utc>,
) -> Result<(), FieldErrors> {
    let Some(forecast) = &snapshot.forecast else {
        return Err(FieldErrors::form(FORECAST_NOT_FOUND));
    };

    let mut errors = FieldErrors::new();

    if !forecast.is_open(now) {
        errors.add(FORM_FIELD, FORECAST_CLOSED);
    }

    match group {
        None => {
            match snapshot.own_prediction {
                Some(PredictionScope::Individual) => {
                    errors.add(FORM_FIELD, ALREADY_SUBMITTED_INDIVIDUAL);
                }
                Some(PredictionScope::Group(_)) => {
                    errors.add(FORM_FIELD, MEMBER_GROUP_ALREADY_SUBMITTED);
                }
                None => {}
            }
            if snapshot.member_of.is_some() && snapshot.group_has_prediction {
                errors.add(FORM_FIELD, MEMBER_GROUP_ALREADY_SUBMITTED);
            }
        }
        Some(group_id) => {
            match &snapshot.requested_group {
                None => errors.add("groupId", GROUP_NOT_FOUND),
                Some(found) => {
                    if found.organization_id != forecast.organization_id {
                        errors.add("groupId", GROUP_OUTSIDE_ORGANIZATION);
                    }
                    if snapshot.member_of.as_ref() != Some(group_id) {
                        errors.add("groupId", NOT_A_MEMBER);
                    }
                    if snapshot.group_has_prediction {
                        errors.add(FORM_FIELD, GROUP_ALREADY_SUBMITTED);
                    }
                }
            }
            if matches!(snapshot.own_prediction, Some(PredictionScope::Individual)) {
                errors.add(FORM_FIELD, ALREADY_SUBMITTED_INDIVIDUAL);
            }
        }
    }

    if let Err(value_errors) = forecast.check_value("value", value) {
        errors.extend(value_errors);
    }

    errors.into_result()
}

/// True if `actor` may change `prediction`.
///
/// Individual predictions belong to their submitter. Group predictions may be
/// changed by the submitter or any current member of the group.
#[must_use]
pub fn may_edit(prediction: &Prediction, actor: &UserId, actor_group: Option<&GroupId>) -> bool {
    if &prediction.user_id == actor {
        return true;
    }
    match (&prediction.group_id, actor_group) {
        (Some(owner), Some(member_of)) => owner == member_of,
        _ => false,
    }
}

/// Decide whether an existing prediction may take `value`.
pub fn check_update(forecast: &Forecast, value: &str, now: DateTime<Utc>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if !forecast.is_open(now) {
        errors.add(FORM_FIELD, FORECAST_CLOSED_FOR_UPDATE);
    }
    if let Err(value_errors) = forecast.check_value("value", value) {
        errors.extend(value_errors);
    }
    errors.into_result()
}
