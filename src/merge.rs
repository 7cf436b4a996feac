use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dtos::{parse_id, parse_optional_id};
use crate::errors::problem::Problem;
use crate::models::{Invitation, InvitationStatus};

const REFERENCE_KEYS: [&str; 6] = ["guest_user", "team", "guest_team", "host_team", "visiting_team", "match"];
const IMMUTABLE_KEYS: [&str; 5] = ["id", "user", "created_at", "updated_at", "responded_at"];

/// Deep merges `source` into `target`.
///
/// `customizer` is asked first for every key; `Some` replaces the value outright, `None`
/// falls back to the default rule: objects merge recursively, anything else replaces.
pub fn merge_with<F>(target: &mut Value, source: &Value, customizer: &F)
where
        F: Fn(&str, &Value, &Value) -> Option<Value>,
{
        let (Value::Object(target), Value::Object(source)) = (target, source) else {
                return;
        };

        for (key, incoming) in source {
                let current = target.get(key).cloned().unwrap_or(Value::Null);
                if let Some(resolved) = customizer(key, &current, incoming) {
                        target.insert(key.clone(), resolved);
                        continue;
                }

                let nested = matches!((&current, incoming), (Value::Object(_), Value::Object(_)));
                match target.get_mut(key) {
                        Some(current) if nested => merge_with(current, incoming, customizer),
                        _ => {
                                target.insert(key.clone(), incoming.clone());
                        }
                }
        }
}

/// Merge rule for invitation bodies.
///
/// References accept either an id or an expanded document carrying `id`. Arrays replace.
pub fn merge_invitation_attr(key: &str, _current: &Value, incoming: &Value) -> Option<Value> {
        if REFERENCE_KEYS.contains(&key) {
                return Some(match incoming {
                        Value::Object(document) => document.get("id").cloned().unwrap_or(Value::Null),
                        Value::Number(id) => Value::String(id.to_string()),
                        other => other.clone(),
                });
        }
        if let Value::Array(_) = incoming {
                return Some(incoming.clone());
        }
        None
}

#[derive(Serialize, Deserialize, Debug)]
struct EditableInvitation {
        guest_user: String,
        team: Option<String>,
        guest_team: Option<String>,
        host_team: Option<String>,
        visiting_team: Option<String>,
        r#match: Option<String>,
        status: InvitationStatus,
        scheduled_at: Option<NaiveDateTime>,
}

impl From<&Invitation> for EditableInvitation {
        fn from(invitation: &Invitation) -> Self {
                EditableInvitation {
                        guest_user: invitation.guest_user_id.to_string(),
                        team: invitation.team_id.map(|id| id.to_string()),
                        guest_team: invitation.guest_team_id.map(|id| id.to_string()),
                        host_team: invitation.host_team_id.map(|id| id.to_string()),
                        visiting_team: invitation.visiting_team_id.map(|id| id.to_string()),
                        r#match: invitation.match_id.map(|id| id.to_string()),
                        status: invitation.status,
                        scheduled_at: invitation.scheduled_at,
                }
        }
}

/// Applies an update body to an invitation with [`merge_invitation_attr`].
pub fn merge_invitation(mut invitation: Invitation, body: &Value) -> Result<Invitation, Problem> {
        let Value::Object(body) = body else {
                return Err(Problem::BadRequest("Invitation body must be an object".to_string()));
        };
        let body: Map<String, Value> = body
                .iter()
                .filter(|(key, _)| !IMMUTABLE_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

        let mut merged = serde_json::to_value(EditableInvitation::from(&invitation))
                .map_err(|_| Problem::InternalServerError("failed to serialize invitation".to_string()))?;
        merge_with(&mut merged, &Value::Object(body), &merge_invitation_attr);

        let editable: EditableInvitation = serde_json::from_value(merged)
                .map_err(|err| Problem::BadRequest(format!("Invalid invitation: {}", err)))?;

        let now = Utc::now().naive_utc();
        if invitation.status == InvitationStatus::Pending && editable.status != InvitationStatus::Pending {
                invitation.responded_at = Some(now);
        }

        invitation.guest_user_id = parse_id("guest_user", &editable.guest_user)?;
        invitation.team_id = parse_optional_id("team", editable.team.as_ref())?;
        invitation.guest_team_id = parse_optional_id("guest_team", editable.guest_team.as_ref())?;
        invitation.host_team_id = parse_optional_id("host_team", editable.host_team.as_ref())?;
        invitation.visiting_team_id = parse_optional_id("visiting_team", editable.visiting_team.as_ref())?;
        invitation.match_id = parse_optional_id("match", editable.r#match.as_ref())?;
        invitation.status = editable.status;
        invitation.scheduled_at = editable.scheduled_at;
        invitation.updated_at = now;

        Ok(invitation)
}
