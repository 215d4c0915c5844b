use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt};
use validator::{Validate, ValidationErrors};

use crate::entities::comment::{MAX_RATING, MIN_RATING};
use crate::services::comments::{Actor, GuestIdentity};

pub const REQUIRED_FOR_GUEST: &str = "Required for guest.";
pub const REQUIRED: &str = "This field is required.";
pub const NOT_A_WHOLE_NUMBER: &str = "Enter a whole number.";
pub const RATING_OUT_OF_RANGE: &str = "Rating must be between 1 and 5.";

/// Error messages keyed by the name of the offending field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut field_errors = FieldErrors::default();
        for (field, errors) in errors.field_errors() {
            for error in errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                field_errors.add(&field, message);
            }
        }
        field_errors
    }
}

/// Raw comment form as submitted by the client. `rating` is kept as sent so
/// that anything other than a small whole number becomes a field error
/// instead of a rejected body.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, Validate)]
pub struct CommentSubmission {
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    #[validate(length(max = 400, message = "Ensure this value has at most 400 characters."))]
    pub text: Option<String>,
    #[serde(default)]
    #[validate(length(max = 80, message = "Ensure this value has at most 80 characters."))]
    pub guest_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub guest_email: Option<String>,
}

impl CommentSubmission {
    /// Trims every text field and drops the ones left empty.
    fn normalized(&self) -> CommentSubmission {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        }

        let rating = match &self.rating {
            Some(Value::String(value)) if value.trim().is_empty() => None,
            Some(Value::String(value)) => Some(Value::String(value.trim().to_owned())),
            other => other.clone(),
        };

        CommentSubmission {
            rating,
            text: clean(&self.text),
            guest_name: clean(&self.guest_name),
            guest_email: clean(&self.guest_email),
        }
    }
}

/// Reads a whole number from a JSON number or numeric string. Values such
/// as `4.0` count as whole; `3.5`, `"five"` or `true` do not.
fn whole_number(value: &Value) -> Option<i64> {
    fn from_float(value: f64) -> Option<i64> {
        (value.is_finite() && value.fract() == 0.0)
            .then(|| value.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    }

    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_u64().map(|_| i64::MAX))
            .or_else(|| number.as_f64().and_then(from_float)),
        Value::String(text) => text
            .parse::<i64>()
            .ok()
            .or_else(|| text.parse::<f64>().ok().and_then(from_float)),
        _ => None,
    }
}

/// Checks the raw rating, recording at most one error on `rating`.
fn parse_rating(value: Option<&Value>, errors: &mut FieldErrors) -> Option<i32> {
    let Some(value) = value else {
        errors.add("rating", REQUIRED);
        return None;
    };
    let Some(number) = whole_number(value) else {
        errors.add("rating", NOT_A_WHOLE_NUMBER);
        return None;
    };
    if !(i64::from(MIN_RATING)..=i64::from(MAX_RATING)).contains(&number) {
        errors.add("rating", RATING_OUT_OF_RANGE);
        return None;
    }
    i32::try_from(number).ok()
}

/// A submission that passed [`validate_submission`].
#[derive(Clone, Debug, PartialEq)]
pub struct ValidSubmission {
    pub actor: Actor,
    pub rating: i32,
    pub text: String,
}

/// Checks a submission for the given actor. `user_id` is `None` for guests,
/// who must then supply both `guest_name` and `guest_email`.
pub fn validate_submission(
    input: &CommentSubmission,
    user_id: Option<i32>,
) -> Result<ValidSubmission, FieldErrors> {
    let input = input.normalized();
    let mut errors = input.validate().err().map(FieldErrors::from).unwrap_or_default();
    let rating = parse_rating(input.rating.as_ref(), &mut errors);

    if user_id.is_none() {
        if input.guest_name.is_none() {
            errors.add("guest_name", REQUIRED_FOR_GUEST);
        }
        if input.guest_email.is_none() {
            errors.add("guest_email", REQUIRED_FOR_GUEST);
        }
    }

    let rating = match rating {
        Some(rating) if errors.is_empty() => rating,
        _ => return Err(errors),
    };

    let actor = match user_id {
        Some(user_id) => Actor::User(user_id),
        None => Actor::Guest(GuestIdentity {
            name: input.guest_name.unwrap_or_default(),
            email: input.guest_email.unwrap_or_default(),
        }),
    };

    Ok(ValidSubmission {
        actor,
        rating,
        text: input.text.unwrap_or_default(),
    })
}
