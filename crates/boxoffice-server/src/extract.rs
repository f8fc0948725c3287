use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use boxoffice_api::ApiError;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

/// JSON body that has been deserialized and validated.
///
/// Both failures are rejected with 400 and the envelope body.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        value
            .validate()
            .map_err(|e| ApiError::validation(describe(&e)))?;
        Ok(ValidJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    ApiError::validation(rejection.body_text())
}

/// Flattens field errors into `field: message; field: message`.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: invalid value ({})", err.code),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}
