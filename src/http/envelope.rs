use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::ApiError;

/// Application-level success code, independent of the HTTP status.
pub const SUCCESS_CODE: i64 = 200;

/// Uniform wrapper around every backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  pub code: i64,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub count: i64,
  #[serde(default)]
  pub data: Value,
}

impl Envelope {
  pub fn is_success(&self) -> bool {
    self.code == SUCCESS_CODE
  }

  /// Check the application code and decode the payload.
  ///
  /// A failure code becomes [`ApiError::Domain`]; a payload that does not
  /// match `T` becomes [`ApiError::Translation`]. Nothing is partially decoded.
  pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
    self.check()?;
    serde_json::from_value(self.data).map_err(ApiError::Translation)
  }

  /// Check the application code, ignoring the payload.
  pub fn into_unit(self) -> Result<(), ApiError> {
    self.check()
  }

  fn check(&self) -> Result<(), ApiError> {
    if self.is_success() {
      Ok(())
    } else {
      Err(ApiError::Domain {
        code: self.code,
        message: self.message.clone(),
      })
    }
  }
}
