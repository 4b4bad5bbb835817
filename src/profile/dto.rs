use serde::{Deserialize, Serialize};

use crate::auth::dto::is_valid_email;
use crate::error::ApiError;
use crate::store::{MaritalStatus, ProfileChanges};

/// Subset update for the profile. Absent fields and empty strings leave
/// the stored value untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i32>,
    pub marital_status: Option<MaritalStatus>,
    pub children: Option<i32>,
    pub education: Option<String>,
    pub address: Option<String>,
}

impl UpdateProfileRequest {
    pub fn into_changes(self) -> Result<ProfileChanges, ApiError> {
        if self.age.is_some_and(|age| age < 0) {
            return Err(ApiError::Validation("Age must be non-negative".into()));
        }
        if self.children.is_some_and(|children| children < 0) {
            return Err(ApiError::Validation("Children must be non-negative".into()));
        }

        let email = match non_empty(self.email) {
            Some(raw) => {
                let email = raw.to_lowercase();
                if !is_valid_email(&email) {
                    return Err(ApiError::Validation("Invalid email".into()));
                }
                Some(email)
            }
            None => None,
        };

        Ok(ProfileChanges {
            name: non_empty(self.name),
            email,
            phone: non_empty(self.phone),
            age: self.age,
            marital_status: self.marital_status,
            children: self.children,
            education: non_empty(self.education),
            address: non_empty(self.address),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Response body for a successful picture upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureResponse {
    pub message: String,
    pub profile_picture: String,
}
