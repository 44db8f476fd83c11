use serde::{Deserialize, Serialize};

use crate::storage::{Storage, StorageError, USER_PROFILE_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Jane Doe".into(),
            email: "jane@gmail.com".into(),
            phone: "+01 234 567 89".into(),
        }
    }
}

/// Load the stored profile. On first run the default profile is stored and
/// returned.
pub fn load_profile(storage: &Storage) -> Result<Profile, StorageError> {
    if let Some(profile) = storage.get(USER_PROFILE_KEY)? {
        return Ok(profile);
    }
    let profile = Profile::default();
    storage.set(USER_PROFILE_KEY, &profile)?;
    Ok(profile)
}

pub fn update_profile(storage: &Storage, profile: &Profile) -> Result<(), StorageError> {
    storage.set(USER_PROFILE_KEY, profile)
}
