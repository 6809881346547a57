/// Tools for reading and updating settings and the profile
///
/// This module implements the settings_get and settings_update MCP tools.
/// Updates are partial: the supplied JSON is merged over the stored record,
/// so a client can change one field without resending the rest.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::domain::{AppSettings, UserProfile, UserSettings};
use crate::storage::KeyValueBackend;
use crate::store::DataStore;
use crate::tools::ToolError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub user_settings: UserSettings,
    pub app_settings: AppSettings,
    pub user_profile: UserProfile,
    #[serde(skip)]
    pub message: String,
}

/// Current settings and profile
pub fn get_settings<B: KeyValueBackend>(store: &DataStore<B>) -> Result<SettingsResponse, ToolError> {
    let mut response = SettingsResponse {
        user_settings: store.load_user_settings(),
        app_settings: store.load_app_settings(),
        user_profile: store.load_user_profile(),
        message: String::new(),
    };
    response.message = serde_json::to_string_pretty(&response)?;
    Ok(response)
}

/// Partial updates, in the stored camelCase shape
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsParams {
    pub user_settings: Option<Value>,
    pub app_settings: Option<Value>,
    pub user_profile: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct UpdateSettingsResponse {
    /// Reminder-related settings were changed and reminders must be rebuilt
    pub reminders_changed: bool,
    pub updated: Vec<&'static str>,
    pub message: String,
}

/// Merge and save every supplied section
///
/// All sections are validated before any of them is written.
pub fn update_settings<B: KeyValueBackend>(
    store: &DataStore<B>,
    params: UpdateSettingsParams,
) -> Result<UpdateSettingsResponse, ToolError> {
    let user_settings = params
        .user_settings
        .map(|patch| merge_patch(&store.load_user_settings(), patch))
        .transpose()?;
    if let Some(settings) = &user_settings {
        settings.validate()?;
    }
    let app_settings = params
        .app_settings
        .map(|patch| merge_patch(&store.load_app_settings(), patch))
        .transpose()?;
    let user_profile = params
        .user_profile
        .map(|patch| merge_patch(&store.load_user_profile(), patch))
        .transpose()?;

    let mut updated = Vec::new();
    let mut reminders_changed = false;
    if let Some(settings) = user_settings {
        reminders_changed = settings != store.load_user_settings();
        store.save_user_settings(settings);
        updated.push("user settings");
    }
    if let Some(settings) = app_settings {
        store.save_app_settings(settings);
        updated.push("app settings");
    }
    if let Some(profile) = user_profile {
        store.save_user_profile(profile);
        updated.push("profile");
    }

    let message = if updated.is_empty() {
        "Nothing to update".to_string()
    } else {
        format!("⚙️ Updated {}", updated.join(", "))
    };

    Ok(UpdateSettingsResponse {
        reminders_changed,
        updated,
        message,
    })
}

/// Overlay `patch` on the serialized form of `current`
fn merge_patch<T: Serialize + DeserializeOwned>(current: &T, patch: Value) -> Result<T, ToolError> {
    if !patch.is_object() {
        return Err(ToolError::InvalidParams("settings patches must be JSON objects".to_string()));
    }
    let mut base = serde_json::to_value(current)?;
    merge_into(&mut base, patch);
    serde_json::from_value(base).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

fn merge_into(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => merge_into(existing, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}
