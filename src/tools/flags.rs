/// Tools for the critical onboarding flags
///
/// This module implements the flag_get and flag_set MCP tools.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use crate::flags::{CriticalFlag, FlagBackend, FlagStore};
use crate::tools::ToolError;

#[derive(Debug, Default, Deserialize)]
pub struct GetFlagParams {
    /// One flag by name; all flags if omitted
    pub flag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FlagsResponse {
    pub flags: BTreeMap<String, bool>,
    pub message: String,
}

pub async fn get_flags<P: FlagBackend>(flags: &FlagStore<P>, params: GetFlagParams) -> Result<FlagsResponse, ToolError> {
    let values = match params.flag {
        Some(name) => {
            let flag = CriticalFlag::parse(&name)?;
            BTreeMap::from([(flag.key().to_string(), flags.get_flag(flag).await)])
        }
        None => flags.snapshot().await,
    };

    let message = values
        .iter()
        .map(|(name, value)| format!("{} {}", if *value { "✅" } else { "⬜" }, name))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(FlagsResponse { flags: values, message })
}

#[derive(Debug, Deserialize)]
pub struct SetFlagParams {
    pub flag: String,
    pub value: bool,
}

#[derive(Debug, Serialize)]
pub struct SetFlagResponse {
    pub flag: String,
    pub value: bool,
    pub message: String,
}

pub async fn set_flag<P: FlagBackend>(flags: &FlagStore<P>, params: SetFlagParams) -> Result<SetFlagResponse, ToolError> {
    let flag = CriticalFlag::parse(&params.flag)?;
    flags.set_flag(flag, params.value).await?;

    Ok(SetFlagResponse {
        flag: flag.key().to_string(),
        value: params.value,
        message: format!("🚩 {} set to {}", flag.key(), params.value),
    })
}
