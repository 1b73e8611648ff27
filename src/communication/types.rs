use chrono::{DateTime, Utc};
use log::error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use super::registry::CommandRegistry;
use crate::utils::error_handling::{ProtoError, ProtoResult};

/// Sent by a user to an agent. The API relays the Cmd to the agent and the
/// Reply back to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Cmd {
    pub user: String,
    pub ts: DateTime<Utc>,
    pub agent_uuid: String,
    pub cmd: String,
    /// Empty for the agent itself, otherwise a registry service
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service: String,
    /// JSON-encoded payload for the command, if any
    #[serde(with = "base64_bytes", skip_serializing_if = "is_empty_bytes")]
    pub data: Option<Vec<u8>>,
    /// Set by the API
    #[serde(skip_serializing_if = "String::is_empty")]
    pub relay_id: String,
}

/// Sent by an agent to the user in response to every command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Reply {
    /// Originating `Cmd::cmd`
    pub cmd: String,
    /// Success if empty
    pub error: String,
    #[serde(with = "base64_bytes", skip_serializing_if = "is_empty_bytes")]
    pub data: Option<Vec<u8>>,
    pub relay_id: String,
}

/// Data for StartService and StopService
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceData {
    pub name: String,
    #[serde(with = "base64_bytes", skip_serializing_if = "is_empty_bytes")]
    pub config: Option<Vec<u8>>,
}

/// Data for the Status reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StatusData {
    pub agent: String,
    pub cmd_queue: Vec<String>,
    /// Keyed on service name
    pub service: HashMap<String, String>,
}

/// Data for SetLogFile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LogFile {
    pub file: String,
}

/// Data for SetLogLevel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LogLevel {
    pub level: i64,
}

impl Cmd {
    /// Create a command stamped with the current time
    pub fn new(user: &str, agent_uuid: &str, service: &str, cmd: &str) -> Self {
        Self {
            user: user.to_string(),
            ts: Utc::now(),
            agent_uuid: agent_uuid.to_string(),
            cmd: cmd.to_string(),
            service: service.to_string(),
            data: None,
            relay_id: String::new(),
        }
    }

    /// Attach a JSON-encoded payload
    pub fn with_data<T: Serialize + ?Sized>(mut self, data: &T) -> ProtoResult<Self> {
        self.data = Some(serde_json::to_vec(data)?);
        Ok(self)
    }

    /// Stamp a fresh relay id unless one is already set
    pub fn assign_relay_id(&mut self) -> &str {
        if self.relay_id.is_empty() {
            self.relay_id = Uuid::new_v4().to_string();
        }
        &self.relay_id
    }

    /// Validate against the process-wide default registry
    pub fn validate(&self) -> ProtoResult<()> {
        self.validate_against(CommandRegistry::global())
    }

    pub fn validate_against(&self, registry: &CommandRegistry) -> ProtoResult<()> {
        let cmds = registry
            .lookup(&self.service)
            .ok_or_else(|| ProtoError::UnknownService {
                service: self.service.clone(),
            })?;

        if !cmds.iter().any(|c| *c == self.cmd) {
            return Err(ProtoError::UnknownCommand {
                service: self.service.clone(),
                cmd: self.cmd.clone(),
            });
        }

        Ok(())
    }

    /// Build the reply to this command.
    ///
    /// `data` is JSON-encoded into `Reply::data`. A value that cannot be
    /// encoded is a caller bug, so this panics instead of returning a
    /// malformed reply. Use [`Cmd::try_reply`] to observe the failure.
    pub fn reply<T: Serialize + ?Sized>(
        &self,
        err: Option<&dyn fmt::Display>,
        data: Option<&T>,
    ) -> Reply {
        match self.try_reply(err, data) {
            Ok(reply) => reply,
            Err(e) => {
                error!("{}: {}", self, e);
                panic!("{}", e);
            }
        }
    }

    pub fn try_reply<T: Serialize + ?Sized>(
        &self,
        err: Option<&dyn fmt::Display>,
        data: Option<&T>,
    ) -> ProtoResult<Reply> {
        let data = data
            .map(|d| serde_json::to_vec(d))
            .transpose()
            .map_err(|e| ProtoError::EncodingFailure(e.to_string()))?;

        Ok(Reply {
            cmd: self.cmd.clone(),
            error: err.map(|e| e.to_string()).unwrap_or_default(),
            data,
            relay_id: self.relay_id.clone(),
        })
    }

    pub fn reply_ok<T: Serialize + ?Sized>(&self, data: Option<&T>) -> Reply {
        self.reply(None, data)
    }

    pub fn reply_err(&self, err: &dyn fmt::Display) -> Reply {
        self.reply::<()>(Some(err), None)
    }

    /// Decode the command payload, `Ok(None)` when there is none
    pub fn decode_data<T: DeserializeOwned>(&self) -> ProtoResult<Option<T>> {
        decode_payload(self.data.as_deref())
    }
}

// Used when logging commands and reporting status
impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cmd:{} Service:{} User:{} Ts:{}",
            self.cmd, self.service, self.user, self.ts
        )
    }
}

impl Reply {
    /// An empty `error` is the only success signal; absent data is not
    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }

    pub fn decode_data<T: DeserializeOwned>(&self) -> ProtoResult<Option<T>> {
        decode_payload(self.data.as_deref())
    }
}

fn decode_payload<T: DeserializeOwned>(data: Option<&[u8]>) -> ProtoResult<Option<T>> {
    let decoded = data.map(|bytes| serde_json::from_slice(bytes)).transpose()?;
    Ok(decoded)
}

fn is_empty_bytes(data: &Option<Vec<u8>>) -> bool {
    data.as_ref().map_or(true, |bytes| bytes.is_empty())
}

/// Byte payloads travel as standard base64 strings
mod base64_bytes {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        data: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => serializer.serialize_str(&general_purpose::STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| {
                general_purpose::STANDARD
                    .decode(s)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}
