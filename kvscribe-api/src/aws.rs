use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SecretData;

/// Where to fetch STS credentials from and where to put them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwsConfig {
    /// Mount point of the aws secrets engine
    pub vault_mount: String,
    pub vault_role: String,

    /// Section name in the credentials file
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub region: Option<String>,

    /// Path of the ini style credentials file
    pub output_path: PathBuf,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_profile() -> String {
    "default".to_owned()
}

fn default_mode() -> String {
    crate::FileMode::DEFAULT.to_string()
}

impl AwsConfig {
    pub fn vault_path(&self) -> String {
        format!(
            "{}/creds/{}",
            self.vault_mount.trim_matches('/'),
            self.vault_role
        )
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("field {field:?} is missing from the response")]
    Missing { field: &'static str },
    #[error("field {field:?} is not a string")]
    NotAString { field: &'static str },
}

/// Short lived credentials issued by the aws secrets engine
#[derive(Clone, PartialEq, Eq)]
pub struct AwsStsCredential {
    pub access_key: String,
    pub secret_key: String,
    /// vault calls this `security_token`
    pub session_token: String,
}

impl fmt::Debug for AwsStsCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsStsCredential")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

fn string_field(data: &SecretData, field: &'static str) -> Result<String, ShapeError> {
    match data.get(field) {
        None | Some(Value::Null) => Err(ShapeError::Missing { field }),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ShapeError::NotAString { field }),
    }
}

impl TryFrom<&SecretData> for AwsStsCredential {
    type Error = ShapeError;

    fn try_from(data: &SecretData) -> Result<Self, Self::Error> {
        Ok(Self {
            access_key: string_field(data, "access_key")?,
            secret_key: string_field(data, "secret_key")?,
            session_token: string_field(data, "security_token")?,
        })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::{AwsConfig, AwsStsCredential, SecretData, ShapeError};

    fn data(value: serde_json::Value) -> SecretData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn decode_credential() {
        let credential = AwsStsCredential::try_from(&data(json!({
            "access_key": "AKIA",
            "secret_key": "shh",
            "security_token": "tok3n",
            "lease_duration": 3600,
        })))
        .unwrap();
        assert_eq!(credential.access_key, "AKIA");
        assert_eq!(credential.secret_key, "shh");
        assert_eq!(credential.session_token, "tok3n");
    }

    #[test]
    fn missing_field() {
        let err = AwsStsCredential::try_from(&data(json!({
            "access_key": "AKIA",
            "secret_key": "shh",
        })))
        .unwrap_err();
        assert_eq!(
            err,
            ShapeError::Missing {
                field: "security_token"
            }
        );
    }

    #[test]
    fn wrong_type() {
        let err = AwsStsCredential::try_from(&data(json!({
            "access_key": 12,
            "secret_key": "shh",
            "security_token": "token",
        })))
        .unwrap_err();
        assert_eq!(
            err,
            ShapeError::NotAString {
                field: "access_key"
            }
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let credential = AwsStsCredential {
            access_key: "AKIA".to_owned(),
            secret_key: "shh".to_owned(),
            session_token: "tok3n".to_owned(),
        };
        let debug = format!("{credential:?}");
        assert!(debug.contains("AKIA"));
        assert!(!debug.contains("shh"));
        assert!(!debug.contains("tok3n"));
    }

    #[test]
    fn vault_path() {
        let config: AwsConfig = serde_json::from_value(json!({
            "vault_mount": "/aws/",
            "vault_role": "deploy",
            "output_path": "/root/.aws/credentials",
        }))
        .unwrap();
        assert_eq!(config.vault_path(), "aws/creds/deploy");
        assert_eq!(config.profile, "default");
        assert_eq!(config.mode, "0400");
    }
}
