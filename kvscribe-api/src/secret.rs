use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mode::{FileMode, FileModeError};

/// Fields of one secret as returned by vault. Keeps the order vault sent them in
pub type SecretData = IndexMap<String, Value>;

/// The key is `SecretRequest.key`, not to be confused with the vault path
pub type Secrets = IndexMap<String, SecretData>;

/// Declares which secret to fetch and where its fields end up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretRequest {
    /// Used to look up the fetched data and as the prefix for `use_key_as_prefix`
    pub key: String,

    /// Vault path of the secret. Defaults to `key`
    /// Relative paths are joined onto the configured prefix, a leading `/` skips the prefix
    #[serde(default)]
    pub path: String,

    /// Each field is written raw into its own file
    #[serde(default)]
    pub fields: Vec<SecretField>,

    /// JSON file which receives every field of the secret. Empty means no JSON output
    #[serde(default)]
    pub output: PathBuf,

    /// Permissions mode of every file written for this request in a format understood by chmod.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Only warn if a field is missing from the secret
    #[serde(default, alias = "missingOk")]
    pub missing_ok: bool,

    /// Namespace the JSON keys as `{key}_{field}`
    #[serde(default, alias = "useKeyAsPrefix")]
    pub use_key_as_prefix: bool,
}

/// A single field of a secret and the file it is written to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretField {
    pub name: String,
    pub output: PathBuf,
}

fn default_mode() -> String {
    FileMode::DEFAULT.to_string()
}

impl SecretRequest {
    pub fn file_mode(&self) -> Result<FileMode, FileModeError> {
        self.mode.parse()
    }

    /// `None` if the request does not contribute to a JSON file
    pub fn json_output(&self) -> Option<&Path> {
        if self.output.as_os_str().is_empty() {
            None
        } else {
            Some(&self.output)
        }
    }

    /// Resolves the path to query in vault
    pub fn vault_path(&self, prefix: &str) -> String {
        let path = if self.path.is_empty() {
            self.key.as_str()
        } else {
            self.path.as_str()
        };

        if let Some(absolute) = path.strip_prefix('/') {
            return absolute.to_owned();
        }

        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            path.to_owned()
        } else {
            format!("{prefix}/{path}")
        }
    }

    /// Every file this request writes to
    pub fn destinations(&self) -> Vec<&Path> {
        self.fields
            .iter()
            .map(|field| field.output.as_path())
            .chain(self.json_output())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use crate::{FileMode, SecretRequest};

    fn request(json: serde_json::Value) -> SecretRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn defaults() {
        let request = request(serde_json::json!({ "key": "app/secret" }));
        assert!(request.fields.is_empty());
        assert!(request.json_output().is_none());
        assert!(!request.missing_ok);
        assert!(!request.use_key_as_prefix);
        assert_eq!(request.file_mode().unwrap(), FileMode::DEFAULT);
    }

    #[test]
    fn camel_case_aliases() {
        let request = request(serde_json::json!({
            "key": "db",
            "missingOk": true,
            "useKeyAsPrefix": true,
        }));
        assert!(request.missing_ok);
        assert!(request.use_key_as_prefix);
    }

    #[test]
    fn vault_path_uses_key_and_prefix() {
        let request = request(serde_json::json!({ "key": "db" }));
        assert_eq!(request.vault_path(""), "db");
        assert_eq!(request.vault_path("secret/app/"), "secret/app/db");
    }

    #[test]
    fn absolute_vault_path_skips_prefix() {
        let request = request(serde_json::json!({ "key": "db", "path": "/kv/shared/db" }));
        assert_eq!(request.vault_path("secret/app"), "kv/shared/db");
    }

    #[test]
    fn destinations_include_json_output() {
        let request = request(serde_json::json!({
            "key": "db",
            "fields": [{ "name": "password", "output": "/run/db/password" }],
            "output": "/run/all.json",
        }));
        assert_eq!(
            request.destinations(),
            vec![Path::new("/run/db/password"), Path::new("/run/all.json")]
        );
    }
}
