use std::path::{Path, PathBuf};

use api::{AwsConfig, SecretRequest};
use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::vault::KvVersion;

pub const ENV_PREFIX: &str = "KVSCRIBE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub vault_addr: Url,

    /// `--token` and `VAULT_TOKEN` take precedence
    pub token: Option<String>,

    /// Prepended to every relative secret path
    pub secret_prefix: String,

    pub kv_version: KvVersion,

    /// How often a failed request to vault is retried
    pub retries: usize,

    /// Where the list of written files is saved for `kvscribe scrub`
    pub manifest: Option<PathBuf>,

    pub secrets: Vec<SecretRequest>,

    pub aws: Vec<AwsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_addr: Url::parse("http://127.0.0.1:8200")
                .expect("default vault address is valid"),
            token: None,
            secret_prefix: String::new(),
            kv_version: KvVersion::V1,
            retries: 3,
            manifest: None,
            secrets: Vec::new(),
            aws: Vec::new(),
        }
    }
}

/// `$XDG_CONFIG_HOME/kvscribe/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    xdg::BaseDirectories::with_prefix("kvscribe").get_config_file("config.toml")
}

impl Config {
    /// Defaults, overwritten by the toml file at `path`, overwritten by `KVSCRIBE_*` variables
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use figment::Jail;

    use crate::{config::Config, vault::KvVersion};

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(None)?;
            assert_eq!(config, Config::default());
            assert_eq!(config.vault_addr.as_str(), "http://127.0.0.1:8200/");
            Ok(())
        });
    }

    #[test]
    fn file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "kvscribe.toml",
                r#"
                vault_addr = "https://vault.example.com"
                secret_prefix = "secret/app"
                kv_version = 2
                manifest = "/run/kvscribe/manifest.json"

                [[secrets]]
                key = "db"
                output = "/run/secrets/all.json"
                mode = "0600"
                useKeyAsPrefix = true
                fields = [{ name = "password", output = "/run/secrets/db-password" }]

                [[aws]]
                vault_mount = "aws"
                vault_role = "deploy"
                output_path = "/root/.aws/credentials"
                "#,
            )?;
            jail.set_env("KVSCRIBE_RETRIES", "7");
            jail.set_env("KVSCRIBE_SECRET_PREFIX", "secret/other");

            let config = Config::load(Some(Path::new("kvscribe.toml")))?;
            assert_eq!(config.vault_addr.as_str(), "https://vault.example.com/");
            assert_eq!(config.secret_prefix, "secret/other");
            assert_eq!(config.kv_version, KvVersion::V2);
            assert_eq!(config.retries, 7);
            assert_eq!(config.secrets.len(), 1);
            assert!(config.secrets[0].use_key_as_prefix);
            assert_eq!(config.secrets[0].fields[0].name, "password");
            assert_eq!(config.aws[0].profile, "default");
            assert_eq!(config.aws[0].mode, "0400");
            Ok(())
        });
    }

    #[test]
    fn unknown_kv_version() {
        Jail::expect_with(|jail| {
            jail.create_file("kvscribe.toml", "kv_version = 3")?;
            assert!(Config::load(Some(Path::new("kvscribe.toml"))).is_err());
            Ok(())
        });
    }
}
