use kvscribe::{config::Config, vault::VaultClient};
use rootcause::Report;

pub fn vault_client(config: &Config) -> Result<VaultClient, Report> {
    let token = config.token.clone().ok_or(rootcause::report!(
        "A vault token is required. Use `--token`, `VAULT_TOKEN` or `token` in the config"
    ))?;

    Ok(VaultClient::new(
        config.vault_addr.clone(),
        token,
        config.kv_version,
        config.retries,
    ))
}
