use std::collections::{BTreeMap, HashSet};

use api::FileMode;
use console::style;
use kvscribe::config::Config;
use rootcause::{Report, bail};

#[derive(Debug, Default, PartialEq, Eq)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

fn inspect(config: &Config) -> Findings {
    let mut findings = Findings::default();
    let mut keys = HashSet::new();
    let mut json_modes: BTreeMap<_, (&str, FileMode)> = BTreeMap::new();

    for request in &config.secrets {
        if request.key.is_empty() {
            findings.errors.push("secret with an empty key".to_owned());
        } else if !keys.insert(request.key.as_str()) {
            findings
                .errors
                .push(format!("key {:?} is used more than once", request.key));
        }

        let mode = match request.file_mode() {
            Ok(mode) => Some(mode),
            Err(err) => {
                findings.errors.push(format!(
                    "mode {:?} of key {:?}: {err}",
                    request.mode, request.key
                ));
                None
            }
        };

        if request.fields.is_empty() && request.json_output().is_none() {
            findings
                .warnings
                .push(format!("key {:?} does not write any file", request.key));
        }

        if let (Some(output), Some(mode)) = (request.json_output(), mode) {
            let (first_key, first_mode) = *json_modes
                .entry(output)
                .or_insert((request.key.as_str(), mode));
            if first_mode != mode {
                findings.warnings.push(format!(
                    "{} uses mode {first_mode} of key {first_key:?}, {mode} of key {:?} is ignored",
                    output.display(),
                    request.key
                ));
            }
        }
    }

    for aws in &config.aws {
        if let Err(err) = aws.mode.parse::<FileMode>() {
            findings.errors.push(format!(
                "mode {:?} of AWS profile {:?}: {err}",
                aws.mode, aws.profile
            ));
        }
    }

    findings
}

pub fn check(config: &Config) -> Result<(), Report> {
    let findings = inspect(config);

    println!("{}", style("Config:").underlined());
    println!("  vault:   {}", config.vault_addr);
    println!("  secrets: {}", config.secrets.len());
    println!("  aws:     {}", config.aws.len());

    for warning in &findings.warnings {
        println!("{} {warning}", style("warning:").yellow().bold());
    }
    for error in &findings.errors {
        println!("{} {error}", style("error:").red().bold());
    }

    if !findings.errors.is_empty() {
        bail!("Found {} errors in the config", findings.errors.len());
    }
    println!("{}", style("Config is valid").green());
    Ok(())
}
