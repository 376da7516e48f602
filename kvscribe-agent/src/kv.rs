//! Writes fetched key/value secrets into files.
//!
//! Writing happens in two passes:
//! 1. [`write_fields`] walks the requests in order, writes every requested field into its own
//!    file and remembers which requests also go into a JSON file.
//! 2. [`dump_json`] merges the data of every request sharing a JSON file and writes it once.
//!
//! The first error stops everything. Files written up to that point stay on disk but are
//! registered with the [`Scrubber`]

use std::{
    borrow::Cow,
    collections::{BTreeMap, btree_map::Entry},
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use api::{FileMode, FileModeError, SecretRequest, Secrets};
use serde_json::Value;

use crate::{files, observer::Observer, scrub::Scrubber};

#[derive(thiserror::Error, Debug)]
pub enum KvError {
    #[error("could not parse file mode {mode:?} for key {key:?}")]
    InvalidMode {
        key: String,
        mode: String,
        #[source]
        source: FileModeError,
    },
    #[error("field {field:?} not found in secret with key {key:?}")]
    MissingField { field: String, key: String },
    #[error("could not write secret to {}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not encode secrets for {}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("the secret key {key:?} causes there to be a duplicate in the file {}", .filename.display())]
    DuplicateKey { key: String, filename: PathBuf },
}

type Result<T> = core::result::Result<T, KvError>;

/// A JSON file and every request contributing to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonTarget<'a> {
    /// Mode of the first request naming this file. Later requests do not change it
    pub mode: FileMode,
    pub requests: Vec<&'a SecretRequest>,
}

/// Sorted by filename so JSON files are always written in the same order
pub type JsonTargets<'a> = BTreeMap<PathBuf, JsonTarget<'a>>;

/// Runs both passes
pub fn write_kv_output(
    requests: &[SecretRequest],
    secrets: &Secrets,
    observer: &impl Observer,
    scrubber: &mut impl Scrubber,
) -> Result<()> {
    let targets = write_fields(requests, secrets, observer, scrubber)?;
    dump_json(&targets, secrets, observer, scrubber)
}

pub fn write_fields<'a>(
    requests: &'a [SecretRequest],
    secrets: &Secrets,
    observer: &impl Observer,
    scrubber: &mut impl Scrubber,
) -> Result<JsonTargets<'a>> {
    let mut targets = JsonTargets::new();

    for request in requests {
        let mode = request
            .file_mode()
            .map_err(|source| KvError::InvalidMode {
                key: request.key.clone(),
                mode: request.mode.clone(),
                source,
            })?;

        let data = secrets.get(&request.key);

        for field in &request.fields {
            let Some(value) = data
                .and_then(|data| data.get(&field.name))
                .and_then(render_value)
            else {
                if !request.missing_ok {
                    return Err(KvError::MissingField {
                        field: field.name.clone(),
                        key: request.key.clone(),
                    });
                }
                observer.warn(&format!(
                    "Field {:?} not found in secret with key {:?}, but missingOk is set, so {} will not be written.",
                    field.name,
                    request.key,
                    field.output.display()
                ));
                continue;
            };

            observer.info(&format!(
                "Writing field {:?} of secret with key {:?} to {}",
                field.name,
                request.key,
                field.output.display()
            ));
            write_file(&field.output, mode, value.as_bytes(), scrubber)?;
        }

        if let Some(output) = request.json_output() {
            targets
                .entry(output.to_path_buf())
                .or_insert_with(|| JsonTarget {
                    mode,
                    requests: Vec::new(),
                })
                .requests
                .push(request);
        }
    }

    Ok(targets)
}

pub fn dump_json(
    targets: &JsonTargets<'_>,
    secrets: &Secrets,
    observer: &impl Observer,
    scrubber: &mut impl Scrubber,
) -> Result<()> {
    for (filename, target) in targets {
        observer.info(&format!("Creating JSON secrets file {}", filename.display()));

        let mut file = files::open_for_write(filename, target.mode).map_err(|source| {
            KvError::FileWrite {
                path: filename.clone(),
                source,
            }
        })?;
        scrubber.register(filename);

        let data = collect_secrets(filename, &target.requests, secrets, observer)?;

        // an empty mapping leaves the file empty instead of writing `{}`
        if data.is_empty() {
            continue;
        }

        let encoded = serde_json::to_vec(&data).map_err(|source| KvError::Encode {
            path: filename.clone(),
            source,
        })?;
        file.write_all(&encoded)
            .map_err(|source| KvError::FileWrite {
                path: filename.clone(),
                source,
            })?;
    }

    Ok(())
}

/// Merges the data of `requests` into one mapping. A key showing up twice is an error
pub fn collect_secrets(
    filename: &Path,
    requests: &[&SecretRequest],
    secrets: &Secrets,
    observer: &impl Observer,
) -> Result<BTreeMap<String, Value>> {
    let mut data = BTreeMap::new();

    for request in requests {
        observer.info(&format!(
            "Adding secrets from {:?} into {}",
            request.key,
            filename.display()
        ));
        let Some(fields) = secrets.get(&request.key) else {
            continue;
        };

        for (field, value) in fields {
            let key = if request.use_key_as_prefix {
                format!("{}_{field}", request.key)
            } else {
                field.clone()
            };

            match data.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(KvError::DuplicateKey {
                        key: entry.key().clone(),
                        filename: filename.to_path_buf(),
                    });
                }
                Entry::Vacant(entry) => {
                    observer.debug(&format!("Writing key {:?}", entry.key()));
                    entry.insert(value.clone());
                }
            }
        }
    }

    Ok(data)
}

/// Strings are written as is, `null` counts as missing and everything else is written as JSON
fn render_value(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(value) => Some(Cow::Borrowed(value.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

fn write_file(
    path: &Path,
    mode: FileMode,
    content: &[u8],
    scrubber: &mut impl Scrubber,
) -> Result<()> {
    let file_err = |source| KvError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut file = files::open_for_write(path, mode).map_err(file_err)?;
    scrubber.register(path);
    file.write_all(content).map_err(file_err)
}
