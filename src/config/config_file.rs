use std::borrow::Cow;
use std::path::{Path, PathBuf};

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::ext::BestEffortPathExt;

const SOURCE_KEY: &str = "source";
const REPLICA_KEY: &str = "replica";
const INTERVAL_KEY: &str = "interval";
const LOG_FILE_KEY: &str = "log_file";

/// Settings read from an optional YAML file. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub interval: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl ConfigFile {
    pub async fn read(path: &Path) -> Result<Self, ConfigFileError> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    fn path_value(
        top_level: &LinkedHashMap<Yaml, Yaml>,
        key: &'static str,
    ) -> Result<Option<PathBuf>, ConfigFileError> {
        match Self::lookup(top_level, key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(PathBuf::from(s)))
                .ok_or(ConfigFileError::InvalidValue {
                    key,
                    expected: "a path string",
                }),
        }
    }

    fn interval_value(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Option<u64>, ConfigFileError> {
        match Self::lookup(top_level, INTERVAL_KEY) {
            None => Ok(None),
            Some(Yaml::Value(Scalar::Integer(seconds))) => u64::try_from(*seconds)
                .map(Some)
                .map_err(|_| ConfigFileError::InvalidValue {
                    key: INTERVAL_KEY,
                    expected: "a non-negative number of seconds",
                }),
            Some(_) => Err(ConfigFileError::InvalidValue {
                key: INTERVAL_KEY,
                expected: "a non-negative number of seconds",
            }),
        }
    }

    fn lookup<'a, 'input>(
        top_level: &'a LinkedHashMap<Yaml<'input>, Yaml<'input>>,
        key: &'static str,
    ) -> Option<&'a Yaml<'input>> {
        top_level
            .get(&Yaml::Value(Scalar::String(Cow::Borrowed(key))))
            .filter(|value| !value.is_null())
    }
}

impl TryFrom<&str> for ConfigFile {
    type Error = ConfigFileError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            return Ok(ConfigFile::default());
        };
        if document.is_null() {
            return Ok(ConfigFile::default());
        }

        let top_level = document
            .as_mapping()
            .ok_or(ConfigFileError::TopLevelNotMap)?;

        for key in top_level.keys() {
            match key.as_str() {
                Some(SOURCE_KEY | REPLICA_KEY | INTERVAL_KEY | LOG_FILE_KEY) => {}
                _ => debug!("Ignoring unknown config key: {:?}", key),
            }
        }

        Ok(ConfigFile {
            source: Self::path_value(top_level, SOURCE_KEY)?,
            replica: Self::path_value(top_level, REPLICA_KEY)?,
            interval: Self::interval_value(top_level)?,
            log_file: Self::path_value(top_level, LOG_FILE_KEY)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigFileError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("The config file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config key '{}' should be {}", key, expected))]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
    },
}
