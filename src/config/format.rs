//! Support for loading forwarder specs from multiple formats.

#![deny(missing_docs, missing_debug_implementations)]

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de;
use snafu::{ResultExt, Snafu};

use super::ForwarderSpec;

/// A type alias to better capture the semantics.
pub type FormatHint = Option<Format>;

/// The format used to represent the forwarder spec.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Format {
    /// TOML format is used.
    #[default]
    Toml,
    /// JSON format is used.
    Json,
    /// YAML format is used.
    Yaml,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "toml" => Ok(Format::Toml),
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(format!("Invalid format: {}", s)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let format = match self {
            Format::Toml => "toml",
            Format::Json => "json",
            Format::Yaml => "yaml",
        };
        write!(f, "{}", format)
    }
}

impl Format {
    /// Obtain the format from the file path using extension as a hint.
    pub fn from_path<T: AsRef<Path>>(path: T) -> Result<Self, T> {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(path),
        }
    }
}

/// Errors raised while loading a forwarder spec.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FormatError {
    /// The file could not be read.
    #[snafu(display("Could not read {:?}: {}", path, source))]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Neither the extension nor a hint named a format.
    #[snafu(display("Could not detect the format of {:?}, pass one explicitly.", path))]
    UnknownFormat {
        /// File being read.
        path: PathBuf,
    },
    /// The content did not match the expected shape.
    #[snafu(display("Invalid {} document: {}", format, message))]
    Parse {
        /// Format the content was parsed as.
        format: Format,
        /// Parser message.
        message: String,
    },
}

/// Parse the string represented in the specified format.
pub fn deserialize<T>(content: &str, format: Format) -> Result<T, FormatError>
where
    T: de::DeserializeOwned,
{
    let result = match format {
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };
    result.map_err(|message| FormatError::Parse { format, message })
}

/// Load a forwarder spec from `path`, detecting the format from its extension
/// unless `hint` names one.
pub fn load_from_path(path: &Path, hint: FormatHint) -> Result<ForwarderSpec, FormatError> {
    let format = match hint {
        Some(format) => format,
        None => Format::from_path(path).map_err(|path| FormatError::UnknownFormat {
            path: path.to_path_buf(),
        })?,
    };
    let content = std::fs::read_to_string(path).context(ReadSnafu { path })?;
    debug!(message = "Loading forwarder spec.", path = ?path, %format);
    deserialize(&content, format)
}
