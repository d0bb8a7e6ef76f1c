use crate::error::ManifestError;
use std::fmt;
use std::fs;
use std::path::Path;

pub const SERIES_KEY: &str = "ListOfSeriesToDownload";
pub const RETRY_KEY: &str = "noOfrRetry";

/// A parsed `.tcia` manifest.
///
/// Lines of the form `key=value` start an entry; following non-empty lines
/// without `=` are appended to the current entry's values. Entry order is
/// preserved so the manifest can be written back out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: Vec<(String, Vec<String>)>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.is_file() {
            return Err(ManifestError::NotAFile(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut manifest = Manifest::default();
        let mut current: Option<usize> = None;

        for line in content.lines() {
            let line = line.trim();
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim();
                let values = if value.is_empty() {
                    Vec::new()
                } else {
                    vec![value.to_string()]
                };
                current = Some(manifest.set(key.trim(), values));
            } else if let (Some(idx), false) = (current, line.is_empty()) {
                manifest.entries[idx].1.push(line.to_string());
            }
        }

        manifest
    }

    /// Insert or replace `key`, returning its position
    fn set(&mut self, key: &str, values: Vec<String>) -> usize {
        match self.entries.iter().position(|(k, _)| k == key) {
            Some(idx) => {
                self.entries[idx].1 = values;
                idx
            }
            None => {
                self.entries.push((key.to_string(), values));
                self.entries.len() - 1
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn series_ids(&self) -> &[String] {
        self.get(SERIES_KEY).unwrap_or(&[])
    }

    /// Retry bound declared by the manifest, if any
    pub fn retries(&self) -> Result<Option<u32>, ManifestError> {
        match self.get(RETRY_KEY).and_then(|v| v.first()) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<u32>()
                .map(Some)
                .map_err(|_| ManifestError::InvalidValue {
                    key: RETRY_KEY.to_string(),
                    value: raw.clone(),
                }),
        }
    }

    /// Same header entries, with the series list replaced
    pub fn with_series<I, S>(&self, series: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut manifest = self.clone();
        manifest.set(SERIES_KEY, series.into_iter().map(Into::into).collect());
        manifest
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, values) in &self.entries {
            match values.as_slice() {
                [single] => writeln!(f, "{}={}", key, single)?,
                many => {
                    writeln!(f, "{}=", key)?;
                    for value in many {
                        writeln!(f, "{}", value)?;
                    }
                }
            }
        }
        Ok(())
    }
}
