use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::data_transformers::Compose;
use crate::error::{DatasetError, Result};

fn default_size() -> u32 {
    84
}

/// What the datasets need to know about the run, usually read from a json file:
///
/// ```json
/// {"data_path": "data/blood", "size": 84}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetArgs {
    /// Folder holding one sub folder per split
    pub data_path: PathBuf,
    /// Side of the self supervised views
    #[serde(default = "default_size")]
    pub size: u32,
    /// Replaces the supervised dataset's default pipeline when set
    #[serde(default)]
    pub transform: Option<Compose>,
}

impl DatasetArgs {
    pub fn new<P: AsRef<Path>>(data_path: P) -> DatasetArgs {
        DatasetArgs {
            data_path: data_path.as_ref().to_path_buf(),
            size: default_size(),
            transform: None,
        }
    }

    pub fn with_size(mut self, size: u32) -> DatasetArgs {
        self.size = size;
        self
    }

    pub fn with_transform(mut self, transform: Compose) -> DatasetArgs {
        self.transform = Some(transform);
        self
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<DatasetArgs> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
        let args: DatasetArgs = serde_json::from_reader(BufReader::new(file))?;
        args.validate()?;
        Ok(args)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(DatasetError::InvalidConfig("size must be positive".to_string()));
        }
        if let Some(transform) = &self.transform {
            transform.validate()?;
        }
        Ok(())
    }
}
