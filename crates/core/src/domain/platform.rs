// Remote platforms supported by the fetch application

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Amazon Web Services s3 buckets
    AwsS3,
    /// NOAA High Performance Storage System (tape archive)
    NoaaHpss,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::AwsS3, Platform::NoaaHpss];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::AwsS3 => "aws_s3",
            Platform::NoaaHpss => "noaa_hpss",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws_s3" => Ok(Platform::AwsS3),
            "noaa_hpss" => Ok(Platform::NoaaHpss),
            _ => Err(DomainError::UnsupportedPlatform(s.to_string())),
        }
    }
}
