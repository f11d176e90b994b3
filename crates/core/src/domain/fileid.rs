// File identifier attributes from the experiment configuration

use serde::{Deserialize, Serialize};

use super::timestamps::{OffsetSchedule, StreamWindow};

/// One `fetch.<platform>.<fetch_type>.<fileid>` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileId {
    /// Populated from the YAML key, not the block body
    #[serde(skip)]
    pub name: String,

    /// s3 bucket, or HPSS base directory
    #[serde(default)]
    pub bucket: Option<String>,

    /// Remote path template
    pub object_path: String,

    /// Local path template
    pub local_path: String,

    #[serde(default)]
    pub profile_name: Option<String>,

    #[serde(flatten)]
    pub schedule: OffsetSchedule,

    #[serde(flatten)]
    pub window: StreamWindow,

    /// Concatenate every fetched file into this path (rendered at the cycle)
    #[serde(default)]
    pub concat_path: Option<String>,

    #[serde(default)]
    pub ignore_missing: bool,
}

impl FileId {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_block() {
        let yaml = r#"
bucket: noaa-gfs-bdp-pds
object_path: gdas.%Y%m%d/%H/atmos/gdas.t%Hz.prepbufr
local_path: /work/obs/gdas.t%Hz.prepbufr
profile_name: default
offset_seconds: [0]
offset_start_seconds: -21600
offset_stop_seconds: 0
offset_interval_seconds: 21600
valid_start: 20000101000000
concat_path: /work/obs/prepbufr.cat
ignore_missing: true
"#;
        let fileid: FileId = serde_yaml::from_str(yaml).unwrap();
        let fileid = fileid.with_name("prepbufr");

        assert_eq!(fileid.name, "prepbufr");
        assert_eq!(fileid.bucket.as_deref(), Some("noaa-gfs-bdp-pds"));
        assert_eq!(fileid.schedule.offsets, vec![0]);
        assert_eq!(fileid.schedule.interval, Some(21600));
        assert_eq!(fileid.window.start.unwrap().to_string(), "20000101000000");
        assert!(fileid.window.stop.is_none());
        assert!(fileid.ignore_missing);
    }

    #[test]
    fn test_minimal_block_defaults() {
        let yaml = "object_path: a/b.nc\nlocal_path: /tmp/b.nc\n";
        let fileid: FileId = serde_yaml::from_str(yaml).unwrap();
        assert!(fileid.schedule.is_empty());
        assert!(fileid.concat_path.is_none());
        assert!(!fileid.ignore_missing);
    }

    #[test]
    fn test_missing_local_path_is_rejected() {
        let yaml = "object_path: a/b.nc\n";
        assert!(serde_yaml::from_str::<FileId>(yaml).is_err());
    }
}
