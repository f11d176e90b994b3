// AWS s3 Client Setup

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use serde::Deserialize;

/// Default region of the public NOAA buckets
pub const DEFAULT_REGION: &str = "us-east-1";

/// s3 connection settings (`s3:` section of the CLI settings)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    pub region: String,
    /// Custom endpoint (e.g. an s3-compatible test server); implies path-style addressing
    pub endpoint_url: Option<String>,
    /// Unsigned requests for public buckets
    pub anonymous: bool,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            anonymous: false,
        }
    }
}

/// Create an s3 client for `profile_name` (default credential chain when `None`)
pub async fn create_client(settings: &S3Settings, profile_name: Option<&str>) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()));

    if let Some(profile_name) = profile_name {
        loader = loader.profile_name(profile_name);
    }
    if settings.anonymous {
        loader = loader.no_credentials();
    }

    let shared = loader.load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&shared);
    if let Some(endpoint_url) = &settings.endpoint_url {
        builder = builder.endpoint_url(endpoint_url).force_path_style(true);
    }

    Client::from_conf(builder.build())
}
