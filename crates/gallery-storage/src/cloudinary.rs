use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::{BlobStorage, StorageError, StoredBlob};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Upper bound on any round trip to the provider. A hung upstream
/// surfaces as a transport error, never an indefinite block.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Cloudinary image API client. Authenticated calls carry a SHA-1
/// signature over the alphabetically ordered parameters with the API
/// secret appended, per the provider's signing contract.
pub struct Cloudinary {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResult {
    result: String,
}

impl Cloudinary {
    pub fn new(config: CloudinaryConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", API_BASE, self.config.cloud_name, action)
    }
}

#[async_trait]
impl BlobStorage for Cloudinary {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        bytes: Bytes,
    ) -> Result<StoredBlob, StorageError> {
        let timestamp = unix_timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let form = Form::new()
            .text("folder", folder.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .part("file", Part::bytes(bytes.to_vec()).file_name(filename.to_string()));

        let resp = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("Blob upload rejected with {}: {}", status, body);
            return Err(StorageError::Rejected(format!(
                "upload failed with {status}: {body}"
            )));
        }

        let result: UploadResult = resp.json().await?;
        debug!("Uploaded blob {} to folder {}", result.public_id, folder);

        Ok(StoredBlob {
            src: result.secure_url,
            public_id: result.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
        let timestamp = unix_timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let resp = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", &timestamp),
                ("api_key", &self.config.api_key),
                ("signature", &signature),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("Blob destroy rejected with {}: {}", status, body);
            return Err(StorageError::Rejected(format!(
                "destroy failed with {status}: {body}"
            )));
        }

        let result: DestroyResult = resp.json().await?;
        destroy_outcome(&result.result)
    }
}

/// Map the provider's destroy verdict. "not found" counts as success:
/// a crash between blob and record deletion can leave a record whose
/// blob is already gone, and retrying that delete must still succeed.
fn destroy_outcome(result: &str) -> Result<(), StorageError> {
    match result {
        "ok" => Ok(()),
        "not found" => {
            warn!("Blob already absent on destroy");
            Ok(())
        }
        other => Err(StorageError::Rejected(format!(
            "destroy returned {other:?}"
        ))),
    }
}

/// SHA-1 hex over `key=value` pairs sorted by key, joined with `&`,
/// with the API secret appended.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let canonical = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(canonical.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_order_independent() {
        let a = sign_params(&[("folder", "u1"), ("timestamp", "1700000000")], "secret");
        let b = sign_params(&[("timestamp", "1700000000"), ("folder", "u1")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40); // SHA-1 hex digest
    }

    #[test]
    fn signature_depends_on_secret_and_params() {
        let base = sign_params(&[("public_id", "p"), ("timestamp", "1")], "secret");
        assert_ne!(base, sign_params(&[("public_id", "p"), ("timestamp", "1")], "other"));
        assert_ne!(base, sign_params(&[("public_id", "q"), ("timestamp", "1")], "secret"));
    }

    #[test]
    fn destroy_tolerates_missing_blob() {
        assert!(destroy_outcome("ok").is_ok());
        assert!(destroy_outcome("not found").is_ok());
        assert!(destroy_outcome("invalid signature").is_err());
    }
}
