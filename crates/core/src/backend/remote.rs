//! Remote object-store adapter built on Apache OpenDAL.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use opendal::{ErrorKind, Operator, services};
use stowage_shared::{AccessPolicy, RemoteProvider};

use super::adapter::{BackendAdapter, SignedUrl, UrlExpiry};
use super::error::BackendError;
use crate::attachment::StagedPayload;
use crate::keys::ObjectKey;

/// Object storage within a bucket namespace (S3-compatible or Azure Blob).
///
/// Remote stores lack atomic rename, so `rename` is copy-then-delete.
/// The access flag governs URL issuance: `public_read` objects are
/// addressable by a plain URL, everything else goes through signed URLs.
pub struct RemoteObjectAdapter {
    operator: Operator,
    provider: RemoteProvider,
    prefix: Option<String>,
    acl: AccessPolicy,
}

impl RemoteObjectAdapter {
    /// Create an adapter from provider parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the OpenDAL operator cannot be initialized.
    pub fn from_provider(
        provider: RemoteProvider,
        prefix: Option<String>,
        acl: AccessPolicy,
    ) -> Result<Self, BackendError> {
        let operator = Self::create_operator(&provider)?;
        Ok(Self {
            operator,
            provider,
            prefix,
            acl,
        })
    }

    /// Create an OpenDAL operator from provider config.
    fn create_operator(provider: &RemoteProvider) -> Result<Operator, BackendError> {
        match provider {
            RemoteProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Ok(Operator::new(builder)
                    .map_err(|e| BackendError::configuration(e.to_string()))?
                    .finish())
            }
            RemoteProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Ok(Operator::new(builder)
                    .map_err(|e| BackendError::configuration(e.to_string()))?
                    .finish())
            }
        }
    }

    /// The configured access flag.
    #[must_use]
    pub fn access_policy(&self) -> AccessPolicy {
        self.acl
    }

    /// The bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.provider.bucket()
    }

    fn object_path(&self, key: &ObjectKey) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{}", key.path),
            None => key.path.clone(),
        }
    }
}

#[async_trait]
impl BackendAdapter for RemoteObjectAdapter {
    fn kind(&self) -> &'static str {
        "remote"
    }

    async fn store(&self, key: &ObjectKey, payload: &StagedPayload) -> Result<(), BackendError> {
        self.operator
            .write_with(&self.object_path(key), payload.bytes())
            .content_type(payload.content_type())
            .await
            .map_err(BackendError::from)?;
        Ok(())
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Bytes, BackendError> {
        let buffer = self
            .operator
            .read(&self.object_path(key))
            .await
            .map_err(BackendError::from)?;
        Ok(buffer.to_bytes())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), BackendError> {
        self.operator
            .delete(&self.object_path(key))
            .await
            .map_err(BackendError::from)
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, BackendError> {
        match self.operator.stat(&self.object_path(key)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, old: &ObjectKey, new: &ObjectKey) -> Result<(), BackendError> {
        // No atomic rename on object stores: copy, then delete the source.
        let source = self.object_path(old);
        let target = self.object_path(new);
        self.operator
            .copy(&source, &target)
            .await
            .map_err(BackendError::from)?;
        self.operator
            .delete(&source)
            .await
            .map_err(BackendError::from)
    }

    fn location(&self, key: &ObjectKey) -> String {
        format!("{}/{}", self.bucket(), self.object_path(key))
    }

    fn public_url(&self, key: &ObjectKey) -> Result<String, BackendError> {
        if self.acl != AccessPolicy::PublicRead {
            return Err(BackendError::unsupported("public_url"));
        }
        let path = self.object_path(key);
        match &self.provider {
            RemoteProvider::S3 {
                endpoint, bucket, ..
            } => Ok(format!("{endpoint}/{bucket}/{path}")),
            RemoteProvider::AzureBlob {
                account, container, ..
            } => Ok(format!(
                "https://{account}.blob.core.windows.net/{container}/{path}"
            )),
        }
    }

    async fn signed_url(
        &self,
        key: &ObjectKey,
        expiry: UrlExpiry,
    ) -> Result<SignedUrl, BackendError> {
        let now = Utc::now();
        let presigned = self
            .operator
            .presign_read(&self.object_path(key), expiry.ttl_from(now))
            .await
            .map_err(BackendError::from)?;

        Ok(SignedUrl {
            url: presigned.uri().to_string(),
            method: presigned.method().to_string(),
            expires_at: expiry.expires_at_from(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn s3_provider() -> RemoteProvider {
        RemoteProvider::s3(
            "https://account.r2.cloudflarestorage.com",
            "attachments",
            "access_key",
            "secret_key",
            "auto",
        )
    }

    fn key() -> ObjectKey {
        ObjectKey::derive(
            "documents",
            None,
            Uuid::parse_str("6ba7b811-9dad-11d1-80b4-00c04fd430c8").expect("valid uuid"),
            "invoice.pdf",
            None,
        )
    }

    #[test]
    fn test_from_provider_s3() {
        let adapter =
            RemoteObjectAdapter::from_provider(s3_provider(), None, AccessPolicy::Private)
                .expect("adapter");
        assert_eq!(adapter.kind(), "remote");
        assert_eq!(adapter.bucket(), "attachments");
        assert_eq!(adapter.access_policy(), AccessPolicy::Private);
    }

    #[test]
    fn test_from_provider_azure() {
        let provider = RemoteProvider::azure_blob("stowagedev", "access_key", "attachments");
        let adapter = RemoteObjectAdapter::from_provider(provider, None, AccessPolicy::Private)
            .expect("adapter");
        assert_eq!(adapter.bucket(), "attachments");
    }

    #[test]
    fn test_object_path_prefixing() {
        let adapter = RemoteObjectAdapter::from_provider(
            s3_provider(),
            Some("uploads".to_string()),
            AccessPolicy::Private,
        )
        .expect("adapter");
        let key = key();
        assert_eq!(adapter.object_path(&key), format!("uploads/{}", key.path));
        assert_eq!(
            adapter.location(&key),
            format!("attachments/uploads/{}", key.path)
        );
    }

    #[test]
    fn test_public_url_requires_public_read() {
        let key = key();

        let private =
            RemoteObjectAdapter::from_provider(s3_provider(), None, AccessPolicy::Private)
                .expect("adapter");
        assert!(matches!(
            private.public_url(&key).unwrap_err(),
            BackendError::Unsupported { .. }
        ));

        let public =
            RemoteObjectAdapter::from_provider(s3_provider(), None, AccessPolicy::PublicRead)
                .expect("adapter");
        assert_eq!(
            public.public_url(&key).expect("url"),
            format!(
                "https://account.r2.cloudflarestorage.com/attachments/{}",
                key.path
            )
        );
    }

    #[test]
    fn test_azure_public_url_shape() {
        let provider = RemoteProvider::azure_blob("stowagedev", "access_key", "attachments");
        let adapter = RemoteObjectAdapter::from_provider(provider, None, AccessPolicy::PublicRead)
            .expect("adapter");
        let key = key();
        assert_eq!(
            adapter.public_url(&key).expect("url"),
            format!(
                "https://stowagedev.blob.core.windows.net/attachments/{}",
                key.path
            )
        );
    }
}
