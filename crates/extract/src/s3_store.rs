// crates/extract/src/s3_store.rs
use crate::store::ObjectStore;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use common::{Error, Result, S3Credentials};

const CREDENTIALS_PROVIDER: &str = "etl-connector";

/// Service error codes that mean the store rejected who we are
const AUTHORIZATION_CODES: &[&str] = &[
    "AccessDenied",
    "AllAccessDisabled",
    "AuthorizationHeaderMalformed",
    "ExpiredToken",
    "InvalidAccessKeyId",
    "InvalidToken",
    "SignatureDoesNotMatch",
];

const NOT_FOUND_CODES: &[&str] = &["NoSuchBucket", "NoSuchKey", "NotFound"];

/// `ObjectStore` backed by the AWS SDK S3 client
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from explicit credentials. Nothing is read from the
    /// environment or profile files, and no request is sent.
    pub fn connect(
        credentials: &S3Credentials,
        endpoint: &str,
        region: &str,
        force_path_style: bool,
    ) -> Self {
        let config = sdk_config(credentials, endpoint, region, force_path_style).build();
        Self::new(Client::from_conf(config))
    }
}

fn sdk_config(
    credentials: &S3Credentials,
    endpoint: &str,
    region: &str,
    force_path_style: bool,
) -> aws_sdk_s3::config::Builder {
    let credentials = Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        None,
        None,
        CREDENTIALS_PROVIDER,
    );

    aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .endpoint_url(endpoint)
        .credentials_provider(credentials)
        .force_path_style(force_path_style)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(e, &format!("list s3://{}/{}", bucket, prefix)))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .map(str::to_string),
            );

            match (response.is_truncated(), response.next_continuation_token()) {
                (Some(true), Some(token)) => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let context = format!("get s3://{}/{}", bucket, key);
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &context))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Connectivity(format!("{}: {}", context, e)))?;

        Ok(body.into_bytes())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &format!("put s3://{}/{}", bucket, key)))?;

        Ok(())
    }
}

/// Map an SDK failure onto the crate's error kinds
fn classify_sdk_error<E, R>(err: SdkError<E, R>, context: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{}: {}", context, DisplayErrorContext(&err));
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
            Error::Connectivity(message)
        }
        SdkError::ServiceError(service) => classify_service_code(service.err().code(), message),
        _ => Error::Store(message),
    }
}

fn classify_service_code(code: Option<&str>, message: String) -> Error {
    match code {
        Some(code) if AUTHORIZATION_CODES.contains(&code) => Error::Authorization(message),
        Some(code) if NOT_FOUND_CODES.contains(&code) => Error::NotFound(message),
        _ => Error::Store(message),
    }
}
