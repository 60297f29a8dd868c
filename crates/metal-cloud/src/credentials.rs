//! Provider credentials from the well-known cloud provider secret.

use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};

use metal_common::{Error, Result, API_TOKEN_KEY, PROJECT_ID_KEY};

/// Equinix Metal credentials.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// API token used to authenticate device lookups
    pub api_token: String,
    /// Project id the cluster's devices belong to
    pub project_id: String,
}

impl Credentials {
    /// Read credentials from a secret in the given namespace
    pub async fn from_secret(client: &Client, namespace: &str, name: &str) -> Result<Self> {
        let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
        let secret = secrets.get(name).await?;
        Self::from_secret_data(&secret)
    }

    /// Extract and validate credentials from secret data
    pub fn from_secret_data(secret: &Secret) -> Result<Self> {
        let data = secret
            .data
            .as_ref()
            .ok_or_else(|| Error::credentials("cloud provider secret has no data"))?;

        let api_token = secret_field(data, API_TOKEN_KEY)?;
        if api_token.is_empty() {
            return Err(Error::credentials("api token is empty"));
        }

        let project_id = secret_field(data, PROJECT_ID_KEY)?;

        Ok(Self {
            api_token,
            project_id,
        })
    }
}

fn secret_field(
    data: &std::collections::BTreeMap<String, k8s_openapi::ByteString>,
    key: &str,
) -> Result<String> {
    let bytes = data
        .get(key)
        .ok_or_else(|| Error::credentials(format!("secret is missing key {key}")))?;

    String::from_utf8(bytes.0.clone())
        .map(|s| s.trim().to_string())
        .map_err(|_| Error::credentials(format!("secret key {key} is not valid UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn secret_with(entries: &[(&str, &str)]) -> Secret {
        let data: BTreeMap<String, ByteString> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
            .collect();
        Secret {
            data: Some(data),
            ..Default::default()
        }
    }

    #[test]
    fn extracts_and_trims_credentials() {
        let secret = secret_with(&[(API_TOKEN_KEY, "token-abc \n"), (PROJECT_ID_KEY, "proj-1")]);
        let creds = Credentials::from_secret_data(&secret).unwrap();
        assert_eq!(creds.api_token, "token-abc");
        assert_eq!(creds.project_id, "proj-1");
    }

    #[test]
    fn rejects_missing_token() {
        let secret = secret_with(&[(PROJECT_ID_KEY, "proj-1")]);
        let err = Credentials::from_secret_data(&secret).unwrap_err();
        assert!(err.to_string().contains(API_TOKEN_KEY));
    }

    #[test]
    fn rejects_empty_token() {
        let secret = secret_with(&[(API_TOKEN_KEY, "  "), (PROJECT_ID_KEY, "proj-1")]);
        assert!(Credentials::from_secret_data(&secret).is_err());
    }

    #[test]
    fn rejects_secret_without_data() {
        let secret = Secret::default();
        assert!(Credentials::from_secret_data(&secret).is_err());
    }
}
