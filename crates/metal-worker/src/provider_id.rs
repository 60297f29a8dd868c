//! Device id extraction from a node's providerID.

use metal_common::{Error, Result, DEPRECATED_PROVIDER_NAME, PROVIDER_NAME};

/// Extract a device id from a node's `spec.providerID`.
///
/// Accepted forms are `equinixmetal://<id>`, the deprecated `packet://<id>`,
/// and a bare `<id>`. An empty providerID or a foreign scheme yields `None`
/// so the node is skipped for the cycle rather than failing it; only a
/// string with more than one `://` separator is malformed.
pub fn device_id_from_provider_id(provider_id: &str) -> Result<Option<String>> {
    if provider_id.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = provider_id.split("://").collect();
    match parts.as_slice() {
        [id] => Ok(Some((*id).to_string())),
        [scheme, id] => {
            if *scheme == PROVIDER_NAME || *scheme == DEPRECATED_PROVIDER_NAME {
                Ok(Some((*id).to_string()))
            } else {
                Ok(None)
            }
        }
        _ => Err(Error::provider_id(format!(
            "unexpected providerID format: {provider_id}, \
             expected 'device-id' or 'equinixmetal://device-id'"
        ))),
    }
}
