//! Wire types for the device-get endpoint (the subset of fields consumed).

use serde::{Deserialize, Serialize};

/// A bare-metal device as returned by the device-get endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Device {
    /// Device id
    pub id: String,

    /// Interface addresses; parent blocks are present when the request
    /// included the expansion directive
    #[serde(default)]
    pub ip_addresses: Vec<IpAddress>,
}

/// One address on a device interface.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IpAddress {
    /// The address itself
    #[serde(default)]
    pub address: String,

    /// Whether the address is publicly routable
    #[serde(default)]
    pub public: bool,

    /// Whether the address belongs to the provider's management network
    #[serde(default)]
    pub management: bool,

    /// 4 or 6
    #[serde(default)]
    pub address_family: i32,

    /// The CIDR-level block this address belongs to
    #[serde(default)]
    pub parent_block: Option<ParentBlock>,
}

/// The network block a specific address belongs to.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ParentBlock {
    /// Network address of the block
    #[serde(default)]
    pub network: Option<String>,

    /// Prefix length of the block
    #[serde(default)]
    pub cidr: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_device_response_subset() {
        // Representative excerpt of a device-get response with the
        // parent_block expansion applied
        let body = serde_json::json!({
            "id": "a1b2c3",
            "hostname": "worker-0",
            "ip_addresses": [
                {
                    "address": "147.75.1.2",
                    "public": true,
                    "management": true,
                    "address_family": 4
                },
                {
                    "address": "10.80.0.3",
                    "public": false,
                    "management": true,
                    "address_family": 4,
                    "parent_block": {"network": "10.80.0.0", "cidr": 25}
                }
            ]
        });

        let device: Device = serde_json::from_value(body).unwrap();
        assert_eq!(device.id, "a1b2c3");
        assert_eq!(device.ip_addresses.len(), 2);

        let private = &device.ip_addresses[1];
        assert!(!private.public);
        let parent = private.parent_block.as_ref().unwrap();
        assert_eq!(parent.network.as_deref(), Some("10.80.0.0"));
        assert_eq!(parent.cidr, Some(25));
    }

    #[test]
    fn tolerates_missing_parent_block() {
        let body = serde_json::json!({"id": "x", "ip_addresses": [{"address": "10.0.0.1"}]});
        let device: Device = serde_json::from_value(body).unwrap();
        assert!(device.ip_addresses[0].parent_block.is_none());
    }
}
