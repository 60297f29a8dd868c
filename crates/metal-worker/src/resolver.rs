//! Device → private management CIDR resolution.

use metal_cloud::DeviceReader;
use metal_common::{Error, Result};

/// Resolve the private management IPv4 parent CIDR for a device.
///
/// Selects the first address that is private, management, and IPv4. Returns
/// `None` when no such address exists yet (the device may still be
/// provisioning). A matching address whose parent block lacks a network or
/// prefix is an inventory error: waiting will not produce the data, the
/// provider-side inventory has to be fixed.
pub async fn resolve_private_network(
    devices: &dyn DeviceReader,
    device_id: &str,
) -> Result<Option<String>> {
    let device = devices.get_device(device_id).await?;

    for ip in &device.ip_addresses {
        if ip.public || !ip.management || ip.address_family != 4 {
            continue;
        }

        let (network, prefix) = match ip.parent_block.as_ref() {
            Some(parent) => (
                parent.network.as_deref().unwrap_or_default(),
                parent.cidr.unwrap_or_default(),
            ),
            None => ("", 0),
        };

        if network.is_empty() || prefix == 0 {
            return Err(Error::inventory(
                device_id,
                format!("no parent block information for private address {}", ip.address),
            ));
        }

        return Ok(Some(format!("{network}/{prefix}")));
    }

    Ok(None)
}
