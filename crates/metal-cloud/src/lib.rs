//! Equinix Metal device API client
//!
//! A narrow client for the one endpoint this extension consumes: device-get
//! with expanded parent-block fields. The [`DeviceReader`] trait is the seam
//! the worker reconciler is written against, so everything above it is
//! testable without a cloud account.

#![deny(missing_docs)]

pub mod client;
pub mod credentials;
pub mod types;

pub use client::{DeviceReader, MetalClient};
pub use credentials::Credentials;
pub use types::{Device, IpAddress, ParentBlock};
