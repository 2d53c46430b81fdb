//! cpal-based audio backend implementation.
//!
//! This module provides [`CpalBackend`], the default [`DeviceBackend`]
//! implementation that wraps [cpal](https://crates.io/crates/cpal) for
//! cross-platform audio I/O. It supports ALSA (Linux), CoreAudio
//! (macOS/iOS), WASAPI (Windows), Oboe (Android), and WebAudio (WASM).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lazo_io::{CpalBackend, DeviceBackend, EndpointConfig};
//!
//! let backend = CpalBackend::new();
//! let devices = backend.list_devices()?;
//!
//! let config = EndpointConfig::default();
//! let stream = backend.build_render_stream(
//!     &config,
//!     Box::new(|buffer: &mut [f32]| {
//!         // Fill buffer with audio...
//!         buffer.fill(0.0);
//!     }),
//!     Box::new(|err| eprintln!("Audio error: {}", err)),
//! )?;
//! // Stream plays until `stream` is dropped.
//! ```

use crate::backend::{
    CaptureCallback, DeviceBackend, DeviceInfo, EndpointConfig, ErrorCallback, RenderCallback,
    StreamHandle,
};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host};
use lazo_core::AudioFormat;

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// cpal-based audio backend.
///
/// Wraps the cpal library to provide cross-platform audio device
/// enumeration, format negotiation, and stream construction. This is the
/// default backend used by the duplex engine.
///
/// The backend holds a cpal [`Host`] instance, which represents the
/// connection to the platform's audio system.
pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    /// Create a new cpal backend using the platform's default audio host.
    ///
    /// On Linux this is ALSA, on macOS CoreAudio, on Windows WASAPI.
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::info!(host = host.id().name(), "cpal backend initialized");
        Self { host }
    }

    /// Find a cpal render device by selector, or return the default.
    fn find_render_device(&self, selector: Option<&str>) -> Result<Device> {
        match selector {
            Some(selector) => {
                let devices: Vec<_> = self
                    .host
                    .output_devices()
                    .map_err(|e| Error::Stream(e.to_string()))?
                    .collect();
                find_device_from_list(&devices, selector, "render")
            }
            None => self.host.default_output_device().ok_or(Error::NoDevice),
        }
    }

    /// Find a cpal capture device by selector, or return the default.
    fn find_capture_device(&self, selector: Option<&str>) -> Result<Device> {
        match selector {
            Some(selector) => {
                let devices: Vec<_> = self
                    .host
                    .input_devices()
                    .map_err(|e| Error::Stream(e.to_string()))?
                    .collect();
                find_device_from_list(&devices, selector, "capture")
            }
            None => self.host.default_input_device().ok_or(Error::NoDevice),
        }
    }
}

/// Find a device from a list by index, exact name, or fuzzy match.
fn find_device_from_list(devices: &[Device], selector: &str, role: &str) -> Result<Device> {
    // Try parsing as index first
    if let Ok(index) = selector.parse::<usize>() {
        return devices.get(index).cloned().ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "{} device index {} (only {} devices available)",
                role,
                index,
                devices.len()
            ))
        });
    }

    // Try exact match
    for device in devices {
        if device_name(device).is_ok_and(|n| n == selector) {
            return Ok(device.clone());
        }
    }

    // Try case-insensitive partial match
    let search_lower = selector.to_lowercase();
    let mut matches: Vec<_> = devices
        .iter()
        .filter_map(|d| {
            device_name(d).ok().and_then(|name| {
                if name.to_lowercase().contains(&search_lower) {
                    Some((d.clone(), name))
                } else {
                    None
                }
            })
        })
        .collect();

    match matches.len() {
        0 => Err(Error::DeviceNotFound(format!(
            "no {} device matching '{}'",
            role, selector
        ))),
        1 => Ok(matches.remove(0).0),
        _ => {
            let names: Vec<_> = matches.iter().map(|(_, n)| n.as_str()).collect();
            tracing::warn!(
                selector,
                ?names,
                "selector matches multiple devices; using first match"
            );
            Ok(matches.remove(0).0)
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::new();

        // Capture devices
        if let Ok(inputs) = self.host.input_devices() {
            for device in inputs {
                if let Ok(name) = device_name(&device) {
                    let sample_rate = device
                        .default_input_config()
                        .map(|c| c.sample_rate())
                        .unwrap_or(48000);

                    // Check if also a render device
                    let is_render = device.default_output_config().is_ok();

                    devices.push(DeviceInfo {
                        name,
                        is_capture: true,
                        is_render,
                        default_sample_rate: sample_rate,
                    });
                }
            }
        }

        // Render-only devices
        if let Ok(outputs) = self.host.output_devices() {
            for device in outputs {
                if let Ok(name) = device_name(&device) {
                    // Skip if already added as capture
                    if devices.iter().any(|d| d.name == name) {
                        continue;
                    }

                    let sample_rate = device
                        .default_output_config()
                        .map(|c| c.sample_rate())
                        .unwrap_or(48000);

                    devices.push(DeviceInfo {
                        name,
                        is_capture: false,
                        is_render: true,
                        default_sample_rate: sample_rate,
                    });
                }
            }
        }

        Ok(devices)
    }

    fn default_render_device(&self) -> Result<Option<DeviceInfo>> {
        Ok(self.host.default_output_device().and_then(|d| {
            device_name(&d).ok().map(|name| DeviceInfo {
                name,
                is_capture: false,
                is_render: true,
                default_sample_rate: d
                    .default_output_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000),
            })
        }))
    }

    fn default_capture_device(&self) -> Result<Option<DeviceInfo>> {
        Ok(self.host.default_input_device().and_then(|d| {
            device_name(&d).ok().map(|name| DeviceInfo {
                name,
                is_capture: true,
                is_render: false,
                default_sample_rate: d
                    .default_input_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000),
            })
        }))
    }

    fn render_format(&self, device: Option<&str>) -> Result<AudioFormat> {
        let device = self.find_render_device(device)?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::Stream(e.to_string()))?;

        Ok(AudioFormat::new(config.sample_rate(), config.channels(), 32))
    }

    fn capture_format(&self, device: Option<&str>) -> Result<AudioFormat> {
        let device = self.find_capture_device(device)?;
        let config = device
            .default_input_config()
            .map_err(|e| Error::Stream(e.to_string()))?;

        Ok(AudioFormat::new(config.sample_rate(), config.channels(), 32))
    }

    fn build_render_stream(
        &self,
        config: &EndpointConfig,
        mut callback: RenderCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.find_render_device(config.device.as_deref())?;

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_frames),
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback(data);
                },
                move |err| {
                    error_callback(&err.to_string());
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            channels = config.channels,
            sample_rate = config.sample_rate,
            "render stream started"
        );

        Ok(StreamHandle::new(stream))
    }

    fn build_capture_stream(
        &self,
        config: &EndpointConfig,
        mut callback: CaptureCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.find_capture_device(config.device.as_deref())?;

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_frames),
        };

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    callback(data);
                },
                move |err| {
                    error_callback(&err.to_string());
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            channels = config.channels,
            sample_rate = config.sample_rate,
            "capture stream started"
        );

        Ok(StreamHandle::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpal_backend_name() {
        let backend = CpalBackend::new();
        assert_eq!(backend.name(), "cpal");
    }

    #[test]
    fn test_cpal_backend_list_devices() {
        let backend = CpalBackend::new();
        // Should not panic; device availability depends on the system.
        let result = backend.list_devices();
        assert!(result.is_ok());
    }
}
