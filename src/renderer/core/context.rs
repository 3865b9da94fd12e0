//! GPU Context
//!
//! [`GpuContext`] holds the instance, adapter, device and queue. It is created
//! once at startup, either for a window surface or headless for tests and
//! offscreen rendering.

use crate::errors::{PbrError, Result};

/// Sample counts tried, highest first.
const SAMPLE_COUNT_CANDIDATES: [u32; 5] = [16, 8, 4, 2, 1];

/// Core wgpu handles.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Requests an adapter (compatible with `surface` when given) and a device.
    ///
    /// The device is created with the adapter's own limits: the precompute
    /// shaders run 32×32 workgroups, above the WebGPU default of 256
    /// invocations.
    pub async fn new(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
        power_preference: wgpu::PowerPreference,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| PbrError::AdapterRequestFailed(e.to_string()))?;

        let info = adapter.get_info();
        log::info!(
            "Using adapter: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let required_features =
            adapter.features() & wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("PBR Device"),
                required_features,
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Blocking headless context.
    pub fn headless() -> Result<Self> {
        pollster::block_on(Self::new(
            wgpu::Instance::default(),
            None,
            wgpu::PowerPreference::HighPerformance,
        ))
    }

    /// Largest sample count `<= requested` that every format in `formats`
    /// supports as a multisampled render target.
    #[must_use]
    pub fn supported_sample_count(&self, requested: u32, formats: &[wgpu::TextureFormat]) -> u32 {
        if self
            .device
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES)
        {
            pick_sample_count(requested, |count| {
                formats.iter().all(|&format| {
                    self.adapter
                        .get_texture_format_features(format)
                        .flags
                        .sample_count_supported(count)
                })
            })
        } else {
            // Without adapter-specific features WebGPU guarantees 1 and 4.
            pick_sample_count(requested, |count| count == 1 || count == 4)
        }
    }
}

/// Highest candidate count `<= requested` accepted by `supported`; 1 otherwise.
#[must_use]
pub fn pick_sample_count(requested: u32, supported: impl Fn(u32) -> bool) -> u32 {
    SAMPLE_COUNT_CANDIDATES
        .into_iter()
        .filter(|&count| count <= requested.max(1))
        .find(|&count| supported(count))
        .unwrap_or(1)
}
