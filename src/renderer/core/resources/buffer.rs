//! Typed Uniform Buffer
//!
//! [`UniformBuffer<T>`] pairs one GPU uniform buffer with a CPU-side copy of a
//! `#[repr(C)]` block. Callers mutate the copy through [`UniformBuffer::get_mut`]
//! and [`UniformBuffer::bind`] pushes it to the GPU before the draw that reads it.
//!
//! `T` must match the WGSL struct layout exactly (16-byte aligned members,
//! explicit padding).

use bytemuck::Pod;

use super::tracked::ResourceId;

pub struct UniformBuffer<T: Pod> {
    data: T,
    buffer: wgpu::Buffer,
    id: ResourceId,
}

impl<T: Pod> UniformBuffer<T> {
    #[must_use]
    pub fn new(device: &wgpu::Device, data: T, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size_of::<T>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            data,
            buffer,
            id: ResourceId::next(),
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        &self.data
    }

    /// CPU copy; changes reach the GPU on the next [`Self::bind`].
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.data
    }

    /// Uploads the CPU copy and returns the buffer for binding.
    ///
    /// The write is ordered before the next queue submission.
    pub fn bind(&self, queue: &wgpu::Queue) -> &wgpu::Buffer {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.data));
        &self.buffer
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Whole-buffer binding resource for bind group creation.
    #[inline]
    #[must_use]
    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Layout entry for a uniform block of this type at `binding`.
    #[must_use]
    pub fn layout_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(size_of::<T>() as u64),
            },
            count: None,
        }
    }
}

impl<T: Pod + std::fmt::Debug> std::fmt::Debug for UniformBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformBuffer")
            .field("data", &self.data)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
