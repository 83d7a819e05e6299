//! Uniform layouts shared with the WGSL modules, and the per-draw ring.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};
use uview_engine::paint::Color;
use uview_engine::render::common::{align_to, uniform_binding_size};

// ── group 0: view ─────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ViewUniform {
    pub view_proj: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub _pad: [f32; 2], // mat4 alignment
}

impl ViewUniform {
    pub fn new(view_proj: Mat4, viewport: Vec2) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            viewport: [viewport.x.max(1.0), viewport.y.max(1.0)],
            _pad: [0.0; 2],
        }
    }
}

// ── group 1: per draw ─────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DrawUniform {
    pub color: [f32; 4],
    pub tile_origin: [f32; 2],
    pub repeat_tex: f32,
    pub stroke_width: f32,
}

impl DrawUniform {
    pub fn solid(color: Color) -> Self {
        Self { color: color.to_array(), tile_origin: [0.0; 2], repeat_tex: 0.0, stroke_width: 0.0 }
    }

    pub fn stroke(color: Color, width: f32) -> Self {
        Self { stroke_width: width, ..Self::solid(color) }
    }

    pub fn textured(tile_origin: Vec2, repeat: bool) -> Self {
        Self {
            color: Color::WHITE.to_array(),
            tile_origin: tile_origin.to_array(),
            repeat_tex: if repeat { 1.0 } else { 0.0 },
            stroke_width: 0.0,
        }
    }
}

/// Dynamic-offset uniform buffer holding every [`DrawUniform`] of a frame.
///
/// Grows to the next power of two slot count and never shrinks.
pub(crate) struct DrawUniforms {
    stride: u64,
    capacity: usize,
    buffer: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
    staging: Vec<u8>,
}

impl DrawUniforms {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        Self {
            stride: align_to(std::mem::size_of::<DrawUniform>() as u64, alignment),
            capacity: 0,
            buffer: None,
            bind_group: None,
            staging: Vec::new(),
        }
    }

    /// Dynamic offset of `slot`.
    #[inline]
    pub(crate) fn offset(&self, slot: u32) -> u32 {
        (slot as u64 * self.stride) as u32
    }

    pub(crate) fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }

    /// Uploads `draws`, slot `i` at `offset(i)`.
    pub(crate) fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        draws: &[DrawUniform],
    ) {
        if draws.is_empty() {
            return;
        }
        self.ensure_capacity(device, layout, draws.len());
        let Some(buffer) = self.buffer.as_ref() else { return; };

        let stride = self.stride as usize;
        self.staging.clear();
        self.staging.resize(draws.len() * stride, 0);
        for (i, draw) in draws.iter().enumerate() {
            let at = i * stride;
            self.staging[at..at + std::mem::size_of::<DrawUniform>()]
                .copy_from_slice(bytemuck::bytes_of(draw));
        }
        queue.write_buffer(buffer, 0, &self.staging);
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout, needed: usize) {
        if self.buffer.is_some() && self.capacity >= needed {
            return;
        }
        let capacity = needed.next_power_of_two().max(16);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uview draw ubo"),
            size: capacity as u64 * self.stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uview draw bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: uniform_binding_size::<DrawUniform>(),
                }),
            }],
        });
        log::debug!("draw uniform ring grown to {capacity} slots");
        self.buffer = Some(buffer);
        self.bind_group = Some(bind_group);
        self.capacity = capacity;
    }
}
