//! Shader modules, bind group layouts and render pipelines.
//!
//! Everything is created once, up front. Shader sources are validated with
//! naga before wgpu sees them so a broken module surfaces as
//! [`ViewerError::ShaderCompile`] instead of a device error.

use wgpu::util::DeviceExt;

use uview_engine::render::common::{
    premul_alpha_blend, uniform_binding_size, QuadVertex, QUAD_INDICES, QUAD_VERTICES,
};

use crate::error::ViewerError;
use crate::geometry::{uv_vertex_layout, StrokeInstance};

use super::uniforms::{DrawUniform, ViewUniform};

pub const SOLID_WGSL: &str = include_str!("shaders/solid.wgsl");
pub const STROKE_WGSL: &str = include_str!("shaders/stroke.wgsl");
pub const TEXTURED_WGSL: &str = include_str!("shaders/textured.wgsl");

/// Parses and validates a WGSL module.
pub fn validate_wgsl(label: &str, source: &str) -> Result<(), ViewerError> {
    let fail = |reason: String| ViewerError::ShaderCompile { label: label.to_string(), reason };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| fail(e.emit_to_string(source)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| fail(e.to_string()))?;
    Ok(())
}

pub(crate) struct Pipelines {
    pub(crate) view_layout: wgpu::BindGroupLayout,
    pub(crate) draw_layout: wgpu::BindGroupLayout,
    pub(crate) texture_layout: wgpu::BindGroupLayout,

    pub(crate) lines: wgpu::RenderPipeline,
    pub(crate) fill: wgpu::RenderPipeline,
    pub(crate) stroke: wgpu::RenderPipeline,
    pub(crate) textured: wgpu::RenderPipeline,

    pub(crate) sampler: wgpu::Sampler,
    pub(crate) quad_vbo: wgpu::Buffer,
    pub(crate) quad_ibo: wgpu::Buffer,
}

impl Pipelines {
    pub(crate) fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self, ViewerError> {
        let solid = shader_module(device, "uview solid shader", SOLID_WGSL)?;
        let stroke = shader_module(device, "uview stroke shader", STROKE_WGSL)?;
        let textured = shader_module(device, "uview textured shader", TEXTURED_WGSL)?;

        let view_layout = uniform_layout::<ViewUniform>(device, "uview view bgl", false);
        let draw_layout = uniform_layout::<DrawUniform>(device, "uview draw bgl", true);
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uview texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let flat_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("uview flat pipeline layout"),
            bind_group_layouts: &[&view_layout, &draw_layout],
            immediate_size: 0,
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("uview textured pipeline layout"),
            bind_group_layouts: &[&view_layout, &draw_layout, &texture_layout],
            immediate_size: 0,
        });

        let build = |label: &str,
                     layout: &wgpu::PipelineLayout,
                     module: &wgpu::ShaderModule,
                     buffers: &[wgpu::VertexBufferLayout<'_>],
                     topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(premul_alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        let lines = build(
            "uview lines pipeline",
            &flat_layout,
            &solid,
            &[uv_vertex_layout()],
            wgpu::PrimitiveTopology::LineList,
        );
        let fill = build(
            "uview fill pipeline",
            &flat_layout,
            &solid,
            &[uv_vertex_layout()],
            wgpu::PrimitiveTopology::TriangleList,
        );
        let stroke = build(
            "uview stroke pipeline",
            &flat_layout,
            &stroke,
            &[QuadVertex::layout(), StrokeInstance::layout()],
            wgpu::PrimitiveTopology::TriangleList,
        );
        let textured = build(
            "uview textured pipeline",
            &textured_layout,
            &textured,
            &[uv_vertex_layout()],
            wgpu::PrimitiveTopology::TriangleList,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("uview texture sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uview stroke quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uview stroke quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!("scene pipelines created for {format:?}");
        Ok(Self {
            view_layout,
            draw_layout,
            texture_layout,
            lines,
            fill,
            stroke,
            textured,
            sampler,
            quad_vbo,
            quad_ibo,
        })
    }
}

fn shader_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, ViewerError> {
    validate_wgsl(label, source)?;
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}

fn uniform_layout<T>(device: &wgpu::Device, label: &str, dynamic: bool) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: uniform_binding_size::<T>(),
            },
            count: None,
        }],
    })
}
