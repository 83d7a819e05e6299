/// A single acquired swapchain frame.
///
/// Short-lived: holding the surface texture blocks acquisition of the next one.
/// `index` is the runtime frame counter, used by owners of GPU resources to
/// decide when a retired buffer or texture is no longer referenced.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
    pub index: u64,
}
