//! Proxy geometry: the unit cube bounding the volume and the screen-aligned quad.

use wgpu::util::DeviceExt;

/// Unit cube corners; vertex `i` sits at `(i & 1, (i >> 1) & 1, (i >> 2) & 1)`.
pub const CUBE_VERTICES: [[f32; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

/// Single triangle strip covering all six cube faces.
pub const CUBE_STRIP_INDICES: [u16; 14] = [0, 1, 4, 5, 7, 1, 3, 0, 2, 4, 6, 7, 2, 3];

/// Quad corners in normalized device coordinates.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// Two triangles covering the quad.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Vertex and index buffers of an indexed mesh.
pub struct ProxyMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl ProxyMesh {
    /// Uploads the unit cube (triangle strip topology).
    pub fn cube(device: &wgpu::Device) -> Self {
        Self::new(
            device,
            "proxy cube",
            bytemuck::cast_slice(&CUBE_VERTICES),
            &CUBE_STRIP_INDICES,
        )
    }

    /// Uploads the screen-aligned quad (triangle list topology).
    pub fn quad(device: &wgpu::Device) -> Self {
        Self::new(
            device,
            "screen quad",
            bytemuck::cast_slice(&QUAD_VERTICES),
            &QUAD_INDICES,
        )
    }

    fn new(device: &wgpu::Device, label: &str, vertices: &[u8], indices: &[u16]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vertices")),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} indices")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// Vertex layout for the cube: one `vec3<f32>` position at location 0.
    pub fn cube_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }

    /// Vertex layout for the quad: one `vec2<f32>` position at location 0.
    pub fn quad_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }

    /// Binds the buffers and issues the indexed draw.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    /// Returns the number of indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
