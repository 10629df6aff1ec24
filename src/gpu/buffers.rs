use wgpu::{Buffer, BufferUsages, Device, Queue};

use crate::simulation::{ColorIndex, Rgb};

/// Storage buffers mirroring the controller's grid and palette
pub struct GridBuffers {
    /// Current generation, one u32 color index per cell, row-major
    pub cells_buffer: Buffer,
    /// Palette packed as `0x00BBGGRR`
    pub palette_buffer: Buffer,
    /// Uniform buffer for render parameters
    pub params_buffer: Buffer,
    pub rows: usize,
    pub cols: usize,
    pub color_count: usize,
}

/// Render parameters passed to the fragment shader (16 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RenderParams {
    pub grid_width: u32,
    pub grid_height: u32,
    pub scale: u32,
    pub color_count: u32,
}

impl GridBuffers {
    /// Allocate buffers for a `rows x cols` grid and `color_count` palette entries
    pub fn new(device: &Device, rows: usize, cols: usize, color_count: usize) -> Self {
        // Zero-sized storage bindings are invalid
        let cell_count = (rows * cols).max(1);
        let palette_len = color_count.max(1);

        let cells_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid-cells-buffer"),
            size: (cell_count * std::mem::size_of::<ColorIndex>()) as u64,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let palette_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("palette-buffer"),
            size: (palette_len * std::mem::size_of::<u32>()) as u64,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("render-params-buffer"),
            size: std::mem::size_of::<RenderParams>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            cells_buffer,
            palette_buffer,
            params_buffer,
            rows,
            cols,
            color_count,
        }
    }

    /// Whether these buffers can hold the given grid and palette without reallocation
    pub fn fits(&self, rows: usize, cols: usize, color_count: usize) -> bool {
        self.rows == rows && self.cols == cols && self.color_count == color_count
    }

    /// Upload the current generation
    pub fn write_cells(&self, queue: &Queue, cells: &[ColorIndex]) {
        debug_assert_eq!(cells.len(), self.rows * self.cols, "cell count mismatch");
        if !cells.is_empty() {
            queue.write_buffer(&self.cells_buffer, 0, bytemuck::cast_slice(cells));
        }
    }

    /// Upload the palette
    pub fn write_palette(&self, queue: &Queue, palette: &[Rgb]) {
        let packed: Vec<u32> = palette.iter().map(|c| c.packed()).collect();
        if !packed.is_empty() {
            queue.write_buffer(&self.palette_buffer, 0, bytemuck::cast_slice(&packed));
        }
    }

    /// Update render parameters
    pub fn write_params(&self, queue: &Queue, scale: u32) {
        let params = RenderParams {
            grid_width: self.cols as u32,
            grid_height: self.rows as u32,
            scale: scale.max(1),
            color_count: self.color_count as u32,
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_params_size() {
        assert_eq!(std::mem::size_of::<RenderParams>(), 16);
    }
}
