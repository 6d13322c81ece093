/// ASCII rasterizer backend for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use glkit_core::material::{ATTR_NORMAL, ATTR_POSITION};
use glkit_core::math::{self, Mat4, Vec3, IDENTITY4};
use glkit_core::{Camera, Error, Material, RenderBackend, Result, UniformValue};
use std::collections::HashMap;
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Brightness of parts drawn without normals
const UNLIT_BRIGHTNESS: f32 = 0.15;

enum BufferData {
    Vertex { data: Vec<f32>, components: usize },
    Index(Vec<u32>),
}

/// Uniforms captured from the active material
struct DrawState {
    mvp: Mat4,
    normal_matrix: Mat4,
    /// Direction towards the light
    to_light: Vec3,
    bound: HashMap<String, usize>,
}

/// ASCII renderer that rasterizes mesh parts into terminal characters
pub struct AsciiBackend {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    buffers: Vec<BufferData>,
    state: Option<DrawState>,
}

impl AsciiBackend {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            buffers: Vec::new(),
            state: None,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.char_buffer = vec![' '; width * height];
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    /// Current frame as text, one line per row
    pub fn frame(&self) -> Vec<String> {
        self.char_buffer
            .chunks(self.width.max(1))
            .map(|row| row.iter().collect())
            .collect()
    }

    fn vertex_buffer(&self, name: &str, components: usize) -> Result<Option<&[f32]>> {
        let Some(state) = &self.state else {
            return Err(Error::Unsupported("draw without an active material".into()));
        };
        let Some(&id) = state.bound.get(name) else {
            return Ok(None);
        };
        match self.buffers.get(id) {
            Some(BufferData::Vertex { data, components: c }) if *c == components => {
                Ok(Some(data.as_slice()))
            }
            _ => Err(Error::Unsupported(format!(
                "{name} is not bound to a {components}-component vertex buffer"
            ))),
        }
    }

    fn draw_triangles(&mut self, indices: &[u32]) -> Result<()> {
        let positions = self
            .vertex_buffer(ATTR_POSITION, 3)?
            .ok_or_else(|| Error::Unsupported(format!("{ATTR_POSITION} is not bound")))?;
        let normals = self.vertex_buffer(ATTR_NORMAL, 3)?;
        let Some(state) = &self.state else {
            return Ok(());
        };

        let vertex_count = positions.len() / 3;
        let mut fragments = Vec::with_capacity(indices.len() / 3);
        for tri in indices.chunks_exact(3) {
            if tri.iter().any(|&i| i as usize >= vertex_count) {
                return Err(Error::Unsupported(format!("index out of range in {tri:?}")));
            }

            // Project vertices to screen space
            let mut screen_coords = [(0.0, 0.0, 0.0); 3];
            let mut visible = true;
            for (k, &i) in tri.iter().enumerate() {
                let p = math::vec3_from_slice(&positions[i as usize * 3..i as usize * 3 + 3]);
                let clip = math::mult_mat_vec(&state.mvp, math::extend(p, 1.0));
                match Camera::clip_to_screen(clip, self.width as u32, self.height as u32) {
                    Some(coords) => screen_coords[k] = coords,
                    None => visible = false, // Triangle is clipped
                }
            }
            if !visible {
                continue;
            }

            // Lambert shading from the averaged vertex normal
            let brightness = match normals {
                Some(normals) => {
                    let sum = tri.iter().fold([0.0; 3], |acc, &i| {
                        let n = math::vec3_from_slice(&normals[i as usize * 3..i as usize * 3 + 3]);
                        math::add(acc, n)
                    });
                    let world = math::mult_mat_vec(&state.normal_matrix, math::extend(sum, 0.0));
                    math::dot(math::normalize(math::truncate(world)), state.to_light).max(0.0)
                }
                None => UNLIT_BRIGHTNESS,
            };

            // Map brightness to character
            let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
            let char_index = char_index.min(LUMINOSITY_RAMP.len() - 1);
            fragments.push((screen_coords, LUMINOSITY_RAMP[char_index]));
        }

        for (coords, character) in fragments {
            self.rasterize_triangle(&coords, character);
        }
        Ok(())
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32)], character: char) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) = barycentric(
                    (v0.0, v0.1),
                    (v1.0, v1.1),
                    (v2.0, v2.1),
                    (px, py),
                ) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;

                        let idx = y as usize * self.width + x as usize;
                        if depth < self.depth_buffer[idx] {
                            self.depth_buffer[idx] = depth;
                            self.char_buffer[idx] = character;
                        }
                    }
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.char_buffer[y * self.width + x];

                // Color based on character intensity
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            writer.queue(Print("\r\n"))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderBackend for AsciiBackend {
    type Buffer = usize;

    fn create_vertex_buffer(&mut self, data: &[f32], components: usize) -> Result<usize> {
        if components == 0 || data.len() % components != 0 {
            return Err(Error::Unsupported(format!(
                "{} floats do not split into {components}-component vertices",
                data.len()
            )));
        }
        self.buffers.push(BufferData::Vertex {
            data: data.to_vec(),
            components,
        });
        Ok(self.buffers.len() - 1)
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<usize> {
        self.buffers.push(BufferData::Index(indices.to_vec()));
        Ok(self.buffers.len() - 1)
    }

    fn use_material(&mut self, material: &Material) -> Result<()> {
        let shader = &material.shader;
        let mvp = match shader.staged("UMatMVP") {
            Some(UniformValue::Mat4(m)) => m,
            _ => {
                return Err(Error::Unsupported(format!(
                    "material '{}' has no UMatMVP staged",
                    material.name
                )))
            }
        };
        let normal_matrix = match shader.staged("UMatNormal") {
            Some(UniformValue::Mat4(m)) => m,
            _ => IDENTITY4,
        };
        let to_light = match shader.staged("ULightDirectDir") {
            Some(UniformValue::Vec3(d)) => math::normalize(math::mult_scalar(-1.0, d)),
            _ => [0.0, 0.0, 1.0],
        };

        self.state = Some(DrawState {
            mvp,
            normal_matrix,
            to_light,
            bound: HashMap::new(),
        });
        Ok(())
    }

    fn bind_attribute(&mut self, name: &str, buffer: &usize, _components: usize) -> Result<()> {
        match &mut self.state {
            Some(state) => {
                state.bound.insert(name.to_string(), *buffer);
                Ok(())
            }
            None => Err(Error::Unsupported(format!(
                "cannot bind {name} without an active material"
            ))),
        }
    }

    fn draw_elements(&mut self, indices: &usize, count: usize) -> Result<()> {
        let indices = match self.buffers.get(*indices) {
            Some(BufferData::Index(data)) => data[..count.min(data.len())].to_vec(),
            _ => return Err(Error::Unsupported(format!("buffer {indices} is not an index buffer"))),
        };
        self.draw_triangles(&indices)
    }

    fn draw_arrays(&mut self, vertex_count: usize) -> Result<()> {
        let indices: Vec<u32> = (0..vertex_count as u32).collect();
        self.draw_triangles(&indices)
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
