use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    pub fn new(pos: Vec3, normal: Vec3, color: [f32; 4]) -> Self {
        Self { pos: pos.to_array(), normal: normal.to_array(), color }
    }
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.vertices.is_empty() && self.indices.is_empty() }

    /// Axis-aligned box centred on the origin.
    pub fn cuboid(size: Vec3, color: [f32; 4]) -> Self {
        let h = size * 0.5;
        let faces = [
            (Vec3::X, Vec3::Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::X, Vec3::Y),
        ];
        let mut mesh = Mesh::empty();
        for (n, u, v) in faces {
            let base = mesh.vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (n + u * su + v * sv) * h;
                mesh.vertices.push(Vertex::new(p, n, color));
            }
            mesh.indices.extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        }
        mesh
    }

    /// UV sphere centred on the origin.
    pub fn sphere(radius: f32, segments: u32, rings: u32, color: [f32; 4]) -> Self {
        let mut mesh = Mesh::empty();
        for r in 0..=rings {
            let phi = std::f32::consts::PI * r as f32 / rings as f32;
            for s in 0..=segments {
                let theta = std::f32::consts::TAU * s as f32 / segments as f32;
                let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                mesh.vertices.push(Vertex::new(n * radius, n, color));
            }
        }
        let stride = segments + 1;
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + stride;
                mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        mesh
    }

    /// Capped cylinder (or cone when one radius is zero) standing on y = 0.
    pub fn cylinder(radius_bottom: f32, radius_top: f32, height: f32, segments: u32, color: [f32; 4]) -> Self {
        let mut mesh = Mesh::empty();
        let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);
        for s in 0..=segments {
            let theta = std::f32::consts::TAU * s as f32 / segments as f32;
            let (sin, cos) = theta.sin_cos();
            let n = Vec3::new(cos, slope, sin).normalize();
            mesh.vertices.push(Vertex::new(Vec3::new(cos * radius_bottom, 0.0, sin * radius_bottom), n, color));
            mesh.vertices.push(Vertex::new(Vec3::new(cos * radius_top, height, sin * radius_top), n, color));
        }
        for s in 0..segments {
            let a = s * 2;
            mesh.indices.extend_from_slice(&[a, a + 1, a + 2, a + 1, a + 3, a + 2]);
        }
        for (y, n, radius) in [(0.0, Vec3::NEG_Y, radius_bottom), (height, Vec3::Y, radius_top)] {
            if radius <= 0.0 {
                continue;
            }
            let centre = mesh.vertices.len() as u32;
            mesh.vertices.push(Vertex::new(Vec3::new(0.0, y, 0.0), n, color));
            for s in 0..=segments {
                let theta = std::f32::consts::TAU * s as f32 / segments as f32;
                mesh.vertices.push(Vertex::new(Vec3::new(theta.cos() * radius, y, theta.sin() * radius), n, color));
            }
            for s in 0..segments {
                let (a, b) = (centre + 1 + s, centre + 2 + s);
                if n.y > 0.0 {
                    mesh.indices.extend_from_slice(&[centre, b, a]);
                } else {
                    mesh.indices.extend_from_slice(&[centre, a, b]);
                }
            }
        }
        mesh
    }

    /// Horizontal rectangle facing +Y, width along X and depth along Z.
    pub fn plane(width: f32, depth: f32, color: [f32; 4]) -> Self {
        let (hw, hd) = (width * 0.5, depth * 0.5);
        let corners = [(-hw, -hd), (hw, -hd), (hw, hd), (-hw, hd)];
        Mesh {
            vertices: corners.iter().map(|&(x, z)| Vertex::new(Vec3::new(x, 0.0, z), Vec3::Y, color)).collect(),
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    pub fn transformed(&self, transform: Mat4) -> Self {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        let vertices = self
            .vertices
            .iter()
            .map(|v| Vertex {
                pos: transform.transform_point3(Vec3::from(v.pos)).to_array(),
                normal: (normal_matrix * Vec3::from(v.normal)).normalize_or_zero().to_array(),
                color: v.color,
            })
            .collect();
        Mesh { vertices, indices: self.indices.clone() }
    }

    /// Merge `other` into this mesh after moving it by `transform`.
    pub fn append(&mut self, other: &Mesh, transform: Mat4) {
        let base = self.vertices.len() as u32;
        let moved = other.transformed(transform);
        self.vertices.extend(moved.vertices);
        self.indices.extend(moved.indices.iter().map(|i| i + base));
    }

    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut it = self.vertices.iter().map(|v| Vec3::from(v.pos));
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

pub fn rgba(hex: u32, alpha: f32) -> [f32; 4] {
    let c = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
    [c(16), c(8), c(0), alpha]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_spans_its_size() {
        let (lo, hi) = Mesh::cuboid(Vec3::new(2.0, 4.0, 6.0), [1.0; 4]).bounds().unwrap();
        assert_eq!(lo, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(hi, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn append_offsets_indices() {
        let mut mesh = Mesh::plane(1.0, 1.0, [1.0; 4]);
        mesh.append(&Mesh::plane(1.0, 1.0, [1.0; 4]), Mat4::from_translation(Vec3::X * 5.0));
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(*mesh.indices.iter().max().unwrap(), 7);
        assert_eq!(mesh.bounds().unwrap().1.x, 5.5);
    }

    #[test]
    fn hex_colour() {
        assert_eq!(rgba(0xff0000, 1.0), [1.0, 0.0, 0.0, 1.0]);
    }
}
