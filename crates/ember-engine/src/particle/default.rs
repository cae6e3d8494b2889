use bytemuck::{Pod, Zeroable};

use crate::coords::{Box2, ColorRgba, Vec2};
use crate::render::{VertexDeclaration, VertexFormat, VertexSemantic};

use super::ParticlePolicy;
use super::spawner::TexturedParticle;
use super::tools::{self, ParticleFlags, ParticleTexcoords};

/// General purpose sprite particle.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultParticle {
    pub bounding_box: Box2,
    pub texcoords: ParticleTexcoords,
    pub color: ColorRgba,
    /// Radians, counter-clockwise around the box center.
    pub rotation: f32,
    pub flags: ParticleFlags,
    /// World units per second.
    pub velocity: Vec2,
    /// Remaining lifetime in seconds; `None` lives until removed.
    pub lifetime: Option<f32>,
}

impl Default for DefaultParticle {
    fn default() -> Self {
        Self {
            bounding_box: Box2::new(Vec2::zero(), Vec2::splat(0.5)),
            texcoords: ParticleTexcoords::default(),
            color: ColorRgba::white(),
            rotation: 0.0,
            flags: ParticleFlags::NONE,
            velocity: Vec2::zero(),
            lifetime: None,
        }
    }
}

impl TexturedParticle for DefaultParticle {
    fn set_texcoords(&mut self, texcoords: ParticleTexcoords) {
        self.texcoords = texcoords;
    }
}

/// Vertex layout of [`DefaultPolicy`] (36 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DefaultVertex {
    pub position: [f32; 2],
    /// `u`, `v` and the texture array layer.
    pub texcoord: [f32; 3],
    pub color: [f32; 4],
}

/// Moves particles by their velocity and removes them when their lifetime runs out.
#[derive(Debug, Copy, Clone, Default)]
pub struct DefaultPolicy;

impl ParticlePolicy for DefaultPolicy {
    type Particle = DefaultParticle;
    type Vertex = DefaultVertex;

    fn vertex_declaration(&self) -> VertexDeclaration {
        VertexDeclaration::new()
            .with(VertexSemantic::Position, VertexFormat::Float32x2)
            .with(VertexSemantic::Texcoord, VertexFormat::Float32x3)
            .with(VertexSemantic::Color, VertexFormat::Float32x4)
    }

    fn update_particle(&self, particle: &mut DefaultParticle, dt: f32) -> bool {
        particle.bounding_box.position += particle.velocity * dt;
        match particle.lifetime.as_mut() {
            Some(remaining) => {
                *remaining -= dt;
                *remaining > 0.0
            }
            None => true,
        }
    }

    fn particle_to_vertices(&self, particle: &DefaultParticle) -> [DefaultVertex; 4] {
        let color = particle.color.to_array();
        let layer = particle.texcoords.layer as f32;
        tools::box_vertices(
            particle.bounding_box,
            particle.rotation,
            &particle.texcoords,
            particle.flags,
            |position, uv| DefaultVertex {
                position: position.to_array(),
                texcoord: [uv.x, uv.y, layer],
                color,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_matches_vertex_size() {
        let decl = DefaultPolicy.vertex_declaration();
        assert_eq!(decl.stride() as usize, std::mem::size_of::<DefaultVertex>());
        assert!(decl.is_consistent());
    }

    #[test]
    fn lifetime_expires() {
        let mut p = DefaultParticle { lifetime: Some(0.25), ..Default::default() };
        assert!(DefaultPolicy.update_particle(&mut p, 0.1));
        assert!(!DefaultPolicy.update_particle(&mut p, 0.2));
    }

    #[test]
    fn velocity_moves_box() {
        let mut p = DefaultParticle { velocity: Vec2::new(2.0, -4.0), ..Default::default() };
        assert!(DefaultPolicy.update_particle(&mut p, 0.5));
        assert_eq!(p.bounding_box.position, Vec2::new(1.0, -2.0));
    }

    #[test]
    fn vertices_carry_color_and_corners() {
        let p = DefaultParticle {
            color: ColorRgba::new(1.0, 0.0, 0.0, 1.0),
            ..Default::default()
        };
        let v = DefaultPolicy.particle_to_vertices(&p);
        assert_eq!(v[0].position, [-0.5, -0.5]);
        assert_eq!(v[2].position, [0.5, 0.5]);
        assert_eq!(v[3].texcoord, [0.0, 1.0, 0.0]);
        assert!(v.iter().all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn vertices_carry_atlas_layer() {
        let p = DefaultParticle {
            texcoords: ParticleTexcoords::from(crate::atlas::AtlasRect::new(
                Vec2::new(0.25, 0.5),
                Vec2::new(0.5, 0.75),
                3,
            )),
            ..Default::default()
        };
        let v = DefaultPolicy.particle_to_vertices(&p);
        assert_eq!(v[0].texcoord, [0.25, 0.5, 3.0]);
        assert_eq!(v[2].texcoord, [0.5, 0.75, 3.0]);
        assert!(v.iter().all(|v| v.texcoord[2] == 3.0));
    }
}
