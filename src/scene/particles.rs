// scene/particles.rs
// CPU particle pool. Emitted particles are drawn as quads by the sprite pass.

use glam::{Vec2, Vec3, Vec4};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::renderer::Quad;

#[derive(Debug, Clone, Copy)]
pub struct ParticleProps {
    pub velocity: Vec2,
    pub velocity_variation: Vec2,
    pub color_begin: Vec4,
    pub color_end: Vec4,
    pub size_begin: f32,
    pub size_end: f32,
    pub size_variation: f32,
    /// Seconds.
    pub lifetime: f32,
}

impl Default for ParticleProps {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            velocity_variation: Vec2::new(3.0, 1.0),
            color_begin: Vec4::new(254.0 / 255.0, 212.0 / 255.0, 123.0 / 255.0, 1.0),
            color_end: Vec4::new(254.0 / 255.0, 109.0 / 255.0, 41.0 / 255.0, 1.0),
            size_begin: 0.5,
            size_end: 0.0,
            size_variation: 0.3,
            lifetime: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Particle {
    position: Vec2,
    velocity: Vec2,
    rotation: f32,
    color_begin: Vec4,
    color_end: Vec4,
    size_begin: f32,
    size_end: f32,
    lifetime: f32,
    life_remaining: f32,
    active: bool,
}

impl Particle {
    fn progress(&self) -> f32 {
        1.0 - (self.life_remaining / self.lifetime).clamp(0.0, 1.0)
    }
}

/// Fixed-size ring of particles. Emitting into a full pool overwrites the
/// oldest slot.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    pool: Vec<Particle>,
    next: usize,
    rng: SmallRng,
    /// Depth at which quads are emitted.
    pub z: f32,
}

impl ParticleSystem {
    pub fn new(capacity: usize, seed: u64) -> Self {
        Self {
            pool: vec![Particle::default(); capacity.max(1)],
            next: 0,
            rng: SmallRng::seed_from_u64(seed),
            z: 0.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    pub fn emit(&mut self, origin: Vec2, props: &ParticleProps) {
        let velocity = props.velocity
            + props.velocity_variation * Vec2::new(self.rng.gen_range(-0.5..=0.5), self.rng.gen_range(-0.5..=0.5));
        let size_begin = (props.size_begin + props.size_variation * self.rng.gen_range(-0.5f32..=0.5)).max(0.0);
        let rotation = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let lifetime = props.lifetime.max(f32::EPSILON);

        self.pool[self.next] = Particle {
            position: origin,
            velocity,
            rotation,
            color_begin: props.color_begin,
            color_end: props.color_end,
            size_begin,
            size_end: props.size_end,
            lifetime,
            life_remaining: lifetime,
            active: true,
        };
        self.next = (self.next + 1) % self.pool.len();
    }

    pub fn update(&mut self, dt: f32) {
        for particle in self.pool.iter_mut().filter(|p| p.active) {
            particle.life_remaining -= dt;
            if particle.life_remaining <= 0.0 {
                particle.active = false;
                continue;
            }
            particle.position += particle.velocity * dt;
            particle.rotation += 0.01 * dt;
        }
    }

    pub fn alive(&self) -> usize {
        self.pool.iter().filter(|p| p.active).count()
    }

    /// Live particles as quads, fading and shrinking over their lifetime.
    pub fn quads(&self) -> impl Iterator<Item = Quad> + '_ {
        self.pool.iter().filter(|p| p.active).map(move |p| {
            let t = p.progress();
            let mut color = p.color_begin.lerp(p.color_end, t);
            color.w *= 1.0 - t;
            let size = p.size_begin + (p.size_end - p.size_begin) * t;
            Quad::new(Vec3::new(p.position.x, p.position.y, self.z), Vec2::splat(size))
                .with_rotation(p.rotation)
                .with_color(color)
        })
    }

    pub fn clear(&mut self) {
        for particle in &mut self.pool {
            particle.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particles_expire_after_lifetime() {
        let mut system = ParticleSystem::new(8, 7);
        let props = ParticleProps {
            lifetime: 0.5,
            ..ParticleProps::default()
        };
        system.emit(Vec2::ZERO, &props);
        system.emit(Vec2::ZERO, &props);
        assert_eq!(system.alive(), 2);

        system.update(0.25);
        assert_eq!(system.alive(), 2);
        system.update(0.3);
        assert_eq!(system.alive(), 0);
    }

    #[test]
    fn full_pool_overwrites_oldest() {
        let mut system = ParticleSystem::new(2, 1);
        for _ in 0..5 {
            system.emit(Vec2::ZERO, &ParticleProps::default());
        }
        assert_eq!(system.alive(), 2);
    }

    #[test]
    fn quads_fade_out() {
        let mut system = ParticleSystem::new(1, 3);
        let props = ParticleProps {
            velocity_variation: Vec2::ZERO,
            size_variation: 0.0,
            lifetime: 1.0,
            ..ParticleProps::default()
        };
        system.emit(Vec2::new(2.0, 3.0), &props);
        system.update(0.5);

        let quad = system.quads().next().unwrap();
        assert!((quad.color.w - 0.5).abs() < 1e-5);
        assert!((quad.scale.x - 0.25).abs() < 1e-5);
        assert_eq!(quad.position, Vec3::new(2.0, 3.0, 0.0));
    }

    #[test]
    fn same_seed_same_particles() {
        let mut a = ParticleSystem::new(4, 42);
        let mut b = ParticleSystem::new(4, 42);
        a.emit(Vec2::ZERO, &ParticleProps::default());
        b.emit(Vec2::ZERO, &ParticleProps::default());
        assert_eq!(a.quads().next(), b.quads().next());
    }
}
