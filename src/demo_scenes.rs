use std::path::Path;

use glam::{Vec2, Vec3, Vec4};
use log::{info, warn};
use wgpu_sprites::app::{AppBuilder, Plugin, StartupContext, UpdateContext};
use wgpu_sprites::asset::ImageData;
use wgpu_sprites::renderer::{Material, MaterialDesc, Texture, TextureSlotType};
use wgpu_sprites::scene::{EntityBuilder, ParticleProps, ParticleSystem, Sprite, Transform2D};

#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub enum DemoScene {
    /// `(2 * size + 1)^2` sprites, most of them off screen.
    Grid { size: i32 },
    Spinning,
    Particles,
    /// Material description with texture paths, loaded asynchronously.
    Material { path: &'static str },
}

impl DemoScene {
    pub fn plugin(self) -> DemoScenePlugin {
        DemoScenePlugin::new(self)
    }
}

pub struct DemoScenePlugin {
    scene: DemoScene,
}

impl DemoScenePlugin {
    pub fn new(scene: DemoScene) -> Self {
        Self { scene }
    }
}

impl Plugin for DemoScenePlugin {
    fn build(&self, app: &mut AppBuilder) {
        match self.scene {
            DemoScene::Grid { size } => {
                app.with_title("Sprite grid");
                app.add_startup_system(move |ctx: &mut StartupContext<'_>| setup_grid_scene(ctx, size));
                app.add_system(pan_camera(6.0, 0.25));
            }
            DemoScene::Spinning => {
                app.with_title("Spinning sprites");
                app.add_startup_system(setup_spinning_scene);
            }
            DemoScene::Particles => {
                app.with_title("Particles");
                app.add_startup_system(setup_particle_scene);
                app.add_system(emit_fountain(ParticleProps::default(), 4));
            }
            DemoScene::Material { path } => {
                app.with_title("Material");
                app.add_startup_system(move |ctx: &mut StartupContext<'_>| load_material_scene(ctx, path));
            }
        }
    }
}

fn pan_camera(radius: f32, speed: f32) -> impl for<'a> FnMut(&mut UpdateContext<'a>) + 'static {
    let mut last = Vec3::ZERO;
    move |ctx: &mut UpdateContext<'_>| {
        let t = ctx.scene.time() as f32 * speed;
        let offset = Vec3::new(t.cos() * radius, t.sin() * radius, 0.0);
        ctx.scene.camera_mut().translate(offset - last);
        last = offset;
    }
}

fn emit_fountain(props: ParticleProps, per_frame: usize) -> impl for<'a> FnMut(&mut UpdateContext<'a>) + 'static {
    move |ctx: &mut UpdateContext<'_>| {
        let emitters: Vec<hecs::Entity> = ctx
            .scene
            .world
            .query::<&ParticleSystem>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();
        for entity in emitters {
            ctx.scene.emit_particles(entity, per_frame, &props);
        }
    }
}

/// Upload generated textures so the grid uses more textures than one batch
/// can bind.
fn generated_textures(ctx: &mut StartupContext<'_>, count: usize) -> Vec<Sprite> {
    let (device, assets) = ctx.renderer.device_and_assets();
    (0..count)
        .filter_map(|i| {
            let shade = (i * 255 / count.max(1)) as u8;
            let image = ImageData::checkerboard(64, 8, [255, 255, 255, 255], [shade, 64, 255 - shade, 255]);
            let name = format!("checker_{i}");
            match Texture::from_image(&mut *device, &image, &name) {
                Ok(texture) => Some(Sprite::textured(assets.textures.insert_ready(&name, texture))),
                Err(err) => {
                    warn!("Skipping {}: {}", name, err);
                    None
                }
            }
        })
        .collect()
}

fn setup_grid_scene(ctx: &mut StartupContext<'_>, size: i32) {
    info!("Creating grid scene...");

    let textured = generated_textures(ctx, 40);
    let scene = &mut *ctx.scene;

    let spacing = 1.1;
    for x in -size..=size {
        for y in -size..=size {
            let position = Vec3::new(x as f32 * spacing, y as f32 * spacing, 0.0);
            let pick = ((x.abs() + y.abs()) as usize) % (textured.len() + 1);
            let sprite = match textured.get(pick) {
                Some(sprite) => sprite.clone(),
                None => Sprite::colored(Vec4::new(0.2 + 0.8 * (x + size) as f32 / (2 * size).max(1) as f32, 0.3, 0.8, 1.0)),
            };

            EntityBuilder::new(&mut scene.world)
                .with_name(format!("Sprite_{x}_{y}"))
                .with_transform(Transform2D::new(position, Vec2::splat(1.0)))
                .with_sprite(sprite)
                .spawn();
        }
    }

    info!("Grid scene: {} entities", scene.world.len());
}

fn setup_spinning_scene(ctx: &mut StartupContext<'_>) {
    let textured = generated_textures(ctx, 3);
    let scene = &mut *ctx.scene;

    for (i, sprite) in textured.into_iter().enumerate() {
        let x = (i as f32 - 1.0) * 4.0;
        scene
            .spawn()
            .with_name(format!("Spinner_{i}"))
            .with_transform(Transform2D::new(Vec3::new(x, 0.0, i as f32 * 0.1), Vec2::splat(3.0)))
            .with_sprite(sprite)
            .with_spin(0.5 + i as f32 * 0.75)
            .spawn();
    }

    scene
        .spawn()
        .with_name("Drifter")
        .with_transform(Transform2D::new(Vec3::new(-8.0, -5.0, -0.5), Vec2::new(2.0, 0.5)))
        .with_sprite(Sprite::colored(Vec4::new(0.9, 0.4, 0.2, 1.0)))
        .with_velocity(Vec2::new(1.0, 0.6))
        .spawn();

    info!("Spinning scene: {} entities", scene.world.len());
}

fn setup_particle_scene(ctx: &mut StartupContext<'_>) {
    let scene = &mut *ctx.scene;

    scene
        .spawn()
        .with_name("Fountain")
        .with_transform(Transform2D::new(Vec3::new(0.0, -6.0, 0.0), Vec2::splat(1.0)))
        .with_particles(ParticleSystem::new(5000, 7))
        .spawn();

    scene
        .spawn()
        .with_name("Ground")
        .with_transform(Transform2D::new(Vec3::new(0.0, -7.0, -1.0), Vec2::new(30.0, 1.0)))
        .with_sprite(Sprite::colored(Vec4::new(0.15, 0.15, 0.2, 1.0)))
        .spawn();
}

fn load_material_scene(ctx: &mut StartupContext<'_>, path: &str) {
    let desc = match std::fs::read_to_string(Path::new(path)).map(|json| MaterialDesc::from_json(&json)) {
        Ok(Ok(desc)) => desc,
        Ok(Err(err)) => {
            warn!("Invalid material {}: {}", path, err);
            return;
        }
        Err(err) => {
            warn!("Failed to read material {}: {}", path, err);
            return;
        }
    };

    let mode = ctx.renderer.load_mode();
    let (device, assets) = ctx.renderer.device_and_assets();
    let material = match Material::from_desc(&desc, assets, device, mode) {
        Ok(material) => material,
        Err(err) => {
            warn!("Failed to build material {}: {}", desc.name, err);
            return;
        }
    };

    // Shows the placeholder until the albedo load is published.
    let sprite = match material.texture(TextureSlotType::Albedo) {
        Some(handle) => Sprite::textured(handle.clone()).with_color(material.color()),
        None => Sprite::colored(material.color()),
    };
    ctx.scene
        .spawn()
        .with_name(material.name().to_string())
        .with_transform(Transform2D::new(Vec3::ZERO, Vec2::splat(8.0)))
        .with_sprite(sprite)
        .with_spin(0.2)
        .spawn();

    info!("Material '{}' has albedo: {}", material.name(), material.has_albedo());
}
