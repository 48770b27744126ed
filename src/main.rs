mod demo_scenes;

use demo_scenes::DemoScene;
use wgpu_sprites::app::AppBuilder;

//const ACTIVE_SCENE: DemoScene = DemoScene::Particles;

const ACTIVE_SCENE: DemoScene = DemoScene::Grid { size: 40 };

fn build_app() -> AppBuilder {
    let mut builder = AppBuilder::new();
    builder.add_plugin(ACTIVE_SCENE.plugin());
    builder
}

fn main() {
    if let Err(err) = wgpu_sprites::run(build_app()) {
        eprintln!("Application error: {err}");
    }
}
