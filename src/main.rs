//! Just Snap viewer
//!
//! A small wireframe viewport hosting the snap engine.
//!
//! Controls:
//! - S: start snapping (LMB or Esc ends it)
//! - 1 / 2 / 3 / O while snapping: points, midpoints, faces, origins
//! - Right drag: orbit, wheel: zoom
//! - Z: toggle X-ray, P: toggle perspective/orthographic
//! - L: toggle local view (objects flagged `local`)
//! - Esc: quit

use just_snap::host::{MemoryScene, SceneDocument, Shading};
use just_snap::view::{Camera as OrbitCamera, Projection, Vec2 as ScreenPoint, Vec3 as WorldPoint};
use just_snap::{FeatureCategory, RecoveryRecord, SnapConfig, SnapError, SnapResult, SnapSession, VERSION};
use macroquad::prelude::{
    clear_background, draw_circle, draw_circle_lines, draw_line, draw_text, get_time, is_key_pressed,
    is_mouse_button_down, is_mouse_button_pressed, mouse_position, mouse_wheel, next_frame, screen_height,
    screen_width, Color, Conf, KeyCode, MouseButton,
};
use std::path::PathBuf;

const BACKGROUND: Color = Color::new(0.11, 0.11, 0.13, 1.0);
const WIRE: Color = Color::new(0.55, 0.57, 0.62, 1.0);
const CANDIDATE: Color = Color::new(0.8, 0.8, 0.8, 0.35);
const SNAP_RED: Color = Color::new(0.8, 0.0, 0.0, 1.0);
const CURSOR_3D: Color = Color::new(1.0, 0.85, 0.2, 1.0);
const TEXT: Color = Color::new(0.9, 0.9, 0.9, 1.0);

const CATEGORY_KEYS: [(KeyCode, FeatureCategory); 4] = [
    (KeyCode::Key1, FeatureCategory::Vertex),
    (KeyCode::Key2, FeatureCategory::EdgeMidpoint),
    (KeyCode::Key3, FeatureCategory::FaceCenter),
    (KeyCode::O, FeatureCategory::Origin),
];

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Just Snap v{}", VERSION),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

struct Args {
    scene: Option<PathBuf>,
    local: bool,
}

impl Args {
    fn from_env() -> Self {
        let mut args = Args { scene: None, local: false };
        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--local" => args.local = true,
                other if args.scene.is_none() => args.scene = Some(PathBuf::from(other)),
                other => log::warn!("ignoring extra argument '{}'", other),
            }
        }
        args
    }
}

/// Right-drag orbit state
#[derive(Default)]
struct Orbit {
    last: Option<(f32, f32)>,
}

impl Orbit {
    /// Apply mouse navigation. Returns true when the camera moved.
    fn update(&mut self, camera: &mut OrbitCamera) -> bool {
        let mut moved = false;

        if is_mouse_button_down(MouseButton::Right) {
            let pos = mouse_position();
            if let Some(last) = self.last {
                let (dx, dy) = (pos.0 - last.0, pos.1 - last.1);
                if dx != 0.0 || dy != 0.0 {
                    camera.rotate(dx * 0.01, dy * 0.01);
                    moved = true;
                }
            }
            self.last = Some(pos);
        } else {
            self.last = None;
        }

        let (_, wheel) = mouse_wheel();
        if wheel != 0.0 {
            camera.zoom(if wheel > 0.0 { 0.9 } else { 1.1 });
            moved = true;
        }
        moved
    }
}

fn cursor() -> ScreenPoint {
    let (x, y) = mouse_position();
    ScreenPoint::new(x, y)
}

/// Keep the camera's region in step with the window
fn sync_viewport(scene: &mut MemoryScene) {
    let (w, h) = (screen_width(), screen_height());
    if scene.camera.width != w || scene.camera.height != h {
        scene.camera.set_viewport(w, h);
    }
}

fn toggle_xray(scene: &mut MemoryScene) {
    scene.shading = match scene.shading {
        Shading::Wireframe { xray } => Shading::Wireframe { xray: !xray },
        Shading::Solid { xray } => Shading::Solid { xray: !xray },
        other => other,
    };
}

fn toggle_projection(camera: &mut OrbitCamera) {
    camera.projection = match camera.projection {
        Projection::Perspective => Projection::Orthographic,
        Projection::Orthographic => Projection::Perspective,
    };
}

fn draw_scene(scene: &MemoryScene, cursor_3d: Option<WorldPoint>) {
    clear_background(BACKGROUND);
    let camera = &scene.camera;

    for (_, mesh) in scene.drawable_meshes() {
        for (a, b) in mesh.unique_edges() {
            let (Some(pa), Some(pb)) = (
                camera.world_to_screen(mesh.vertices[a]),
                camera.world_to_screen(mesh.vertices[b]),
            ) else {
                continue;
            };
            draw_line(pa.x, pa.y, pb.x, pb.y, 1.0, WIRE);
        }
    }

    if let Some(p) = cursor_3d.and_then(|c| camera.world_to_screen(c)) {
        draw_circle_lines(p.x, p.y, 8.0, 1.5, CURSOR_3D);
        draw_line(p.x - 12.0, p.y, p.x + 12.0, p.y, 1.0, CURSOR_3D);
        draw_line(p.x, p.y - 12.0, p.x, p.y + 12.0, 1.0, CURSOR_3D);
    }
}

fn draw_points(scene: &MemoryScene, points: &[WorldPoint], radius: f32, color: Color) {
    for p in points.iter().filter_map(|&w| scene.camera.world_to_screen(w)) {
        draw_circle(p.x, p.y, radius, color);
    }
}

fn draw_status(lines: &[String]) {
    for (i, line) in lines.iter().enumerate() {
        draw_text(line, 12.0, 22.0 + i as f32 * 20.0, 20.0, TEXT);
    }
}

/// Write the hidden-object list to disk so `cargo xtask recover` can undo it
fn write_recovery_file(session: &SnapSession<'_, MemoryScene>) {
    let hidden = session.engine().hidden_objects();
    if hidden.is_empty() {
        return;
    }
    let path = RecoveryRecord::default_path();
    match RecoveryRecord::new(hidden.to_vec()).save(&path) {
        Ok(()) => log::info!("recovery record written to {}", path.display()),
        Err(e) => log::warn!("could not write recovery record {}: {}", path.display(), e),
    }
}

fn remove_recovery_file() {
    let path = RecoveryRecord::default_path();
    if path.exists() {
        if let Err(e) = std::fs::remove_file(&path) {
            log::warn!("could not remove recovery record {}: {}", path.display(), e);
        }
    }
}

/// Modal snapping loop. Returns the last snap result when the user ends it.
async fn snap_modal(
    scene: &mut MemoryScene,
    config: &SnapConfig,
    cursor_3d: &mut Option<WorldPoint>,
) -> Result<SnapResult, SnapError> {
    let mut session = SnapSession::start(scene, config.clone())?;
    write_recovery_file(&session);

    let mut pointer = cursor();
    let mut orbit = Orbit::default();
    session.query_now(pointer)?;

    loop {
        if is_mouse_button_pressed(MouseButton::Left) || is_key_pressed(KeyCode::Escape) {
            break;
        }

        sync_viewport(session.host_mut());
        let now = get_time();

        // Camera moves re-query at the same pointer; the engine notices the new view
        if orbit.update(&mut session.host_mut().camera) {
            session.pointer_moved(pointer, now);
        }
        if is_key_pressed(KeyCode::P) {
            toggle_projection(&mut session.host_mut().camera);
            session.pointer_moved(pointer, now);
        }
        if is_key_pressed(KeyCode::Z) {
            toggle_xray(session.host_mut());
            session.refresh_shading();
            session.query_now(pointer)?;
        }
        for (key, category) in CATEGORY_KEYS {
            if is_key_pressed(key) {
                session.set_category(category, pointer)?;
            }
        }

        let current = cursor();
        if current != pointer {
            pointer = current;
            session.pointer_moved(pointer, now);
        }
        if let Some(result) = session.tick(now)? {
            if result.snapped {
                *cursor_3d = result.location;
            }
        }

        let host = session.host();
        let last = session.last_result();
        draw_scene(host, *cursor_3d);
        draw_points(host, &session.engine().candidate_points(), 2.5, CANDIDATE);
        match last.location {
            Some(location) if last.snapped => draw_points(host, &[location], 5.0, SNAP_RED),
            _ => draw_points(host, &last.nearby, 4.0, SNAP_RED),
        }
        draw_status(&[
            format!("SNAP: {}", session.category()),
            format!(
                "{} candidates, {} ({}{})",
                session.engine().candidate_count(),
                host.shading.label(),
                if session.engine().is_xray() { "x-ray" } else { "occluded" },
                if host.local_view { ", local view" } else { "" },
            ),
            "1 points  2 midpoints  3 faces  O origins  LMB/Esc done".to_string(),
        ]);

        next_frame().await;
    }

    session.finish()
}

#[macroquad::main(window_conf)]
async fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);
    env_logger::init();

    let args = Args::from_env();

    let document = match &args.scene {
        Some(path) if path.exists() => match SceneDocument::load(path) {
            Ok(doc) => doc,
            Err(e) => {
                log::error!("failed to load {}: {}", path.display(), e);
                return;
            }
        },
        Some(path) => {
            log::info!("{} does not exist yet, starting from the sample scene", path.display());
            SceneDocument::sample()
        }
        None => SceneDocument::sample(),
    };

    let config = match SnapConfig::load_or_default(SnapConfig::default_path()) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("ignoring snap config: {}", e);
            SnapConfig::default()
        }
    };

    let mut camera = OrbitCamera::looking_at(WorldPoint::ZERO, 14.0, screen_width(), screen_height());
    camera.rotate(0.6, 0.45);
    let mut scene = MemoryScene::new(document, camera);
    scene.local_view = args.local;

    let mut orbit = Orbit::default();
    let mut cursor_3d: Option<WorldPoint> = None;
    let mut message = String::from("S to snap");

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        sync_viewport(&mut scene);
        orbit.update(&mut scene.camera);

        if is_key_pressed(KeyCode::Z) {
            toggle_xray(&mut scene);
        }
        if is_key_pressed(KeyCode::P) {
            toggle_projection(&mut scene.camera);
        }
        if is_key_pressed(KeyCode::L) {
            scene.local_view = !scene.local_view;
        }

        if is_key_pressed(KeyCode::S) {
            let outcome = snap_modal(&mut scene, &config, &mut cursor_3d).await;
            remove_recovery_file();
            message = match outcome {
                Ok(result) => match result.location {
                    Some(p) => format!("snapped to ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z),
                    None => "no snap".to_string(),
                },
                Err(e) => {
                    log::warn!("snapping ended: {}", e);
                    e.to_string()
                }
            };
            // The Esc that ended the session must not also quit
            next_frame().await;
            continue;
        }

        draw_scene(&scene, cursor_3d);
        draw_status(&[
            message.clone(),
            format!(
                "{}{}  S snap  Z x-ray  P projection  L local view  Esc quit",
                scene.shading.label(),
                if scene.local_view { " (local)" } else { "" },
            ),
        ]);

        next_frame().await;
    }

    if let Some(path) = &args.scene {
        if let Err(e) = scene.document().save(path) {
            log::error!("failed to save {}: {}", path.display(), e);
        }
    }
}
