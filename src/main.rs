use std::error::Error;
use std::fmt::Display;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use glam::DVec2;
use sdl2::event::Event;
use sdl2::keyboard::{Keycode, Scancode};
use sdl2::video::{GLContext, GLProfile, Window};
use sdl2::{EventPump, Sdl, VideoSubsystem};

mod bounds;
mod camera;
mod cli;
mod gltf;
mod renderer;
mod session;

use bounds::SceneBounds;
use camera::{Camera, CameraController, ControllerKind, InputState, Key};
use cli::Cli;
use renderer::program::ShaderSources;
use renderer::{headless, Renderer};
use session::ViewerSession;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::initialize_tracing(&cli.log_filter, cli.log_format);
    if let Err(err) = run(cli) {
        tracing::error!("{err:#}");
        return Err(err);
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let document = gltf::load(&cli.file)
        .with_context(|| format!("could not load {}", cli.file.display()))?;
    let bounds = SceneBounds::compute(&document);
    tracing::debug!(min = ?bounds.min, max = ?bounds.max, "computed scene bounds");

    let title = format!(
        "{} - {}",
        env!("CARGO_PKG_NAME"),
        cli.file.file_name().unwrap_or_default().to_string_lossy()
    );
    let context = GlWindow::new(&title, cli.width, cli.height, cli.output.is_some())?;

    let shaders = ShaderSources {
        vertex_shader: cli.vertex_shader.clone(),
        fragment_shader: cli.fragment_shader.clone(),
    };
    let renderer = Renderer::new(document, bounds, &shaders)
        .context("could not create the shader program")?;

    let camera = cli.lookat.unwrap_or_else(|| bounds.default_camera());
    let mut controller = CameraController::new(cli.controller, bounds.controller_speed());
    controller.set_camera(camera);
    let mut session = ViewerSession::default();

    match &cli.output {
        Some(output) => {
            write_screenshot(&renderer, &camera, &session, cli.width, cli.height, output)?;
            tracing::info!(path = %output.display(), "wrote rendered image");
            Ok(())
        }
        None => {
            let mut event_pump = context.sdl.event_pump().map_err(SdlErr)?;
            run_interactive(&context, &mut event_pump, &renderer, &mut controller, &mut session);
            Ok(())
        }
    }
}

/// The SDL window and its GL context. The context must outlive everything
/// that owns GL objects.
struct GlWindow {
    sdl: Sdl,
    video: VideoSubsystem,
    window: Window,
    _gl_context: GLContext,
}

impl GlWindow {
    fn new(title: &str, width: u32, height: u32, hidden: bool) -> anyhow::Result<GlWindow> {
        let sdl = sdl2::init().map_err(SdlErr)?;
        let video = sdl.video().map_err(SdlErr)?;
        let gl_attr = video.gl_attr();
        gl_attr.set_context_profile(GLProfile::GLES);
        gl_attr.set_context_version(3, 0);
        gl_attr.set_depth_size(24);
        // Linear->SRGB conversion is done in the fragment shader.
        gl_attr.set_framebuffer_srgb_compatible(false);

        let mut builder = video.window(title, width, height);
        builder.opengl();
        if hidden {
            builder.hidden();
        } else {
            builder.resizable();
        }
        let window = builder.build()?;
        let gl_context = window.gl_create_context().map_err(SdlErr)?;
        renderer::init_gl(&video, !hidden);
        Ok(GlWindow {
            sdl,
            video,
            window,
            _gl_context: gl_context,
        })
    }
}

fn write_screenshot(
    renderer: &Renderer,
    camera: &Camera,
    session: &ViewerSession,
    width: u32,
    height: u32,
    output: &Path,
) -> anyhow::Result<()> {
    let pixels = headless::render_to_image(width, height, || {
        renderer.draw(camera, (width, height), session)
    })?;
    image::save_buffer(output, &pixels, width, height, image::ColorType::Rgb8)
        .with_context(|| format!("could not write {}", output.display()))?;
    Ok(())
}

fn run_interactive(
    context: &GlWindow,
    event_pump: &mut EventPump,
    renderer: &Renderer,
    controller: &mut CameraController,
    session: &mut ViewerSession,
) {
    let mut last_frame = Instant::now();
    'running: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                Event::KeyDown {
                    keycode: Some(keycode),
                    repeat: false,
                    ..
                } => handle_key(keycode, context, controller, session),
                _ => {}
            }
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;
        if elapsed > 0.0 {
            let input = sample_input(event_pump);
            controller.update(&input, elapsed);
        }

        session.advance();
        renderer.draw(&controller.camera(), context.window.drawable_size(), session);
        context.window.gl_swap_window();
    }
}

fn handle_key(
    keycode: Keycode,
    context: &GlWindow,
    controller: &mut CameraController,
    session: &mut ViewerSession,
) {
    match keycode {
        Keycode::Num1 | Keycode::Num2 => {
            let kind = if keycode == Keycode::Num1 {
                ControllerKind::FirstPerson
            } else {
                ControllerKind::Trackball
            };
            if controller.kind() != kind {
                *controller = controller.switch_to(kind);
            }
        }
        Keycode::L => session.toggle_light_from_camera(),
        Keycode::O => session.toggle_occlusion(),
        Keycode::N => session.toggle_normal_map(),
        Keycode::B => session.toggle_tbn(),
        Keycode::V => session.toggle_view_normals(),
        Keycode::R => session.toggle_auto_rotate_light(),
        Keycode::C => session.toggle_auto_evolve_color(),
        Keycode::J => session.step_light_angles(-1.0, 0.0),
        Keycode::K => session.step_light_angles(1.0, 0.0),
        Keycode::U => session.step_light_angles(0.0, -1.0),
        Keycode::I => session.step_light_angles(0.0, 1.0),
        Keycode::LeftBracket => session.decrease_intensity(),
        Keycode::RightBracket => session.increase_intensity(),
        Keycode::P => {
            let lookat = controller.camera().to_lookat_arg();
            match context.video.clipboard().set_clipboard_text(&format!("--lookat {lookat}")) {
                Ok(()) => tracing::info!(%lookat, "copied camera to the clipboard"),
                Err(err) => tracing::warn!("could not copy camera to the clipboard: {err}"),
            }
        }
        _ => return,
    }
    tracing::debug!(?keycode, "handled key press");
}

/// Takes a snapshot of the keys and mouse state the camera controllers use.
fn sample_input(event_pump: &EventPump) -> InputState {
    const KEYS: [(Scancode, Key); 11] = [
        (Scancode::W, Key::W),
        (Scancode::A, Key::A),
        (Scancode::S, Key::S),
        (Scancode::D, Key::D),
        (Scancode::Q, Key::Q),
        (Scancode::E, Key::E),
        (Scancode::Up, Key::Up),
        (Scancode::Down, Key::Down),
        (Scancode::LShift, Key::LeftShift),
        (Scancode::LCtrl, Key::LeftCtrl),
        (Scancode::LAlt, Key::LeftAlt),
    ];
    let keyboard = event_pump.keyboard_state();
    let mouse = event_pump.mouse_state();
    InputState {
        cursor: DVec2::new(mouse.x() as f64, mouse.y() as f64),
        middle_button: mouse.middle(),
        keys: KEYS
            .iter()
            .filter(|(scancode, _)| keyboard.is_scancode_pressed(*scancode))
            .map(|&(_, key)| key)
            .collect(),
    }
}

#[derive(Debug)]
pub struct SdlErr(String);
impl Display for SdlErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sdl error: {}", self.0)
    }
}
impl Error for SdlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
