use std::path::PathBuf;

use clap::ValueHint;
use glam::Vec3;

use crate::camera::{Camera, ControllerKind};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum LogFormat {
    Compact,
    Full,
    Pretty,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Compact => f.write_str("compact"),
            LogFormat::Full => f.write_str("full"),
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, clap::Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Logging output filters; comma-separated
    #[arg(
        short,
        long,
        default_value = "warn,gltf_viewer=info",
        env = "GLTF_VIEWER_LOG"
    )]
    pub log_filter: String,
    /// Logging output format
    #[arg(long, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
    /// Window width, or image width with --output
    #[arg(long, default_value_t = 1280)]
    pub width: u32,
    /// Window height, or image height with --output
    #[arg(long, default_value_t = 720)]
    pub height: u32,
    /// Initial camera instead of one framing the whole scene
    #[arg(
        long,
        value_parser = parse_lookat,
        allow_hyphen_values = true,
        value_name = "EYE_X,EYE_Y,EYE_Z,CENTER_X,CENTER_Y,CENTER_Z,UP_X,UP_Y,UP_Z"
    )]
    pub lookat: Option<Camera>,
    /// GLSL ES 3.0 vertex shader replacing the built-in one
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub vertex_shader: Option<PathBuf>,
    /// GLSL ES 3.0 fragment shader replacing the built-in one
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub fragment_shader: Option<PathBuf>,
    /// Render a single frame into this PNG file and exit
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
    /// Camera controller used at startup
    #[arg(long, value_enum, default_value_t = ControllerKind::Trackball)]
    pub controller: ControllerKind,
    /// The .gltf or .glb file to view
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

/// Parses nine comma-separated numbers into a camera, as printed by
/// [`Camera::to_lookat_arg`].
fn parse_lookat(s: &str) -> Result<Camera, Box<dyn std::error::Error + Send + Sync + 'static>> {
    let values = s
        .trim()
        .split(',')
        .map(|value| value.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()?;
    let values: [f32; 9] = values
        .try_into()
        .map_err(|values: Vec<f32>| format!("expected 9 numbers, got {}", values.len()))?;
    let eye = Vec3::from_slice(&values[0..3]);
    let center = Vec3::from_slice(&values[3..6]);
    let up = Vec3::from_slice(&values[6..9]);
    if eye == center {
        return Err("eye and center must differ".into());
    }
    Ok(Camera::new(eye, center, up))
}

/// Set up log output on stderr
pub(crate) fn initialize_tracing(log_filter: &str, log_format: LogFormat) {
    let tsub = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter);

    match log_format {
        LogFormat::Compact => tsub.compact().init(),
        LogFormat::Full => tsub.init(),
        LogFormat::Pretty => tsub.pretty().init(),
        LogFormat::Json => tsub.json().init(),
    }
}
