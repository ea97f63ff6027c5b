use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{error, info};

use crate::compose::CANVAS_SIZE;

pub const OUTRO_TEXT: &str = "Subscribe Please ❤️";
pub const OUTRO_SECONDS: u64 = 3;
const FRAME_RATE: u32 = 24;
const MUSIC_VOLUME: f64 = 0.4;
const OUTRO_FONT_FILE: &str = "arial.ttf";
const OUTRO_FONT_SIZE: u32 = 80;

/// Typeface used for the outro text. The preferred face is best-effort; a
/// missing font file falls back to whatever the renderer ships with.
#[derive(Debug, PartialEq)]
pub enum OutroFont {
    Truetype(PathBuf),
    Builtin,
}

pub fn resolve_outro_font(preferred: &Path) -> OutroFont {
    if preferred.exists() {
        OutroFont::Truetype(preferred.to_path_buf())
    } else {
        OutroFont::Builtin
    }
}

fn drawtext_filter(font: &OutroFont) -> String {
    let face = match font {
        OutroFont::Truetype(path) => format!("fontfile={}:", path.display()),
        OutroFont::Builtin => String::new(),
    };
    format!(
        "drawtext={}text='{}':fontsize={}:fontcolor=white:x=(w-text_w)/2:y=(h-text_h)/2",
        face, OUTRO_TEXT, OUTRO_FONT_SIZE
    )
}

/// Renders the single outro frame next to the composed image
/// (`meme_NNN.jpg` -> `meme_NNN_subscribe.jpg`).
fn render_outro(img_path: &Path) -> anyhow::Result<PathBuf> {
    let stem = img_path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Invalid composed image path {}", img_path.display()))?;
    let outro_path = img_path.with_file_name(format!("{}_subscribe.jpg", stem));

    let font = resolve_outro_font(Path::new(OUTRO_FONT_FILE));
    if font == OutroFont::Builtin {
        info!("{} not found, using the default typeface", OUTRO_FONT_FILE);
    }

    let color_src = format!("color=c=black:s={0}x{0}", CANVAS_SIZE);
    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            &color_src,
            "-vf",
            &drawtext_filter(&font),
            "-frames:v",
            "1",
        ])
        .arg(&outro_path)
        .status()
        .context("Failed to launch ffmpeg for the outro frame")?;

    if !status.success() {
        error!("ffmpeg failed to render the outro frame");
        anyhow::bail!("ffmpeg failed to render {}", outro_path.display());
    }
    Ok(outro_path)
}

/// Argument plan for the final encode: a (duration - 3)s still of the meme,
/// a 3s outro still, 24 fps H.264, and optionally the background track looped
/// under the whole clip at reduced volume.
pub fn build_encode_args(
    img_path: &Path,
    outro_path: &Path,
    music: Option<&Path>,
    duration_secs: u64,
    out_path: &Path,
) -> Vec<String> {
    let main_secs = duration_secs - OUTRO_SECONDS;
    let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    args.extend([
        "-loop".into(),
        "1".into(),
        "-t".into(),
        main_secs.to_string(),
        "-i".into(),
        img_path.display().to_string(),
        "-loop".into(),
        "1".into(),
        "-t".into(),
        OUTRO_SECONDS.to_string(),
        "-i".into(),
        outro_path.display().to_string(),
    ]);

    if let Some(music) = music {
        args.extend([
            "-stream_loop".into(),
            "-1".into(),
            "-i".into(),
            music.display().to_string(),
        ]);
    }

    let mut filter = format!(
        "[0:v]fps={fps},format=yuv420p,setsar=1[v0];\
         [1:v]fps={fps},format=yuv420p,setsar=1[v1];\
         [v0][v1]concat=n=2:v=1:a=0[v]",
        fps = FRAME_RATE
    );
    if music.is_some() {
        filter.push_str(&format!(";[2:a]volume={}[a]", MUSIC_VOLUME));
    }

    args.extend(["-filter_complex".into(), filter, "-map".into(), "[v]".into()]);
    if music.is_some() {
        args.extend([
            "-map".into(),
            "[a]".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
        ]);
    }
    args.extend([
        "-c:v".into(),
        "libx264".into(),
        "-r".into(),
        FRAME_RATE.to_string(),
        "-t".into(),
        duration_secs.to_string(),
        out_path.display().to_string(),
    ]);
    args
}

/// Turns the composed image into the finished clip and returns the .mp4 path.
pub fn assemble_clip(
    img_path: &Path,
    music_file: &str,
    duration_secs: u64,
) -> anyhow::Result<PathBuf> {
    anyhow::ensure!(
        duration_secs > OUTRO_SECONDS,
        "Clip duration must exceed the {}s outro",
        OUTRO_SECONDS
    );

    let outro_path = render_outro(img_path)?;
    let out_path = img_path.with_extension("mp4");

    let music = Path::new(music_file);
    let music = if music.exists() {
        Some(music)
    } else {
        info!("No background music at {}; rendering a silent clip", music_file);
        None
    };

    let args = build_encode_args(img_path, &outro_path, music, duration_secs, &out_path);
    let status = Command::new("ffmpeg")
        .args(&args)
        .status()
        .context("Failed to launch ffmpeg for the final encode")?;

    if !status.success() {
        error!("ffmpeg failed to encode the final clip");
        anyhow::bail!("ffmpeg failed to encode {}", out_path.display());
    }
    info!("Clip written to {}", out_path.display());
    Ok(out_path)
}
