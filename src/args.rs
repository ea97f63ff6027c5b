use clap::Parser;

#[derive(Parser, Debug)]
pub struct Args {
    /// Directory the composed images and finished clips are written to.
    #[clap(long, default_value = "meme_videos")]
    pub output_dir: String,

    /// Background music mixed under every clip; a missing file renders silent clips.
    #[clap(long, default_value = "background.mp3")]
    pub music: String,

    #[clap(long, default_value_t = 7200)]
    pub interval_secs: u64,

    #[clap(long, default_value_t = 8)]
    pub duration_secs: u64,

    /// How many hot posts to request from the listing endpoint.
    #[clap(long, default_value_t = 50)]
    pub limit: usize,
}
