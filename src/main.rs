mod args;
mod compose;
mod reddit;
mod video;
mod youtube;

use clap::Parser;
use std::fs;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use args::Args;
use youtube::YouTube;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info") // set to "debug" for more logs
        .init();

    info!("Starting reddit meme video pipeline");

    let args = Args::parse();

    fs::create_dir_all(&args.output_dir)?;
    info!("Output directory ready: {}", args.output_dir);

    let client = reqwest::Client::new();

    // Anything going wrong here is fatal; without an authorized handle there
    // is nothing to loop over.
    info!("Authorizing with YouTube");
    let youtube = youtube::authenticate(&client).await?;
    info!("YouTube authorization complete");

    let mut count: u32 = 1;
    loop {
        info!("Generating and uploading a new reddit meme video (cycle {})", count);
        match run_cycle(&client, &youtube, &args, count).await {
            Ok(video_id) => info!("Uploaded: https://youtu.be/{}", video_id),
            Err(e) => error!("Cycle {} failed: {:#}", count, e),
        }
        count += 1;

        info!(
            "Done. Waiting {} seconds before the next upload",
            args.interval_secs
        );
        sleep(Duration::from_secs(args.interval_secs)).await;
    }
}

/// One full select -> compose -> assemble -> upload pass. Errors from any
/// stage bubble up here and are swallowed at the loop boundary; files already
/// written stay on disk.
async fn run_cycle(
    client: &reqwest::Client,
    youtube: &YouTube,
    args: &Args,
    count: u32,
) -> anyhow::Result<String> {
    let post = reddit::fetch_meme_post(client, args.limit).await?;
    info!("Meme: {}", post.title);
    info!("Image: {}", post.image_url);

    let img_path =
        compose::compose_meme_image(client, &post.image_url, &args.output_dir, count).await?;
    let video_path = video::assemble_clip(&img_path, &args.music, args.duration_secs)?;

    youtube::upload_video(
        client,
        youtube,
        &video_path,
        &post.title,
        &post.description(),
    )
    .await
}
