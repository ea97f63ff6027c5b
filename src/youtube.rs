use anyhow::Context;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use tracing::info;

const CLIENT_SECRET_FILE: &str = "client_secret.json";
const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
const TAGS: [&str; 4] = ["memes", "funny", "reddit memes", "dankmemes"];
const CATEGORY_COMEDY: &str = "23";
pub const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: InstalledSecret,
}

#[derive(Debug, Deserialize)]
struct InstalledSecret {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

/// Authorized handle for the upload API, created once at startup and reused
/// for every cycle. No refresh logic; a new run reauthorizes.
pub struct YouTube {
    access_token: String,
}

/// Interactive installed-app flow: print the consent URL, catch the redirect
/// on a loopback listener, trade the code for an access token. Every failure
/// here is fatal to the process.
pub async fn authenticate(client: &reqwest::Client) -> anyhow::Result<YouTube> {
    let raw = std::fs::read_to_string(CLIENT_SECRET_FILE)
        .with_context(|| format!("Failed to read {}", CLIENT_SECRET_FILE))?;
    let secret: ClientSecretFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not an installed-app client secret", CLIENT_SECRET_FILE))?;
    let secret = secret.installed;

    let listener =
        TcpListener::bind("127.0.0.1:0").context("Failed to open the OAuth callback listener")?;
    let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());

    let auth_url = Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", UPLOAD_SCOPE),
        ],
    )
    .context("Client secret carries an invalid auth_uri")?;

    info!("Open this URL in a browser to authorize uploads:");
    info!("{}", auth_url);

    let code = wait_for_auth_code(&listener)?;

    let token: TokenResponse = client
        .post(&secret.token_uri)
        .form(&[
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("code", code.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await
        .context("Token exchange request failed")?
        .error_for_status()
        .context("Token endpoint rejected the authorization code")?
        .json()
        .await
        .context("Token endpoint returned an unexpected payload")?;

    Ok(YouTube {
        access_token: token.access_token,
    })
}

fn wait_for_auth_code(listener: &TcpListener) -> anyhow::Result<String> {
    let (mut stream, _) = listener
        .accept()
        .context("OAuth callback listener failed while waiting for the browser")?;

    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line)?;

    let code = parse_auth_code(&request_line)
        .context("Authorization callback carried no code parameter")?;

    stream.write_all(
        b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\n\r\nAuthorization received. You can close this tab.",
    )?;
    Ok(code)
}

fn parse_auth_code(request_line: &str) -> Option<String> {
    let path = request_line.split_whitespace().nth(1)?;
    let url = Url::parse(&format!("http://localhost{}", path)).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
}

pub fn truncate_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_CHARS).collect()
}

/// Resumable upload: the metadata POST opens a session, the PUT of the file
/// bytes completes it. Returns the assigned video id.
pub async fn upload_video(
    client: &reqwest::Client,
    youtube: &YouTube,
    video_path: &Path,
    title: &str,
    description: &str,
) -> anyhow::Result<String> {
    let metadata = json!({
        "snippet": {
            "title": truncate_title(title),
            "description": description,
            "tags": TAGS,
            "categoryId": CATEGORY_COMEDY,
        },
        "status": { "privacyStatus": "public" },
    });

    let session = client
        .post(UPLOAD_URL)
        .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
        .bearer_auth(&youtube.access_token)
        .json(&metadata)
        .send()
        .await
        .context("Failed to open the upload session")?
        .error_for_status()
        .context("Upload session request was rejected")?;

    let session_url = session
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .context("Upload session response carried no session URL")?
        .to_string();

    let bytes = tokio::fs::read(video_path)
        .await
        .with_context(|| format!("Failed to read {}", video_path.display()))?;

    let uploaded: UploadResponse = client
        .put(&session_url)
        .bearer_auth(&youtube.access_token)
        .header(CONTENT_TYPE, "video/mp4")
        .body(bytes)
        .send()
        .await
        .context("Video upload failed")?
        .error_for_status()
        .context("Video upload was rejected")?
        .json()
        .await
        .context("Upload response carried no video id")?;

    Ok(uploaded.id)
}
