use anyhow::Context;
use rand::seq::SliceRandom;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::{debug, info};

pub const REDDIT_SUBS: &[&str] = &["memes", "funny", "dankmemes", "MemeEconomy", "wholesomememes"];

/// Reddit refuses the default library user agent, so identify ourselves.
pub const CLIENT_UA: &str = "MemeBot/1.0";

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".png", ".jpeg"];
const MIN_TITLE_CHARS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct RedditListing {
    pub data: RedditListingData,
}

#[derive(Debug, Deserialize)]
pub struct RedditListingData {
    pub children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
pub struct RedditChild {
    pub data: RedditPost,
}

#[derive(Debug, Deserialize)]
pub struct RedditPost {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub permalink: String,
    pub over_18: Option<bool>,
}

/// One post picked from a hot listing, reduced to what the pipeline needs.
#[derive(Debug, Clone)]
pub struct MemePost {
    pub title: String,
    pub image_url: String,
    pub permalink: String,
}

impl MemePost {
    pub fn description(&self) -> String {
        format!(
            "{}\n\nFrom Reddit: {}\n#memes #funny #reddit",
            self.title, self.permalink
        )
    }
}

pub async fn fetch_meme_post(
    client: &reqwest::Client,
    limit: usize,
) -> anyhow::Result<MemePost> {
    let sub = REDDIT_SUBS
        .choose(&mut rand::thread_rng())
        .context("Subreddit list is empty")?;
    let url = format!("https://www.reddit.com/r/{}/hot.json?limit={}", sub, limit);
    debug!("Fetching hot listing from {}", url);

    let res = client
        .get(&url)
        .header(USER_AGENT, CLIENT_UA)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let parsed: RedditListing = serde_json::from_str(&res)
        .with_context(|| format!("Unexpected listing payload from r/{}", sub))?;

    select_post(parsed, sub)
}

fn select_post(listing: RedditListing, sub: &str) -> anyhow::Result<MemePost> {
    let eligible: Vec<RedditPost> = listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(is_eligible)
        .collect();

    info!("{} eligible posts in r/{}", eligible.len(), sub);

    let post = eligible
        .choose(&mut rand::thread_rng())
        .with_context(|| format!("No eligible meme posts found in r/{}", sub))?;

    Ok(MemePost {
        title: post.title.clone(),
        image_url: post.url.clone(),
        permalink: format!("https://reddit.com{}", post.permalink),
    })
}

/// Safe-for-work, points at a still image and carries a usable title.
fn is_eligible(post: &RedditPost) -> bool {
    !post.over_18.unwrap_or(false)
        && IMAGE_EXTENSIONS.iter().any(|ext| post.url.ends_with(ext))
        && post.title.chars().count() > MIN_TITLE_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, url: &str, over_18: Option<bool>) -> RedditPost {
        RedditPost {
            title: title.to_string(),
            url: url.to_string(),
            permalink: "/r/memes/comments/abc123/some_post/".to_string(),
            over_18,
        }
    }

    fn listing(posts: Vec<RedditPost>) -> RedditListing {
        RedditListing {
            data: RedditListingData {
                children: posts.into_iter().map(|data| RedditChild { data }).collect(),
            },
        }
    }

    const FIXTURE: &str = r#"{
        "data": {
            "children": [
                {"data": {"title": "Cat does a thing", "url": "https://i.redd.it/a.png", "permalink": "/r/memes/comments/1/cat/", "over_18": false}},
                {"data": {"title": "Very funny but explicit", "url": "https://i.redd.it/b.jpg", "permalink": "/r/memes/comments/2/x/", "over_18": true}},
                {"data": {"title": "A gif not an image", "url": "https://i.redd.it/c.gif", "permalink": "/r/memes/comments/3/y/", "over_18": false}},
                {"data": {"title": "Meme", "url": "https://i.redd.it/d.jpeg", "permalink": "/r/memes/comments/4/z/", "over_18": false}},
                {"data": {"title": "Linked discussion thread", "url": "https://www.reddit.com/r/memes/comments/5/w/"}}
            ]
        }
    }"#;

    #[test]
    fn filter_accepts_only_safe_image_posts_with_long_titles() {
        let parsed: RedditListing = serde_json::from_str(FIXTURE).unwrap();
        let accepted: Vec<String> = parsed
            .data
            .children
            .into_iter()
            .map(|c| c.data)
            .filter(is_eligible)
            .map(|p| p.title)
            .collect();
        // NSFW, non-image extension and a 4-char title are each rejected.
        assert_eq!(accepted, vec!["Cat does a thing".to_string()]);
    }

    #[test]
    fn extension_match_is_case_sensitive_and_suffix_exact() {
        assert!(!is_eligible(&post("Shouting cat", "https://i.redd.it/a.JPG", None)));
        assert!(!is_eligible(&post(
            "Query string cat",
            "https://i.redd.it/a.jpg?width=640",
            None
        )));
        assert!(is_eligible(&post("Plain cat", "https://i.redd.it/a.jpg", None)));
        assert!(is_eligible(&post("Other cat", "https://i.redd.it/a.jpeg", None)));
    }

    #[test]
    fn title_must_exceed_five_characters() {
        assert!(!is_eligible(&post("abcde", "https://i.redd.it/a.png", None)));
        assert!(is_eligible(&post("abcdef", "https://i.redd.it/a.png", None)));
    }

    #[test]
    fn missing_nsfw_flag_counts_as_safe() {
        assert!(is_eligible(&post("Unflagged cat", "https://i.redd.it/a.png", None)));
        assert!(!is_eligible(&post(
            "Flagged cat",
            "https://i.redd.it/a.png",
            Some(true)
        )));
    }

    #[test]
    fn empty_filtered_set_is_an_error_not_a_fallback() {
        let only_bad = listing(vec![
            post("Explicit", "https://i.redd.it/a.png", Some(true)),
            post("No image here at all", "https://v.redd.it/clip.mp4", Some(false)),
        ]);
        let err = select_post(only_bad, "memes").unwrap_err();
        assert!(err.to_string().contains("No eligible meme posts"));
    }

    #[test]
    fn permalink_is_rooted_at_reddit() {
        let picked = select_post(
            listing(vec![post("Cat does a thing", "https://i.redd.it/a.png", None)]),
            "memes",
        )
        .unwrap();
        assert_eq!(picked.title, "Cat does a thing");
        assert_eq!(
            picked.permalink,
            "https://reddit.com/r/memes/comments/abc123/some_post/"
        );
    }

    #[test]
    fn description_links_back_to_the_post() {
        let picked = MemePost {
            title: "Cat does a thing".to_string(),
            image_url: "https://i.redd.it/a.png".to_string(),
            permalink: "https://reddit.com/r/memes/comments/1/cat/".to_string(),
        };
        let description = picked.description();
        assert!(description.starts_with("Cat does a thing"));
        assert!(description.contains("From Reddit: https://reddit.com/r/memes/comments/1/cat/"));
        assert!(description.ends_with("#memes #funny #reddit"));
    }
}
