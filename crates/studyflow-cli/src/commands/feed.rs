use clap::Subcommand;
use studyflow_core::PostId;

use super::{print_json, with_workspace};

#[derive(Subcommand)]
pub enum FeedAction {
    /// List posts, newest first
    List {
        /// Maximum number of posts to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Publish a free-form post
    Post {
        /// Post text
        text: String,
    },
    /// Like a post
    Like {
        /// Post ID
        id: PostId,
    },
    /// Comment on a post
    Comment {
        /// Post ID
        id: PostId,
        /// Comment text
        text: String,
    },
}

pub fn run(user: Option<String>, action: FeedAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        FeedAction::List { limit } => {
            let mut posts = with_workspace(user, |ws, _| ws.posts())?;
            if let Some(limit) = limit {
                posts.truncate(limit);
            }
            print_json(&posts)?;
        }
        FeedAction::Post { text } => {
            let id = with_workspace(user, |ws, _| ws.publish(&text))?;
            print_json(&serde_json::json!({ "post_id": id }))?;
        }
        FeedAction::Like { id } => {
            let likes = with_workspace(user, |ws, _| ws.like(id))?;
            print_json(&serde_json::json!({ "post_id": id, "likes": likes }))?;
        }
        FeedAction::Comment { id, text } => {
            let comments = with_workspace(user, |ws, _| ws.comment(id, &text))?;
            print_json(&serde_json::json!({ "post_id": id, "comments": comments }))?;
        }
    }
    Ok(())
}
