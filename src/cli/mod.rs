pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::app::SessionContext;
use crate::domain::ContentKind;

#[derive(Parser)]
#[command(name = "eddy")]
#[command(about = "Social feed client engine", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/eddy/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Bearer token for the backend
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// User id the token belongs to
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Treat this run as the first after a login
    #[arg(long, global = true)]
    pub fresh_login: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn session(&self) -> SessionContext {
        let session = match &self.token {
            Some(token) => {
                SessionContext::authenticated(self.user.clone().unwrap_or_default(), token.clone())
            }
            None => SessionContext::anonymous(),
        };
        session.with_fresh_login(self.fresh_login)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose and print the home feed
    Feed {
        /// Posts per page (default: from config)
        #[arg(short, long)]
        page_size: Option<usize>,

        /// Extra pages to load after the first
        #[arg(short, long, default_value_t = 0)]
        more: usize,
    },
    /// Toggle the like on a post or reel
    Like {
        /// post or reel
        kind: ContentKind,
        id: String,
    },
    /// Toggle the bookmark on a post or reel
    Bookmark {
        /// post or reel
        kind: ContentKind,
        id: String,
    },
    /// Record a view of a post or reel
    View {
        /// post or reel
        kind: ContentKind,
        id: String,
    },
    /// Play the suggested stories
    Stories {
        /// Index of the story to start from
        #[arg(short, long, default_value_t = 0)]
        start: usize,
    },
}
