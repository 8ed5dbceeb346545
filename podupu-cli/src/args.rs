//! CLI argument definitions using clap.
//!
//! Commands:
//! - podupu add --question <Q> --answer <A>
//! - podupu list [filters]
//! - podupu edit <ID> [fields]
//! - podupu delete <ID>
//! - podupu export --format <csv|json> [filters]
//! - podupu login | signup | logout | whoami

use clap::{Args, Parser, Subcommand};
use podupu_core::{Category, Difficulty, ExportFormat, RiddleFilter, RiddlePatch};
use std::path::PathBuf;

/// Podupu - a shared collection of Telugu riddles
#[derive(Parser, Debug)]
#[command(name = "podupu")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new riddle
    Add {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
        #[arg(long, default_value = "traditional")]
        category: Category,
        #[arg(long, default_value = "easy")]
        difficulty: Difficulty,
    },

    /// Search and browse riddles, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print each riddle's answer
        #[arg(long)]
        show_answers: bool,
    },

    /// Change fields of an existing riddle
    Edit {
        id: String,
        #[arg(long)]
        question: Option<String>,
        #[arg(long)]
        answer: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },

    /// Delete a riddle
    Delete { id: String },

    /// Download the current list as CSV or JSON
    Export {
        #[arg(long)]
        format: ExportFormat,
        /// Output file; defaults to podupu_kathalu.<format>
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Sign in with email and password
    Login(Credentials),

    /// Create an account
    Signup(Credentials),

    /// Sign out and forget the saved session
    Logout,

    /// Show who is signed in
    Whoami,
}

#[derive(Args, Debug, Clone)]
pub struct Credentials {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct FilterArgs {
    /// Text to find in the question or answer
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub category: Option<Category>,
    #[arg(long)]
    pub difficulty: Option<Difficulty>,
    /// Maximum number of riddles to show
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u32).range(10..=2000))]
    pub limit: u32,
}

impl FilterArgs {
    pub fn to_filter(&self) -> RiddleFilter {
        RiddleFilter {
            search: self.search.clone(),
            category: self.category,
            difficulty: self.difficulty,
            limit: self.limit,
        }
    }
}

/// Collects the fields given to `edit` into a patch.
pub fn edit_patch(
    question: Option<&str>,
    answer: Option<&str>,
    category: Option<Category>,
    difficulty: Option<Difficulty>,
) -> RiddlePatch {
    let mut patch = RiddlePatch::new();
    if let Some(question) = question {
        patch = patch.question(question);
    }
    if let Some(answer) = answer {
        patch = patch.answer(answer);
    }
    if let Some(category) = category {
        patch = patch.category(category);
    }
    if let Some(difficulty) = difficulty {
        patch = patch.difficulty(difficulty);
    }
    patch
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
