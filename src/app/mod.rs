pub mod config;
pub mod logging_system;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging_system::setup_logging;

use crate::collector::{FeedFetcher, FeedRegistry};
use crate::domain::PipelineError;
use crate::model::{KeywordModel, LeadModel, SharedModel};
use crate::pipeline::{Collaborators, Pipeline, RunReport};
use crate::stages::{Classifier, Summarizer};
use crate::store::ArticleStore;
use anyhow::Context;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Execute one pipeline run and print its report (default)
    Run,
    /// Manage the feed list
    Feeds {
        #[command(subcommand)]
        action: FeedsAction,
    },
    /// Show the newest stored articles
    Articles {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum FeedsAction {
    /// Print every registered feed
    List,
    /// Register a feed URL
    Add { url: String },
    /// Unregister a feed URL
    Remove { url: String },
}

pub struct App {
    config: Config,
}

impl App {
    /// Parse arguments and environment, merge the config file if given.
    pub fn from_args<I, T>(args: I) -> Result<(Self, Command), PipelineError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Cli::command().get_matches_from(args);
        let cli = Cli::from_arg_matches(&matches)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        let config = cli.config.resolve(&matches)?;
        Ok((Self::new(config), cli.command.unwrap_or(Command::Run)))
    }

    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn open_store(&self) -> Result<ArticleStore, PipelineError> {
        Ok(ArticleStore::open(&self.config.store_path)?)
    }

    /// Wire the production collaborators: HTTP feed fetching, keyword
    /// classification, lead summarization and the sled store.
    pub fn collaborators(&self) -> anyhow::Result<Collaborators> {
        let registry = FeedRegistry::load_or_empty(&self.config.feeds_path);
        let fetcher = FeedFetcher::from_registry(&registry, self.config.http_timeout())
            .context("failed to build feed fetcher")?;

        let classifier_model = Arc::new(SharedModel::lazy(
            "keyword",
            KeywordModel::with_default_keywords,
        ));
        let summary_model = Arc::new(SharedModel::lazy("lead", || Ok(LeadModel::new())));
        let store = self.open_store().context("failed to open article store")?;

        Ok(Collaborators {
            acquire: Arc::new(fetcher),
            classify: Arc::new(Classifier::new(
                classifier_model,
                self.config.labels.clone(),
                self.config.threshold,
            )),
            summarize: Arc::new(Summarizer::new(
                summary_model,
                self.config.summary_max_words,
            )),
            persist: Arc::new(store),
        })
    }

    pub fn run_pipeline(&self) -> anyhow::Result<RunReport> {
        let collaborators = self.collaborators()?;
        let pipeline = Pipeline::new(self.config.pipeline_settings(), collaborators)?;
        Ok(pipeline.run()?)
    }

    pub fn execute(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Run => {
                let report = self.run_pipeline()?;
                println!("{report}");
            }
            Command::Feeds { action } => self.manage_feeds(action)?,
            Command::Articles { limit } => self.show_articles(limit)?,
        }
        Ok(())
    }

    fn manage_feeds(&self, action: FeedsAction) -> anyhow::Result<()> {
        let mut registry = FeedRegistry::open(&self.config.feeds_path).with_context(|| {
            format!("failed to open {}", self.config.feeds_path.display())
        })?;

        match action {
            FeedsAction::List => {
                if registry.feeds().is_empty() {
                    println!("No feeds registered.");
                }
                for feed in registry.feeds() {
                    println!("{feed}");
                }
            }
            FeedsAction::Add { url } => {
                if registry.add_feed(&url)? {
                    println!("Feed added: {url}");
                } else {
                    println!("Feed already exists: {url}");
                }
            }
            FeedsAction::Remove { url } => {
                if registry.remove_feed(&url)? {
                    println!("Feed removed: {url}");
                } else {
                    println!("Feed not registered: {url}");
                }
            }
        }
        Ok(())
    }

    fn show_articles(&self, limit: usize) -> anyhow::Result<()> {
        let store = self.open_store()?;
        let articles = store.recent(limit)?;
        if articles.is_empty() {
            println!("No articles stored.");
            return Ok(());
        }

        for article in articles {
            let categories: Vec<&str> = article.categories.iter().map(String::as_str).collect();
            println!("{}", article.title);
            println!("  {} | {}", article.published.to_rfc3339(), article.source);
            println!("  categories: {}", categories.join(", "));
            println!("  summary: {}", article.summary.as_deref().unwrap_or(""));
            println!("  {}", article.link);
            println!();
        }
        Ok(())
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                message,
                "panic occurred"
            );
        } else {
            error!(thread = thread_name, message, "panic occurred");
        }
    }));
}

pub fn main() -> anyhow::Result<()> {
    let (app, command) = App::from_args(std::env::args_os()).context("failed to load configuration")?;

    if let Err(e) = setup_logging(app.config().log_level, app.config().log_format) {
        eprintln!("Warning: logging already initialized: {e}");
    }
    install_panic_hook();

    info!(
        version = crate::VERSION,
        filter_workers = app.config().filter_workers,
        summarize_workers = app.config().summarize_workers,
        "starting pulse-pipeline"
    );
    app.execute(command)
}
