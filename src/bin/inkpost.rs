use clap::{ArgAction, Parser, Subcommand};
use inkpost::blog::{read_time_label, word_count};
use inkpost::config::Config;
use inkpost::drafts::DraftStore;
use inkpost::editor::Editor;
use inkpost::error::{Error, Result};
use inkpost::logging;
use inkpost::richtext::html_converter::document_to_html;
use inkpost::richtext::markdown_converter::markdown_to_document;
use inkpost::richtext::structured_document::BlockType;
use inkpost::search::{ReplaceOutcome, ReplaceStrategy};
use log::info;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "inkpost")]
#[command(about = "Search, replace and inspect blog drafts", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Drafts directory, overriding the config
    #[arg(long, global = true, value_name = "DIR")]
    drafts: Option<PathBuf>,

    /// More log output (repeat for more)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count occurrences of a query in a draft's text
    Count {
        /// Name of the draft
        draft: String,
        query: String,
    },
    /// Replace every occurrence of a query in a draft
    Replace {
        /// Name of the draft
        draft: String,
        query: String,
        /// Leave empty to delete the matches
        #[arg(default_value = "")]
        replacement: String,
        /// markup or text-nodes (default from config)
        #[arg(long)]
        strategy: Option<ReplaceStrategy>,
        /// Print the result instead of saving it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a draft as plain text
    Text {
        /// Name of the draft
        draft: String,
    },
    /// Print a draft's normalized HTML
    Html {
        /// Name of the draft
        draft: String,
    },
    /// Show excerpt, read time and tags of a draft
    Stats {
        /// Name of the draft
        draft: String,
    },
    /// Create or update a draft from a Markdown file
    Import {
        /// Markdown file to read
        file: PathBuf,
        /// Name of the draft
        draft: String,
        /// Title (default: first heading of the file)
        #[arg(long)]
        title: Option<String>,
    },
    /// List all drafts
    Ls,
}

fn cmd_count(store: &DraftStore, config: &Config, name: &str, query: &str) -> Result<()> {
    let stored = store.load(name)?;
    let mut editor = Editor::from_config(&stored.draft.content, config)?;
    editor.toggle_search();
    editor.set_query(query);
    println!("{}", editor.match_count());
    Ok(())
}

fn cmd_replace(
    store: &DraftStore,
    config: &Config,
    name: &str,
    query: &str,
    replacement: &str,
    strategy: Option<ReplaceStrategy>,
    dry_run: bool,
) -> Result<()> {
    let mut stored = store.load(name)?;
    let mut editor = Editor::from_config(&stored.draft.content, config)?;
    if let Some(strategy) = strategy {
        editor.search_mut().set_strategy(strategy);
    }

    editor.toggle_search();
    editor.set_query(query);
    editor.set_replacement(replacement);
    eprintln!("{} in text", editor.search().match_label());

    let outcome = editor.replace_all()?.unwrap_or(ReplaceOutcome::NoMatches);
    eprintln!("{}", outcome.notice());

    if let ReplaceOutcome::Replaced { count } = outcome {
        eprintln!(
            "{} substitution(s) using the {} strategy",
            count,
            editor.search().strategy()
        );
        if dry_run {
            println!("{}", editor.html());
        } else {
            stored.draft.content = editor.html();
            store.save(&stored)?;
            info!("Updated draft '{}'", stored.name);
        }
    }
    Ok(())
}

fn cmd_text(store: &DraftStore, name: &str) -> Result<()> {
    let stored = store.load(name)?;
    let text = inkpost::blog::strip_html(&stored.draft.content);
    if text.is_empty() {
        println!("(empty)");
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn cmd_html(store: &DraftStore, config: &Config, name: &str) -> Result<()> {
    let stored = store.load(name)?;
    let editor = Editor::from_config(&stored.draft.content, config)?;
    println!("{}", editor.html());
    Ok(())
}

fn cmd_stats(store: &DraftStore, name: &str) -> Result<()> {
    let stored = store.load(name)?;
    let draft = &stored.draft;
    let text = inkpost::blog::strip_html(&draft.content);

    println!("{}", draft.status());
    println!("Excerpt:   {}", inkpost::blog::excerpt(&text));
    println!("Words:     {}", word_count(&text));
    println!("Read time: {}", read_time_label(&text));
    if !draft.tags.is_empty() {
        println!("Tags:      {}", draft.tags.join(", "));
    }
    match draft.validate() {
        Ok(()) => println!("Ready to publish"),
        Err(err) => println!("Not ready: {}", err),
    }
    Ok(())
}

fn cmd_import(
    store: &DraftStore,
    file: &Path,
    name: &str,
    title: Option<String>,
) -> Result<()> {
    let markdown = fs::read_to_string(file).map_err(|err| Error::io(file, err))?;
    let document = markdown_to_document(&markdown);

    let mut stored = store.load(name)?;
    let heading = document
        .blocks()
        .iter()
        .find(|block| matches!(block.block_type, BlockType::Heading { .. }))
        .map(|block| block.to_plain_text());

    if let Some(title) = title.or(heading)
        && !title.trim().is_empty()
    {
        stored.draft.title = title.trim().to_string();
    }
    stored.draft.content = document_to_html(&document);
    store.save(&stored)?;
    println!("Imported {} into '{}'", file.display(), stored.name);
    Ok(())
}

fn cmd_ls(store: &DraftStore) -> Result<()> {
    for name in store.list_all()? {
        println!("{}", name);
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = Config::load_from(args.config.as_deref())?;
    let drafts_dir = args.drafts.unwrap_or_else(|| config.drafts_dir());
    let store = DraftStore::new(drafts_dir);

    match args.command {
        Commands::Count { draft, query } => cmd_count(&store, &config, &draft, &query),
        Commands::Replace {
            draft,
            query,
            replacement,
            strategy,
            dry_run,
        } => cmd_replace(
            &store,
            &config,
            &draft,
            &query,
            &replacement,
            strategy,
            dry_run,
        ),
        Commands::Text { draft } => cmd_text(&store, &draft),
        Commands::Html { draft } => cmd_html(&store, &config, &draft),
        Commands::Stats { draft } => cmd_stats(&store, &draft),
        Commands::Import { file, draft, title } => cmd_import(&store, &file, &draft, title),
        Commands::Ls => cmd_ls(&store),
    }
}

fn main() {
    let args = Args::parse();

    let env_level = env::var(logging::LOG_ENV_VAR).ok();
    logging::init(logging::resolve_level(args.verbose, env_level.as_deref()));

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
