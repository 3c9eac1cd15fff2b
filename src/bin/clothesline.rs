// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use clothesline::{
    calendar::{group_by_day, items_on, week_of},
    config::Config,
    path::default_config_path,
    query::EmptyState,
    tags::parse_tag_list,
    wardrobe::{Acquisition, SaveDraft, Saved, Wardrobe},
    WardrobeItem,
};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use inquire::Confirm;
use std::{path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "clothesline [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Override data directory from configuration.
    #[arg(short, long, value_name = "path")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => default_config_path()?,
        };
        let mut config = Config::load(config_path)?;
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        let wardrobe = Wardrobe::open(&config)?;

        match self.command {
            Command::Add(opts) => run_add(&wardrobe, opts).await,
            Command::Edit(opts) => run_edit(&wardrobe, opts).await,
            Command::Remove(opts) => run_remove(&wardrobe, opts).await,
            Command::List(opts) => run_list(&wardrobe, opts).await,
            Command::Filter(opts) => run_filter(&wardrobe, opts).await,
            Command::Tags(opts) => run_tags(&wardrobe, opts).await,
            Command::Calendar(opts) => run_calendar(&wardrobe, opts).await,
            Command::ClearTags(opts) => run_clear_tags(&wardrobe, opts).await,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Add photo to wardrobe.
    #[command(override_usage = "clothesline add [options] <image>")]
    Add(AddOptions),

    /// Edit tags or image of existing item.
    #[command(override_usage = "clothesline edit [options] <id>")]
    Edit(EditOptions),

    /// Remove items and their stored photos.
    #[command(override_usage = "clothesline remove [options] <id>...")]
    Remove(RemoveOptions),

    /// List items matching the active filter.
    #[command(override_usage = "clothesline list [options]")]
    List(ListOptions),

    /// Show or change the active filter.
    #[command(subcommand)]
    Filter(FilterCommand),

    /// Show or extend the tag vocabulary.
    #[command(subcommand)]
    Tags(TagsCommand),

    /// Show items by the day they were added.
    #[command(override_usage = "clothesline calendar [options]")]
    Calendar(CalendarOptions),

    /// Remove every tag from every item.
    #[command(override_usage = "clothesline clear-tags [options]")]
    ClearTags(ConfirmOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddOptions {
    /// Path or URL of the photo to add.
    #[arg(required = true, value_name = "image")]
    pub image: String,

    /// Comma separated tags, e.g., "top, striped".
    #[arg(short, long, value_name = "tags")]
    pub tags: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct EditOptions {
    /// Id of the item to edit.
    #[arg(required = true, value_name = "id")]
    pub id: String,

    /// Replace photo with new one.
    #[arg(short, long, value_name = "image")]
    pub image: Option<String>,

    /// Replace tags with comma separated list.
    #[arg(short, long, value_name = "tags")]
    pub tags: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RemoveOptions {
    /// Ids of the items to remove.
    #[arg(required = true, value_name = "id")]
    pub ids: Vec<String>,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ListOptions {
    /// Ignore the active filter.
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Debug, Clone, Subcommand)]
enum FilterCommand {
    /// Replace active filter.
    Set {
        #[arg(required = true, value_name = "tag")]
        tags: Vec<String>,
    },

    /// Clear active filter.
    Clear,

    /// Show active filter.
    Show,
}

#[derive(Debug, Clone, Subcommand)]
enum TagsCommand {
    /// List every known tag.
    List,

    /// Register tag in vocabulary.
    Add {
        #[arg(required = true, value_name = "tag")]
        tag: String,
    },
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CalendarOptions {
    /// Show the week containing this date (YYYY-MM-DD).
    #[arg(short, long, group = "range", value_name = "date")]
    pub week: Option<NaiveDate>,

    /// Show a single day (YYYY-MM-DD).
    #[arg(short, long, group = "range", value_name = "date")]
    pub day: Option<NaiveDate>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ConfirmOptions {
    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_default();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

async fn run_add(wardrobe: &Wardrobe, opts: AddOptions) -> Result<()> {
    let mut draft = SaveDraft::new();
    draft.acquire(Acquisition::Picked(opts.image));
    if let Some(tags) = opts.tags {
        draft.tags = parse_tag_list(tags);
    }

    let saved = wardrobe.save(&draft).await?;
    info!("saved {}", describe(saved.item()));

    Ok(())
}

async fn run_edit(wardrobe: &Wardrobe, opts: EditOptions) -> Result<()> {
    let item = wardrobe
        .index()
        .get(&opts.id)
        .await
        .ok_or_else(|| anyhow!("no item with id {:?}", opts.id))?;

    let mut draft = SaveDraft::edit(&item);
    if let Some(image) = opts.image {
        draft.acquire(Acquisition::Picked(image));
    }
    if let Some(tags) = opts.tags {
        draft.tags = parse_tag_list(tags);
    }

    match wardrobe.save(&draft).await? {
        Saved::Updated(item) => info!("updated {}", describe(&item)),
        Saved::Created(item) => warn!("item vanished while editing, re-added {}", describe(&item)),
    }

    Ok(())
}

async fn run_remove(wardrobe: &Wardrobe, opts: RemoveOptions) -> Result<()> {
    if !opts.yes
        && !Confirm::new(&format!("remove {} item(s)?", opts.ids.len()))
            .with_default(false)
            .prompt()?
    {
        return Ok(());
    }

    for id in opts.ids {
        if wardrobe.delete(&id).await? {
            info!("removed {id}");
        } else {
            warn!("no item with id {id:?}");
        }
    }

    Ok(())
}

async fn run_list(wardrobe: &Wardrobe, opts: ListOptions) -> Result<()> {
    if opts.all {
        for item in wardrobe.index().read_all().await {
            println!("{}", describe(&item));
        }
        return Ok(());
    }

    let view = wardrobe.browse().await;
    match view.empty_state() {
        EmptyState::NoItems => info!("no clothes yet, add some with `clothesline add`"),
        EmptyState::NoMatches => info!("no clothes match your selected tags [{}]", view.active_filter),
        EmptyState::NotEmpty => {
            for item in &view.items {
                println!("{}", describe(item));
            }
        }
    }

    Ok(())
}

async fn run_filter(wardrobe: &Wardrobe, cmd: FilterCommand) -> Result<()> {
    match cmd {
        FilterCommand::Set { tags } => wardrobe.filter().set_active(tags).await?,
        FilterCommand::Clear => wardrobe.filter().clear().await?,
        FilterCommand::Show => println!("{}", wardrobe.filter().get_active().await),
    }

    Ok(())
}

async fn run_tags(wardrobe: &Wardrobe, cmd: TagsCommand) -> Result<()> {
    match cmd {
        TagsCommand::List => {
            for tag in wardrobe.all_known_tags().await {
                println!("{tag}");
            }
        }
        TagsCommand::Add { tag } => {
            if !wardrobe.tags().add(&tag).await? {
                info!("{tag:?} is already known");
            }
        }
    }

    Ok(())
}

async fn run_calendar(wardrobe: &Wardrobe, opts: CalendarOptions) -> Result<()> {
    let items = wardrobe.index().read_all().await;

    if let Some(day) = opts.day {
        for item in items_on(&items, day) {
            println!("{}", describe(item));
        }
    } else if let Some(date) = opts.week {
        for day in week_of(date) {
            println!("{}", day.format("%A, %b %-d"));
            for item in items_on(&items, day) {
                println!("  {}", describe(item));
            }
        }
    } else {
        for (day, items) in group_by_day(&items) {
            println!("{}", day.format("%A, %b %-d, %Y"));
            for item in items {
                println!("  {}", describe(item));
            }
        }
    }

    Ok(())
}

async fn run_clear_tags(wardrobe: &Wardrobe, opts: ConfirmOptions) -> Result<()> {
    if !opts.yes
        && !Confirm::new("remove all tags from every item?")
            .with_default(false)
            .prompt()?
    {
        return Ok(());
    }

    let cleared = wardrobe.clear_all_tags().await?;
    info!("cleared tags of {cleared} item(s)");

    Ok(())
}

fn describe(item: &WardrobeItem) -> String {
    format!("{}  {}  [{}]", item.id, item.uri, item.tags)
}
