//! Operator CLI for the facility map backend.
//!
//! Talks to the same REST endpoints as the browser editor through
//! [`gridmap::gateway::HttpGateway`], so placements, edits and saves made here
//! follow the editor's rules (feed slots, default sizes, snapshot format).


use clap::{Args, Parser, Subcommand};
use gridmap::doc::{DrawingColor, ItemKind, MapItem, PlacementSlot, ToolCatalog};
use gridmap::gateway::{GatewayConfig, GatewayError, HttpGateway, MapGateway};
use gridmap::placement::{DrawingForm, SizeClass, ToolPicker};
use gridmap::wire::{CreateToolRequest, PositionRequest, PositionSnapshot, SavedItemDto};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("no item with id {0}")]
    UnknownItem(i64),
    #[error("backend returned an item the editor cannot read (id {0})")]
    UnreadableItem(i64),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "facility-map", about = "Facility map backend CLI")]
struct Cli {
    #[arg(long, env = "MAP_API_BASE_URL", default_value = gridmap::gateway::DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "MAP_SESSION_COOKIE")]
    session_cookie: Option<String>,

    #[arg(long, env = "MAP_REQUEST_TIMEOUT_SECS", default_value_t = gridmap::gateway::DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    #[arg(long, env = "MAP_CONNECT_TIMEOUT_SECS", default_value_t = gridmap::gateway::DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            session_cookie: self.session_cookie.clone().filter(|c| !c.trim().is_empty()),
            request_timeout_secs: self.request_timeout_secs,
            connect_timeout_secs: self.connect_timeout_secs,
            ..GatewayConfig::new(&self.base_url)
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List saved map items.
    Items,
    /// List placeable tools, feed variants included.
    Tools {
        /// Case-insensitive filter on label, model and serial.
        #[arg(long)]
        search: Option<String>,
    },
    /// Place a tool; `slot` is a tool id or `<id>_FEED`.
    PlaceTool {
        #[arg(value_parser = parse_slot)]
        slot: PlacementSlot,
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
        #[arg(long, default_value = "4x2", value_parser = parse_size)]
        size: SizeClass,
    },
    /// Place a drawing.
    PlaceDrawing(DrawingArgs),
    /// Replace a drawing's text, size and color.
    UpdateDrawing {
        id: i64,
        #[command(flatten)]
        drawing: DrawingArgs,
    },
    /// Move one item to a cell.
    Move {
        id: i64,
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
    },
    /// Delete one item.
    Delete { id: i64 },
    /// Re-save every item at its current cell.
    Save,
}

#[derive(Args, Debug, Clone)]
struct DrawingArgs {
    #[arg(long)]
    x: i32,
    #[arg(long)]
    y: i32,
    #[arg(long, default_value_t = gridmap::consts::DEFAULT_DRAWING_WIDTH)]
    width: u32,
    #[arg(long, default_value_t = gridmap::consts::DEFAULT_DRAWING_HEIGHT)]
    height: u32,
    #[arg(long, default_value = "")]
    text: String,
    #[arg(long, default_value = "black")]
    color: String,
    #[arg(long)]
    solid: bool,
}

impl DrawingArgs {
    fn form(&self) -> DrawingForm {
        DrawingForm {
            text: self.text.clone(),
            width: self.width,
            height: self.height,
            color: DrawingColor::parse(&self.color),
            is_solid: self.solid,
        }
        .normalized()
    }
}

fn parse_slot(raw: &str) -> Result<PlacementSlot, String> {
    PlacementSlot::parse(raw).ok_or_else(|| format!("expected <id> or <id>_FEED, got `{raw}`"))
}

fn parse_size(raw: &str) -> Result<SizeClass, String> {
    SizeClass::parse(raw).ok_or_else(|| format!("expected 4x2, 3x3 or 2x4, got `{raw}`"))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to read .env"),
    }

    let cli = Cli::parse();
    let gateway = HttpGateway::new(&cli.gateway_config())?;
    tracing::debug!(base_url = gateway.base_url(), "gateway ready");
    run(&gateway, cli.command).await
}

async fn run<G: MapGateway>(gateway: &G, command: Command) -> Result<(), CliError> {
    match command {
        Command::Items => {
            for item in load_items(gateway).await? {
                println!("{}", format_item(&item));
            }
            Ok(())
        }
        Command::Tools { search } => {
            let mut picker = ToolPicker::new();
            picker.finish_refresh(&gateway.load_available_tools().await?);
            for choice in picker.filter(search.as_deref().unwrap_or_default()) {
                println!("{}\t{}", choice.slot, choice.label);
            }
            Ok(())
        }
        Command::PlaceTool { slot, x, y, size } => {
            let (width, height) = size.cells();
            let saved = gateway.create_tool(&CreateToolRequest { tool_id: slot, x, y, width, height }).await?;
            print_saved(saved)
        }
        Command::PlaceDrawing(args) => {
            let saved = gateway.create_drawing(&args.form().request(args.x, args.y)).await?;
            print_saved(saved)
        }
        Command::UpdateDrawing { id, drawing } => {
            gateway.update_drawing(id, &drawing.form().request(drawing.x, drawing.y)).await?;
            tracing::info!(id, "drawing updated");
            Ok(())
        }
        Command::Move { id, x, y } => {
            if !load_items(gateway).await?.iter().any(|item| item.id == id) {
                return Err(CliError::UnknownItem(id));
            }
            gateway.update_position(id, PositionRequest { x, y }).await?;
            tracing::info!(id, x, y, "item moved");
            Ok(())
        }
        Command::Delete { id } => {
            gateway.delete_item(id).await?;
            tracing::info!(id, "item deleted");
            Ok(())
        }
        Command::Save => {
            let mut snapshot: Vec<PositionSnapshot> = load_items(gateway).await?.iter().map(PositionSnapshot::of).collect();
            snapshot.sort_by_key(|s| s.id);
            gateway.save_state(&snapshot).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
    }
}

async fn load_items<G: MapGateway>(gateway: &G) -> Result<Vec<MapItem>, CliError> {
    let catalog = ToolCatalog::default();
    let mut items: Vec<MapItem> = gateway
        .load_items()
        .await?
        .into_iter()
        .filter_map(|dto| {
            let id = dto.id;
            let item = dto.into_item(&catalog);
            if item.is_none() {
                tracing::warn!(id, "skipping unreadable item");
            }
            item
        })
        .collect();
    items.sort_by_key(|item| item.id);
    Ok(items)
}

fn print_saved(saved: SavedItemDto) -> Result<(), CliError> {
    let id = saved.id;
    let item = saved.into_item(&ToolCatalog::default()).ok_or(CliError::UnreadableItem(id))?;
    println!("{}", format_item(&item));
    Ok(())
}

/// One tab-separated line: id, kind, cell, size, label.
fn format_item(item: &MapItem) -> String {
    let (kind, label) = match &item.kind {
        ItemKind::Tool(tool) => ("tool", format!("{} ({})", tool.display_name(), tool.slot)),
        ItemKind::Drawing(drawing) => {
            let fill = if drawing.is_solid { "solid" } else { "outline" };
            ("drawing", format!("{:?} {} {fill}", drawing.text, drawing.color.as_str()))
        }
    };
    format!("{}\t{kind}\t{},{}\t{}x{}\t{label}", item.id, item.cell_x(), item.cell_y(), item.width, item.height)
}
