use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use figport_api_types::NodeType;

/// Command-line arguments for the figport binary.
#[derive(Debug, Parser)]
#[command(
    name = "figport",
    version,
    about = "Export rendered nodes of Figma documents"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "FIGPORT_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Read the API token from this file.
    #[arg(
        long = "token-file",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub token_file: Option<PathBuf>,

    /// Override the API base URL.
    #[arg(long = "api-base-url", value_name = "URL", global = true)]
    pub api_base_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render selected nodes of a document and download the images.
    Export(Box<ExportArgs>),
    /// Print the flattened node tree of a document.
    Nodes(NodesArgs),
    /// Read or post comments on a document.
    Comments(CommentsArgs),
    /// List the projects of a team.
    Projects(ProjectsArgs),
    /// List the version history of a document.
    Versions(VersionsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    /// Document key, as found in `https://www.figma.com/file/:key/:title`.
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Export nodes of this type; repeatable. Defaults to frames.
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<NodeType>,

    /// Restrict the export to these node ids; repeatable.
    #[arg(long = "id", value_name = "ID")]
    pub ids: Vec<String>,

    /// Also export nodes that are hidden or inside hidden ancestors.
    #[arg(long = "include-hidden", action = clap::ArgAction::SetTrue)]
    pub include_hidden: bool,

    #[command(flatten)]
    pub overrides: ExportOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ExportOverrides {
    /// Override the render scale (0.1 to 4).
    #[arg(long, value_name = "FACTOR")]
    pub scale: Option<f64>,

    /// Override the image format (png|svg|jpg).
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Override the maximum number of concurrent downloads.
    #[arg(long, value_name = "COUNT")]
    pub concurrency: Option<usize>,

    /// Give up on unfinished downloads after this many seconds.
    #[arg(long = "deadline-seconds", value_name = "SECONDS")]
    pub deadline_seconds: Option<u64>,

    /// Override the directory assets are written to.
    #[arg(long = "output-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Name files after node ids or node names (id|name).
    #[arg(long, value_name = "STRATEGY")]
    pub naming: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct NodesArgs {
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Only list nodes of this type; repeatable.
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<NodeType>,
}

#[derive(Debug, Args, Clone)]
pub struct CommentsArgs {
    #[command(subcommand)]
    pub command: CommentsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommentsCommand {
    /// List the comments of a document.
    List(CommentsListArgs),
    /// Post a comment at a canvas position.
    Add(CommentsAddArgs),
}

#[derive(Debug, Args, Clone)]
pub struct CommentsListArgs {
    #[arg(value_name = "KEY")]
    pub key: String,
}

#[derive(Debug, Args, Clone)]
pub struct CommentsAddArgs {
    #[arg(value_name = "KEY")]
    pub key: String,

    #[arg(long, value_name = "TEXT")]
    pub message: String,

    #[arg(long = "x", value_name = "X", allow_hyphen_values = true)]
    pub x: f64,

    #[arg(long = "y", value_name = "Y", allow_hyphen_values = true)]
    pub y: f64,
}

#[derive(Debug, Args, Clone)]
pub struct ProjectsArgs {
    #[arg(value_name = "TEAM_ID")]
    pub team_id: String,
}

#[derive(Debug, Args, Clone)]
pub struct VersionsArgs {
    #[arg(value_name = "KEY")]
    pub key: String,
}
