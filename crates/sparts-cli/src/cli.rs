use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sparts_types::EntityFamily;

#[derive(Parser)]
#[command(
    name = "sparts",
    about = "Software Parts ledger: parts, artifacts, suppliers and their history",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML settings file with `key_file` and `[client]` / `[devnet]` tables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Validator REST URL, overriding the settings file
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Private key used to sign transactions
    #[arg(long, global = true)]
    pub key_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum FamilyArg {
    Artifact,
    Category,
    Organization,
    Part,
    Supplier,
    User,
}

impl From<FamilyArg> for EntityFamily {
    fn from(arg: FamilyArg) -> Self {
        match arg {
            FamilyArg::Artifact => EntityFamily::Artifact,
            FamilyArg::Category => EntityFamily::Category,
            FamilyArg::Organization => EntityFamily::Organization,
            FamilyArg::Part => EntityFamily::Part,
            FamilyArg::Supplier => EntityFamily::Supplier,
            FamilyArg::User => EntityFamily::User,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a signing key and write it to a key file
    Keygen(KeygenArgs),
    /// Create an entity
    Create(CreateArgs),
    /// Change fields of an entity; unnamed fields keep their value
    Amend(AmendArgs),
    /// Add an entry to one of an entity's relation lists
    Relate(RelateArgs),
    /// Remove an entry from one of an entity's relation lists
    Unrelate(RelateArgs),
    /// Link two entities in both directions in one batch
    Link(LinkArgs),
    /// Show the current record of an entity
    Show(EntityArgs),
    /// List every entity of a family
    List(ListArgs),
    /// Show the version history of an entity
    History(HistoryArgs),
    /// Register a user, identified by public key
    RegisterUser(RegisterUserArgs),
    /// Run a local single-node validator
    ServeDevnet(ServeDevnetArgs),
}

#[derive(Args)]
pub struct KeygenArgs {
    /// Output path; defaults to the configured key file
    pub path: Option<PathBuf>,
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct EntityArgs {
    #[arg(value_enum)]
    pub family: FamilyArg,
    pub id: String,
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(value_enum)]
    pub family: FamilyArg,
    /// Entity id; a random UUID when omitted
    pub id: Option<String>,
    /// Field value as `name=value`; repeatable
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args)]
pub struct AmendArgs {
    #[arg(value_enum)]
    pub family: FamilyArg,
    pub id: String,
    #[arg(short = 'f', long = "field", value_parser = parse_field, required = true)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args)]
pub struct RelateArgs {
    #[arg(value_enum)]
    pub family: FamilyArg,
    pub id: String,
    /// Relation list, e.g. `artifact_list`
    pub relation: String,
    /// Target entity id, or the location of a `uri_list` entry
    pub target: String,
    /// Extra `uri_list` attributes as `name=value` (version, checksum, ...)
    #[arg(short = 'a', long = "attr", value_parser = parse_field)]
    pub attrs: Vec<(String, String)>,
}

#[derive(Args)]
pub struct LinkArgs {
    #[arg(value_enum)]
    pub left_family: FamilyArg,
    pub left_id: String,
    #[arg(value_enum)]
    pub right_family: FamilyArg,
    pub right_id: String,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(value_enum)]
    pub family: FamilyArg,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[arg(value_enum)]
    pub family: FamilyArg,
    pub id: String,
    /// First day of the range, YYYYMMDD
    #[arg(long, requires = "to")]
    pub from: Option<String>,
    /// Last day of the range, YYYYMMDD
    #[arg(long, requires = "from")]
    pub to: Option<String>,
    /// Also check the chain structure of the full history
    #[arg(long, conflicts_with = "from")]
    pub validate: bool,
}

#[derive(Args)]
pub struct RegisterUserArgs {
    pub user_name: String,
    pub email_address: String,
    #[arg(long)]
    pub role: Option<String>,
    /// Hex public key of the user; defaults to the signing key's own
    #[arg(long)]
    pub public_key: Option<String>,
}

#[derive(Args)]
pub struct ServeDevnetArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{s}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in `{s}`"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_create_with_fields() {
        let cli = Cli::try_parse_from(["sparts", "create", "part", "p1", "-f", "name=Widget", "--field", "label=x=y"]).unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.family, FamilyArg::Part);
            assert_eq!(args.id.as_deref(), Some("p1"));
            assert_eq!(
                args.fields,
                vec![("name".into(), "Widget".into()), ("label".into(), "x=y".into())]
            );
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn field_without_equals_is_refused() {
        assert!(Cli::try_parse_from(["sparts", "create", "part", "p1", "-f", "name"]).is_err());
        assert!(Cli::try_parse_from(["sparts", "create", "part", "p1", "-f", "=x"]).is_err());
    }

    #[test]
    fn amend_needs_a_field() {
        assert!(Cli::try_parse_from(["sparts", "amend", "part", "p1"]).is_err());
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sparts", "show", "category", "c1", "--format", "json", "--url", "http://v:8008", "-v",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.url.as_deref(), Some("http://v:8008"));
        assert!(cli.verbose);
    }

    #[test]
    fn history_range_needs_both_ends() {
        assert!(Cli::try_parse_from(["sparts", "history", "part", "p1", "--from", "20240101"]).is_err());
        let cli = Cli::try_parse_from([
            "sparts", "history", "part", "p1", "--from", "20240101", "--to", "20240131",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::History(_)));
    }

    #[test]
    fn family_maps_to_entity_family() {
        assert_eq!(EntityFamily::from(FamilyArg::Part).wire_name(), "pt");
        assert_eq!(EntityFamily::from(FamilyArg::User), EntityFamily::User);
    }
}
