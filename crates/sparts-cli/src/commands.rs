use anyhow::Context;
use colored::Colorize;
use serde_json::Value;
use sparts_ledger::{FamilySchema, HistoryValidator, Rejected, RelationTarget};
use sparts_sdk::{
    load_signer, save_signer, DateRange, EntityFamily, EntityId, LedgerAddress, Patch, PartsLedger,
    PublicKey, RelationEntry, ResponseEnvelope, SdkError, SdkResult, Signer, UriEntry,
};

use crate::cli::*;
use crate::settings::Settings;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(cli.config.as_deref(), cli.url.as_deref(), cli.key_file.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Keygen(args) => cmd_keygen(&settings, args, format),
        Command::ServeDevnet(args) => cmd_serve_devnet(settings, args).await,
        command => {
            let key_path = settings.key_path()?;
            let signer = load_signer(&key_path)
                .with_context(|| format!("cannot load signing key from {}", key_path.display()))?;
            let ledger = PartsLedger::connect(settings.client.clone(), signer)?;
            tracing::debug!(
                validator = %settings.client.base_url,
                key_file = %key_path.display(),
                public_key = %ledger.public_key(),
                "ledger client ready"
            );
            match execute(&ledger, command).await {
                Ok(envelope) => render(&envelope, format),
                Err(err) => {
                    tracing::debug!(kind = err.kind().as_str(), error = %err, "command failed");
                    render(&ResponseEnvelope::failure(&err), format)?;
                    Err(err.into())
                }
            }
        }
    }
}

/// Run one ledger command and describe its outcome.
pub async fn execute(ledger: &PartsLedger, command: Command) -> SdkResult<ResponseEnvelope> {
    match command {
        Command::Create(args) => {
            let family = EntityFamily::from(args.family);
            let id = match args.id {
                Some(id) => EntityId::new(id)?,
                None => EntityId::generate(),
            };
            let record = ledger.create(family, &id, args.fields).await?;
            Ok(ResponseEnvelope::record(&record, format!("{family} {id} created")))
        }
        Command::Amend(args) => {
            let family = EntityFamily::from(args.family);
            let id = EntityId::new(args.id)?;
            let patches = args
                .fields
                .into_iter()
                .map(|(name, value)| (name, Patch::set(value)));
            let record = ledger.amend(family, &id, patches).await?;
            Ok(ResponseEnvelope::record(&record, format!("{family} {id} amended")))
        }
        Command::Relate(args) => {
            let family = EntityFamily::from(args.family);
            let id = EntityId::new(args.id.clone())?;
            let entry = relation_entry(family, &args)?;
            let record = ledger.add_relation(family, &id, &args.relation, entry).await?;
            Ok(ResponseEnvelope::record(&record, format!("{} added to {}", args.target, args.relation)))
        }
        Command::Unrelate(args) => {
            let family = EntityFamily::from(args.family);
            let id = EntityId::new(args.id.clone())?;
            let entry = relation_entry(family, &args)?;
            let record = ledger.remove_relation(family, &id, &args.relation, entry).await?;
            Ok(ResponseEnvelope::record(&record, format!("{} removed from {}", args.target, args.relation)))
        }
        Command::Link(args) => {
            let left_id = EntityId::new(args.left_id)?;
            let right_id = EntityId::new(args.right_id)?;
            let left = (EntityFamily::from(args.left_family), &left_id);
            let right = (EntityFamily::from(args.right_family), &right_id);
            let (left_record, right_record) = ledger.relate_bidirectional(left, right).await?;
            let mut envelope = ResponseEnvelope::list(left.0, &[left_record, right_record]);
            envelope.message = format!("{} {left_id} and {} {right_id} linked", left.0, right.0);
            Ok(envelope)
        }
        Command::Show(args) => {
            let family = EntityFamily::from(args.family);
            let id = EntityId::new(args.id)?;
            let record = ledger.retrieve(family, &id).await?;
            Ok(ResponseEnvelope::record(&record, format!("{family} {id}")))
        }
        Command::List(args) => {
            let family = EntityFamily::from(args.family);
            let records = ledger.list(family).await?;
            Ok(ResponseEnvelope::list(family, &records))
        }
        Command::History(args) => {
            let family = EntityFamily::from(args.family);
            let id = EntityId::new(args.id)?;
            let history = match (args.from, args.to) {
                (Some(from), Some(to)) => {
                    let range = DateRange::parse(&from, &to)?;
                    ledger.history_in_range(family, &id, range).await?
                }
                _ => ledger.history(family, &id).await?,
            };
            if args.validate {
                let report = HistoryValidator::validate(&history);
                if let Some(violation) = report.violations.first() {
                    return Err(Rejected::CorruptChain {
                        address: LedgerAddress::derive(family, id.as_str()),
                        block: violation.block,
                        reason: violation.description.clone(),
                    }
                    .into());
                }
            }
            Ok(ResponseEnvelope::history(family, &history))
        }
        Command::RegisterUser(args) => {
            let public_key = match args.public_key {
                Some(hex) => PublicKey::from_hex(&hex)?,
                None => *ledger.public_key(),
            };
            let record = ledger
                .register_user(&public_key, &args.user_name, &args.email_address, args.role.as_deref())
                .await?;
            Ok(ResponseEnvelope::record(&record, format!("user {} registered", args.user_name)))
        }
        Command::Keygen(_) | Command::ServeDevnet(_) => Err(SdkError::Config(
            "command does not talk to the ledger".into(),
        )),
    }
}

/// `uri_list` entries are built from the target location plus `--attr`s;
/// every other relation takes the target as an entity id.
fn relation_entry(family: EntityFamily, args: &RelateArgs) -> SdkResult<RelationEntry> {
    let is_uri = FamilySchema::of(family)
        .relation(&args.relation)
        .is_some_and(|spec| spec.target == RelationTarget::Uri);
    if !is_uri {
        if !args.attrs.is_empty() {
            return Err(Rejected::InvalidPayload(format!("{} takes no attributes", args.relation)).into());
        }
        return Ok(RelationEntry::reference(args.target.as_str()));
    }
    let mut uri = UriEntry {
        location: args.target.clone(),
        ..UriEntry::default()
    };
    for (name, value) in &args.attrs {
        let slot = match name.as_str() {
            "version" => &mut uri.version,
            "checksum" => &mut uri.checksum,
            "content_type" => &mut uri.content_type,
            "size" => &mut uri.size,
            "uri_type" => &mut uri.uri_type,
            other => {
                return Err(Rejected::InvalidPayload(format!("unknown uri attribute `{other}`")).into())
            }
        };
        *slot = value.clone();
    }
    Ok(RelationEntry::Uri(uri))
}

fn cmd_keygen(settings: &Settings, args: KeygenArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => settings.key_path()?,
    };
    if path.exists() && !args.force {
        anyhow::bail!("{} already exists; pass --force to replace it", path.display());
    }
    let signer = Signer::generate();
    save_signer(&signer, &path)?;
    tracing::debug!(path = %path.display(), replaced = args.force, "signing key generated");
    let public_key = signer.public_key().to_hex();
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({ "key_file": path, "public_key": public_key });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            println!("{} Key written to {}", "✓".green().bold(), path.display().to_string().bold());
            println!("  Public key: {}", public_key.cyan());
        }
    }
    Ok(())
}

async fn cmd_serve_devnet(settings: Settings, args: ServeDevnetArgs) -> anyhow::Result<()> {
    let mut config = settings.devnet;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    println!("{} devnet on {}", "Serving".green().bold(), config.bind_addr.to_string().bold());
    sparts_devnet::DevnetServer::new(config).serve().await?;
    Ok(())
}

fn render(envelope: &ResponseEnvelope, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(envelope)?),
        OutputFormat::Text => print!("{}", render_text(envelope)),
    }
    Ok(())
}

fn render_text(envelope: &ResponseEnvelope) -> String {
    let mut out = String::new();
    if !envelope.is_success() {
        let kind = envelope.error_kind.map(|k| k.as_str()).unwrap_or("Internal");
        out.push_str(&format!("{} {} ({})\n", "✗".red().bold(), envelope.message, kind.yellow()));
        return out;
    }
    out.push_str(&format!("{} {}\n", "✓".green().bold(), envelope.message));
    match &envelope.result {
        Value::Array(records) => {
            for (i, record) in records.iter().enumerate() {
                out.push_str(&format!("\n{}\n", format!("[{i}]").dimmed()));
                push_record(&mut out, record);
            }
        }
        record => push_record(&mut out, record),
    }
    out
}

fn push_record(out: &mut String, record: &Value) {
    let Value::Object(map) = record else {
        return;
    };
    for (key, value) in map {
        let shown = match value {
            Value::String(s) => s.clone(),
            Value::Array(items) if items.is_empty() => "-".dimmed().to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        };
        out.push_str(&format!("  {:<16} {}\n", key.cyan(), shown));
    }
}
