// Bitacora CLI - digitize handwritten boiler logsheets

mod engine_client;
mod exit_codes;
mod photo;
mod session;
mod table;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bitacora_config::ai::{self, AIDiagnostics};
use bitacora_config::{AIConfigStatus, AIProvider, AISettings, ResolvedAIConfig, SchemaSettings, Settings};
use bitacora_engine::delta::{self, DeltaAnomaly};
use bitacora_engine::model::format_number;
use bitacora_engine::prompt::build_prompt;
use bitacora_engine::{
    ingest, CarryIn, CoercionWarning, ExtractionSchema, IngestOptions, ParseError, RowStore,
    SchemaError, Totalizer,
};
use bitacora_io::{ExportError, ExportOptions, TableReadError};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use engine_client::ExtractionFailure;
use exit_codes::{
    EXIT_AI_DISABLED, EXIT_AI_KEYCHAIN_ERR, EXIT_AI_MISSING_KEY, EXIT_ERROR, EXIT_EXPORT, EXIT_IO,
    EXIT_NO_SESSION, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE,
};
use photo::PhotoError;
use session::{SessionError, SessionFile};

/// Log filter override; takes precedence over -v / -q.
const LOG_ENV: &str = "BITACORA_LOG";

#[derive(Parser)]
#[command(name = "bitacora")]
#[command(about = "Digitize handwritten boiler logsheets into a reviewed spreadsheet")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Session file (default: settings directory/session.json)
    #[arg(long, global = true, env = "BITACORA_SESSION", value_name = "FILE")]
    session: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only errors on stderr
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a logsheet photo to the extraction engine and start a session
    #[command(after_help = "\
Examples:
  bitacora extract hoja_0305.jpg
  bitacora extract hoja.jpg --date 2024-03-05 --steam 52820 --water 55290
  bitacora extract hoja.jpg --provider openai --model gpt-4o --raw-out respuesta.txt
  bitacora extract hoja.jpg --schema caldera2.schema.toml")]
    Extract {
        /// Photo of the logsheet (jpg, jpeg, png, webp, gif)
        image: PathBuf,

        #[command(flatten)]
        ingest: IngestArgs,

        /// Engine provider (gemini, openai); overrides settings
        #[arg(long)]
        provider: Option<String>,

        /// Model identifier; overrides settings
        #[arg(long)]
        model: Option<String>,

        /// Seconds to wait for the engine
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Save the engine's raw text response
        #[arg(long, value_name = "FILE")]
        raw_out: Option<PathBuf>,
    },

    /// Start a session from an engine response captured earlier
    #[command(after_help = "\
Examples:
  bitacora ingest respuesta.txt --date 2024-03-05
  pbpaste | bitacora ingest - --preset positional")]
    Ingest {
        /// Response text file, or - for stdin
        response: String,

        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Print the session table
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the prior period's closing readings
    #[command(after_help = "\
Examples:
  bitacora carry-in
  bitacora carry-in --steam 52820.5 --bagasse-in 18200")]
    CarryIn {
        #[command(flatten)]
        values: CarryInArgs,
    },

    /// Write the session table to CSV for hand correction (- for stdout)
    Dump {
        file: PathBuf,
    },

    /// Replace the session table with an edited CSV and recompute
    #[command(after_help = "\
Examples:
  bitacora dump revisar.csv
  $EDITOR revisar.csv
  bitacora apply revisar.csv")]
    Apply {
        file: PathBuf,
    },

    /// Print the last row tab-separated, for pasting into a master sheet
    LastRow,

    /// Export the session table to Excel
    #[command(after_help = "\
Examples:
  bitacora export
  bitacora export -o marzo/Bitacora_2024-03-05.xlsx --sheet Caldera1")]
    Export {
        /// Output file (default: Bitacora_<date>.xlsx)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Worksheet name
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Discard the session table
    Reset,

    /// Print the extraction prompt for a schema
    Prompt {
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Extraction engine configuration
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
}

#[derive(Subcommand)]
enum AiCommands {
    /// Show the resolved engine configuration and key status
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store an API key (read from stdin) in the system keychain
    #[command(after_help = "\
Examples:
  echo \"$KEY\" | bitacora ai set-key gemini")]
    SetKey {
        provider: String,
    },
    /// Remove a stored API key from the system keychain
    DeleteKey {
        provider: String,
    },
}

#[derive(Args, Clone, Default)]
struct SchemaArgs {
    /// Schema descriptor (TOML); overrides --preset and settings
    #[arg(long, value_name = "FILE")]
    schema: Option<PathBuf>,

    /// Built-in schema: named, short_codes, positional
    #[arg(long, value_name = "NAME", conflicts_with = "schema")]
    preset: Option<String>,
}

#[derive(Args, Clone, Default)]
struct CarryInArgs {
    /// Prior closing reading of the steam totalizer
    #[arg(long)]
    steam: Option<f64>,
    /// Prior closing reading of the feedwater totalizer
    #[arg(long)]
    water: Option<f64>,
    /// Prior closing reading of the bagasse intake scale
    #[arg(long)]
    bagasse_in: Option<f64>,
    /// Prior closing reading of the bagasse return scale
    #[arg(long)]
    bagasse_out: Option<f64>,
}

impl CarryInArgs {
    fn is_empty(&self) -> bool {
        self.steam.is_none() && self.water.is_none() && self.bagasse_in.is_none() && self.bagasse_out.is_none()
    }

    /// Flags given on the command line replace the matching values of `base`.
    fn apply(&self, base: CarryIn) -> CarryIn {
        let mut carry_in = base;
        let given = [
            (Totalizer::Steam, self.steam),
            (Totalizer::Water, self.water),
            (Totalizer::BagasseIn, self.bagasse_in),
            (Totalizer::BagasseOut, self.bagasse_out),
        ];
        for (totalizer, value) in given {
            if let Some(v) = value {
                carry_in.set(totalizer, v);
            }
        }
        carry_in
    }
}

#[derive(Args, Clone, Default)]
struct IngestArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Report date stamped on every row (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    #[command(flatten)]
    carry_in: CarryInArgs,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  bitacora-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let ctx = Context { session: SessionFile::resolve(cli.session), quiet: cli.quiet };

    let result = match cli.command {
        None => {
            eprintln!("Usage: bitacora <command> [options]");
            eprintln!("       bitacora --help for more information");
            Ok(())
        }
        Some(Commands::Extract { image, ingest, provider, model, timeout, raw_out }) => {
            cmd_extract(&ctx, image, ingest, provider, model, timeout, raw_out)
        }
        Some(Commands::Ingest { response, ingest }) => cmd_ingest(&ctx, response, ingest),
        Some(Commands::Show { json }) => cmd_show(&ctx, json),
        Some(Commands::CarryIn { values }) => cmd_carry_in(&ctx, values),
        Some(Commands::Dump { file }) => cmd_dump(&ctx, file),
        Some(Commands::Apply { file }) => cmd_apply(&ctx, file),
        Some(Commands::LastRow) => cmd_last_row(&ctx),
        Some(Commands::Export { output, sheet }) => cmd_export(&ctx, output, sheet),
        Some(Commands::Reset) => cmd_reset(&ctx),
        Some(Commands::Prompt { schema }) => cmd_prompt(schema),
        Some(Commands::Ai { command }) => match command {
            AiCommands::Doctor { json } => cmd_ai_doctor(json),
            AiCommands::SetKey { provider } => cmd_ai_set_key(provider),
            AiCommands::DeleteKey { provider } => cmd_ai_delete_key(provider),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self { code: EXIT_EXPORT, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        Self { code: err.exit_code(), hint: err.hint(), message: err.to_string() }
    }
}

impl From<ExtractionFailure> for CliError {
    fn from(err: ExtractionFailure) -> Self {
        Self { code: err.exit_code(), hint: err.hint(), message: err.to_string() }
    }
}

impl From<PhotoError> for CliError {
    fn from(err: PhotoError) -> Self {
        match err {
            PhotoError::Read { .. } => CliError::io(err.to_string()),
            _ => CliError::args(err.to_string()),
        }
    }
}

impl From<SchemaError> for CliError {
    fn from(err: SchemaError) -> Self {
        CliError::args(err.to_string())
    }
}

impl From<TableReadError> for CliError {
    fn from(err: TableReadError) -> Self {
        match err {
            TableReadError::Io { .. } => CliError::io(err.to_string()),
            _ => CliError::parse(err.to_string()).with_hint("session unchanged; fix the file and run apply again"),
        }
    }
}

impl From<ExportError> for CliError {
    fn from(err: ExportError) -> Self {
        CliError::export(err.to_string())
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

struct Context {
    session: SessionFile,
    quiet: bool,
}

impl Context {
    fn note(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            eprintln!("note: {}", msg.as_ref());
        }
    }

    fn warn(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            eprintln!("warning: {}", msg.as_ref());
        }
    }
}

fn resolve_schema(args: &SchemaArgs, settings: &SchemaSettings) -> Result<ExtractionSchema, CliError> {
    if let Some(path) = &args.schema {
        return load_schema_file(path);
    }
    if let Some(name) = &args.preset {
        return Ok(ExtractionSchema::preset(name)?);
    }
    if let Some(path) = &settings.path {
        return load_schema_file(path);
    }
    Ok(ExtractionSchema::preset(&settings.preset)?)
}

fn load_schema_file(path: &Path) -> Result<ExtractionSchema, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read schema '{}': {}", path.display(), e)))?;
    ExtractionSchema::from_toml(&text)
        .map_err(|e| CliError::args(format!("{}: {}", path.display(), e)))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn report_coercions(ctx: &Context, warnings: &[CoercionWarning]) {
    if !warnings.is_empty() {
        ctx.warn(format!(
            "{} value{} could not be read as numbers and were set to 0; check them before exporting",
            warnings.len(),
            if warnings.len() == 1 { "" } else { "s" }
        ));
    }
}

fn report_anomalies(ctx: &Context, anomalies: &[DeltaAnomaly]) {
    for a in anomalies {
        ctx.warn(format!(
            "row {} ({}): {} went backwards by {}",
            a.row + 1,
            a.hora,
            a.totalizer,
            format_number(-a.delta)
        ));
    }
}

/// Parse, install and persist one engine response. The session is only
/// written when the whole response was usable.
fn ingest_response(ctx: &Context, raw: &str, args: &IngestArgs, source: String) -> Result<(), CliError> {
    let settings = Settings::load();
    let schema = resolve_schema(&args.schema, &settings.schema)?;
    let mut store = ctx.session.load()?;

    let options = IngestOptions {
        carry_in: args.carry_in.apply(store.carry_in()),
        report_date: Some(args.date.unwrap_or_else(today)),
        source: Some(source),
    };

    let ingested = match ingest(raw, &schema, &options) {
        Ok(ingested) => ingested,
        Err(err) => return Err(parse_failure(err)),
    };

    if !ingested.dropped_keys.is_empty() {
        ctx.note(format!("ignored unknown keys: {}", ingested.dropped_keys.join(", ")));
    }
    report_coercions(ctx, &ingested.warnings);

    let rows = ingested.table.rows.len();
    store.install(ingested.table);
    ctx.session.save(&store)?;

    print!("{}", table::render(store.get()));
    report_anomalies(ctx, &ingested.anomalies);
    ctx.note(format!("{} rows in session {}", rows, ctx.session.path().display()));
    Ok(())
}

fn parse_failure(err: ParseError) -> CliError {
    eprintln!("----- engine response -----");
    eprintln!("{}", err.raw.trim_end());
    eprintln!("----- end of response -----");
    CliError::parse(format!("cannot read rows from engine response: {}", err))
        .with_hint("session unchanged; re-run extract or fix the text and use `bitacora ingest FILE`")
}

// ============================================================================
// extract / ingest
// ============================================================================

/// Command-line overrides on top of the saved engine settings. Switching
/// provider drops the saved model and endpoint, which belong to the old one.
fn apply_ai_overrides(
    base: &AISettings,
    provider: Option<String>,
    model: Option<String>,
    timeout: Option<u64>,
) -> Result<AISettings, CliError> {
    let mut ai_settings = base.clone();
    if let Some(name) = provider {
        ai_settings.provider = AIProvider::from_name(&name)
            .ok_or_else(|| CliError::args(format!("unknown provider '{}' (expected gemini, openai or none)", name)))?;
        ai_settings.model.clear();
        ai_settings.endpoint = None;
    }
    if let Some(model) = model {
        ai_settings.model = model;
    }
    if let Some(secs) = timeout {
        ai_settings.timeout_secs = secs;
    }
    Ok(ai_settings)
}

fn cmd_extract(
    ctx: &Context,
    image: PathBuf,
    args: IngestArgs,
    provider: Option<String>,
    model: Option<String>,
    timeout: Option<u64>,
    raw_out: Option<PathBuf>,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let ai_settings = apply_ai_overrides(&settings.ai, provider, model, timeout)?;

    let config = ResolvedAIConfig::from_settings(&ai_settings);
    match config.status {
        AIConfigStatus::Disabled => {
            return Err(CliError { code: EXIT_AI_DISABLED, message: "extraction is disabled (provider = none)".into(), hint: None }
                .with_hint(format!("set ai.provider in {}, or use `bitacora ingest`", Settings::config_path_display())));
        }
        AIConfigStatus::MissingKey => {
            let reason = config.blocking_reason.clone().unwrap_or_default();
            return Err(CliError { code: EXIT_AI_MISSING_KEY, message: format!("no API key for {}", config.provider_name()), hint: Some(reason) });
        }
        AIConfigStatus::Ready => {}
    }

    // Fail on the schema and the photo before spending an engine call.
    let schema = resolve_schema(&args.schema, &settings.schema)?;
    let payload = photo::load(&image)?;
    let engine = engine_client::from_config(&config)?;

    let prompt = build_prompt(&schema);
    info!(engine = engine.name(), schema = %schema.name, image = %image.display(), "extracting");
    let raw = engine.extract(&payload, &prompt)?;

    if let Some(path) = &raw_out {
        fs::write(path, &raw)
            .map_err(|e| CliError::io(format!("cannot write '{}': {}", path.display(), e)))?;
        ctx.note(format!("raw response saved to {}", path.display()));
    }

    ingest_response(ctx, &raw, &args, image.display().to_string())
}

fn cmd_ingest(ctx: &Context, response: String, args: IngestArgs) -> Result<(), CliError> {
    let (raw, source) = if response == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("cannot read stdin: {}", e)))?;
        (buf, "stdin".to_string())
    } else {
        let text = fs::read_to_string(&response)
            .map_err(|e| CliError::io(format!("cannot read '{}': {}", response, e)))?;
        (text, response)
    };
    ingest_response(ctx, &raw, &args, source)
}

// ============================================================================
// Session commands
// ============================================================================

#[derive(Serialize)]
struct ShowReport<'a> {
    schema_version: u32,
    session: String,
    #[serde(flatten)]
    table: &'a bitacora_engine::SessionTable,
    anomalies: Vec<DeltaAnomaly>,
}

fn cmd_show(ctx: &Context, json: bool) -> Result<(), CliError> {
    let store = ctx.session.require()?;
    let Some(table) = store.table() else {
        return Err(SessionError::NoSession { path: ctx.session.path().to_path_buf() }.into());
    };
    let anomalies = delta::negative_deltas(&table.rows);

    if json {
        let report = ShowReport {
            schema_version: 1,
            session: ctx.session.path().display().to_string(),
            table,
            anomalies,
        };
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("cannot encode session: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    print!("{}", table::render(&table.rows));
    report_anomalies(ctx, &anomalies);
    Ok(())
}

fn print_carry_in(carry_in: &CarryIn) {
    for totalizer in Totalizer::ALL {
        println!("{:<12} {}", totalizer.name(), format_number(carry_in.get(totalizer)));
    }
}

fn cmd_carry_in(ctx: &Context, values: CarryInArgs) -> Result<(), CliError> {
    let mut store = ctx.session.load()?;
    if values.is_empty() {
        print_carry_in(&store.carry_in());
        return Ok(());
    }

    let carry_in = values.apply(store.carry_in());
    let changed = store.set_carry_in(carry_in);
    ctx.session.save(&store)?;

    if !changed {
        ctx.note("carry-in unchanged");
    }
    if store.get().is_empty() {
        print_carry_in(&store.carry_in());
    } else {
        print!("{}", table::render(store.get()));
        report_anomalies(ctx, &delta::negative_deltas(store.get()));
    }
    Ok(())
}

fn cmd_dump(ctx: &Context, file: PathBuf) -> Result<(), CliError> {
    let store = ctx.session.require()?;
    if file.as_os_str() == "-" {
        let text = bitacora_io::csv::table_to_string(store.get())
            .map_err(|e| CliError::io(format!("cannot write CSV: {}", e)))?;
        print!("{}", text);
        return Ok(());
    }
    bitacora_io::write_table(store.get(), &file)
        .map_err(|e| CliError::io(format!("cannot write '{}': {}", file.display(), e)))?;
    ctx.note(format!("wrote {} rows to {}", store.get().len(), file.display()));
    Ok(())
}

fn cmd_apply(ctx: &Context, file: PathBuf) -> Result<(), CliError> {
    let mut store = ctx.session.load()?;
    let read = bitacora_io::read_table(&file)?;

    if !read.ignored_columns.is_empty() {
        ctx.note(format!("ignored columns: {}", read.ignored_columns.join(", ")));
    }
    report_coercions(ctx, &read.warnings);
    if !store.inputs_changed(&read.rows) {
        ctx.note("no input changes; deltas recomputed");
    }

    store.replace(read.rows);
    ctx.session.save(&store)?;

    print!("{}", table::render(store.get()));
    report_anomalies(ctx, &delta::negative_deltas(store.get()));
    Ok(())
}

fn cmd_last_row(ctx: &Context) -> Result<(), CliError> {
    let store = ctx.session.require()?;
    let line = table::last_row_tsv(store.get()).ok_or_else(|| CliError {
        code: EXIT_NO_SESSION,
        message: "session table has no rows".into(),
        hint: None,
    })?;
    println!("{}", line);
    Ok(())
}

fn cmd_export(ctx: &Context, output: Option<PathBuf>, sheet: Option<String>) -> Result<(), CliError> {
    let store = ctx.session.require()?;
    let settings = Settings::load();
    let report_date = store.table().and_then(|t| t.report_date);

    let path = output.unwrap_or_else(|| {
        PathBuf::from(bitacora_io::default_file_name(report_date, &settings.export.file_prefix))
    });
    let options = ExportOptions { sheet_name: sheet.unwrap_or(settings.export.sheet_name) };

    let result = bitacora_io::export(store.get(), &path, &options)?;
    if result.negative_deltas > 0 {
        ctx.warn(format!("{} negative consumption values exported as-is", result.negative_deltas));
    }
    ctx.note(format!("exported {}", result.summary()));
    println!("{}", path.display());
    Ok(())
}

fn cmd_reset(ctx: &Context) -> Result<(), CliError> {
    let mut store = match ctx.session.load() {
        Ok(store) => store,
        // A corrupt file is exactly what reset is for.
        Err(SessionError::Corrupt { .. }) => RowStore::new(),
        Err(e) => return Err(e.into()),
    };
    store.reset();
    if ctx.session.delete()? {
        ctx.note(format!("session cleared ({})", ctx.session.path().display()));
    } else {
        ctx.note("no session to clear");
    }
    Ok(())
}

fn cmd_prompt(args: SchemaArgs) -> Result<(), CliError> {
    let settings = Settings::load();
    let schema = resolve_schema(&args, &settings.schema)?;
    println!("{}", build_prompt(&schema));
    Ok(())
}

// ============================================================================
// ai
// ============================================================================

fn cmd_ai_doctor(json: bool) -> Result<(), CliError> {
    let config = ResolvedAIConfig::load();
    let diag = AIDiagnostics::from_resolved(&config);

    if json {
        let out = serde_json::to_string_pretty(&diag)
            .map_err(|e| CliError::general(format!("cannot encode diagnostics: {}", e)))?;
        println!("{}", out);
    } else {
        print!("{}", diag);
        println!("Settings:          {}", Settings::config_path_display());
    }

    match diag.status {
        AIConfigStatus::Disabled => Err(CliError { code: EXIT_AI_DISABLED, message: String::new(), hint: None }),
        AIConfigStatus::MissingKey => Err(CliError { code: EXIT_AI_MISSING_KEY, message: String::new(), hint: None }),
        AIConfigStatus::Ready => Ok(()),
    }
}

fn key_provider(name: &str) -> Result<AIProvider, CliError> {
    match AIProvider::from_name(name) {
        Some(p) if p.is_enabled() => Ok(p),
        _ => Err(CliError::args(format!("unknown provider '{}' (expected gemini or openai)", name))),
    }
}

fn cmd_ai_set_key(provider: String) -> Result<(), CliError> {
    let provider = key_provider(&provider)?;
    let mut key = String::new();
    io::stdin()
        .read_to_string(&mut key)
        .map_err(|e| CliError::io(format!("cannot read key from stdin: {}", e)))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::args("no key on stdin"));
    }
    ai::set_api_key(provider.name(), key)
        .map_err(|e| CliError { code: EXIT_AI_KEYCHAIN_ERR, message: e, hint: None })?;
    eprintln!("Stored {} key in the system keychain", provider.name());
    Ok(())
}

fn cmd_ai_delete_key(provider: String) -> Result<(), CliError> {
    let provider = key_provider(&provider)?;
    ai::delete_api_key(provider.name())
        .map_err(|e| CliError { code: EXIT_AI_KEYCHAIN_ERR, message: e, hint: None })?;
    eprintln!("Deleted {} key from the system keychain", provider.name());
    Ok(())
}
