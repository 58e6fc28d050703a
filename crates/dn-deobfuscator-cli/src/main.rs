use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dn_deobfuscator_core::{
    ContainerKind, LoadError, PatchCatalog, PatchExtractor, RuleRegistry, extract_container,
    load_preset, patch_block, read_input, render_catalog, render_preset, scan_sysex,
};
use glob::glob;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("DN_DEOBFUSCATOR_BUILD_COMMIT"),
    " ",
    env!("DN_DEOBFUSCATOR_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "dn-deobfuscator")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Decode Elektron Digitone project, preset and SysEx files.",
    long_about = None,
    after_help = "Examples:\n  dn-deobfuscator preset hidden-tears.dn2pst -o hidden-tears.json\n  dn-deobfuscator container AUTOMATIC.dn2prj --extract-to out/\n  dn-deobfuscator sysex 'dumps/*.syx' -o patches.md --append\n  dn-deobfuscator batch presets/ -o summary.md\n\nLog verbosity follows RUST_LOG (default: warn)."
)]
struct Cli {
    /// Suppress non-error output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode the sound parameters of a .dn2pst preset (or a .dn2prj blob).
    Preset {
        /// Path to a .dn2pst or .dn2prj file
        input: PathBuf,

        /// JSON rule overlay layered on the built-in rules
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Output path
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        output: Option<PathBuf>,

        /// Write to stdout instead of a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },
    /// List the sections of a container.
    Container {
        /// Path to a .dn2prj or .dn2pst file
        input: PathBuf,

        /// Write every section to DIR/<entry name>
        #[arg(long, value_name = "DIR")]
        extract_to: Option<PathBuf>,
    },
    /// Extract sound patches from SysEx dumps into a markdown file.
    Sysex {
        /// .syx files or glob patterns
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Markdown output path
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Append to the output instead of replacing it
        #[arg(long)]
        append: bool,
    },
    /// Summarise every .dn2pst preset of a directory as markdown.
    Batch {
        /// Directory holding .dn2pst files
        dir: PathBuf,

        /// Markdown output path
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Also write each preset's sections to DIR
        #[arg(long, value_name = "DIR")]
        extract_to: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Markdown,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Preset {
            input,
            rules,
            format,
            output,
            stdout,
        } => cmd_preset(input, rules, format, output, stdout, quiet),
        Commands::Container { input, extract_to } => cmd_container(input, extract_to, quiet),
        Commands::Sysex {
            inputs,
            output,
            append,
        } => cmd_sysex(inputs, output, append, quiet),
        Commands::Batch {
            dir,
            output,
            extract_to,
        } => cmd_batch(dir, output, extract_to, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        let hint = match &err {
            LoadError::Io { .. } => "check the path and file permissions",
            LoadError::UnknownKind { .. } => "use a .dn2pst or .dn2prj file",
            LoadError::Container { .. } => "the file is not a Digitone container or is damaged",
        };
        CliError::new(err.to_string(), Some(hint.to_string()))
    }
}

fn cmd_preset(
    input: PathBuf,
    rules: Option<PathBuf>,
    format: Format,
    output: Option<PathBuf>,
    stdout: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let input = resolve_single(&input)?;
    let overlay;
    let registry = match rules {
        Some(path) => {
            overlay = RuleRegistry::load_overlay(&path).map_err(|err| {
                CliError::new(
                    format!("failed to load rules from {}: {}", path.display(), err),
                    Some("expected a JSON array of rules or {\"rules\": [...]}".to_string()),
                )
            })?;
            &overlay
        }
        None => RuleRegistry::builtin(),
    };

    let file = load_preset(&input)?;
    let preset = file.decode(registry);
    info!(
        path = %input.display(),
        fields = preset.fields().count(),
        gaps = preset.gaps().count(),
        "decoded preset"
    );

    let rendered = match format {
        Format::Json => {
            let mut doc = preset.to_json();
            if let Value::Object(map) = &mut doc {
                map.insert(
                    "source".to_string(),
                    json!({
                        "path": input.display().to_string(),
                        "container": file.kind,
                        "section": &file.section,
                        "rules_version": registry.version(),
                    }),
                );
            }
            let mut text =
                serde_json::to_string_pretty(&doc).context("JSON serialization failed")?;
            text.push('\n');
            text
        }
        Format::Markdown => render_preset(&file.stem(), &preset),
    };

    if stdout {
        print!("{}", rendered);
        return Ok(());
    }

    let output = output.ok_or_else(|| {
        CliError::new(
            "missing output path",
            Some("use -o/--output or --stdout".to_string()),
        )
    })?;
    ensure_distinct(&input, &output)?;
    create_parent(&output)?;
    fs::write(&output, rendered)
        .with_context(|| format!("Failed to write output: {}", output.display()))?;
    if !quiet {
        eprintln!("OK: preset decoded -> {}", output.display());
    }
    Ok(())
}

fn cmd_container(input: PathBuf, extract_to: Option<PathBuf>, quiet: bool) -> Result<(), CliError> {
    let input = resolve_single(&input)?;
    let kind = ContainerKind::from_path(&input).ok_or_else(|| {
        CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .dn2prj or .dn2pst file".to_string()),
        )
    })?;
    let bytes = read_input(&input)?;
    let container = extract_container(&bytes, kind)
        .with_context(|| format!("Failed to extract container: {}", input.display()))?;

    for section in container.sections() {
        println!(
            "{}\t{:?}\t{} bytes\t@{:#x}{}",
            section.name,
            section.role,
            section.len(),
            section.offset,
            if section.inflated { " (inflated)" } else { "" }
        );
    }

    if let Some(dir) = extract_to {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        for section in container.sections() {
            let target = section_path(&dir, &section.name)?;
            create_parent(&target)?;
            fs::write(&target, section.bytes())
                .with_context(|| format!("Failed to write section: {}", target.display()))?;
            debug!(path = %target.display(), bytes = section.len(), "wrote section");
        }
        if !quiet {
            eprintln!(
                "OK: {} sections extracted -> {}",
                container.sections().len(),
                dir.display()
            );
        }
    }
    Ok(())
}

fn cmd_sysex(inputs: Vec<PathBuf>, output: PathBuf, append: bool, quiet: bool) -> Result<(), CliError> {
    let paths = resolve_inputs(&inputs)?;
    let mut buffers = Vec::with_capacity(paths.len());
    for path in &paths {
        ensure_distinct(path, &output)?;
        buffers.push(read_input(path)?);
    }

    let extractor = PatchExtractor::new();
    let mut catalog = PatchCatalog::new();
    for (path, bytes) in paths.iter().zip(&buffers) {
        let before = catalog.len();
        extractor.extract_into(&mut catalog, scan_sysex(bytes));
        info!(
            path = %path.display(),
            patches = catalog.len() - before,
            "scanned SysEx dump"
        );
    }

    if catalog.is_empty() {
        return Err(CliError::new(
            format!(
                "No valid patches found in {}",
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Some("expected Digitone sound dumps (F0 00 20 3C 0D .. 53 .. F7)".to_string()),
        ));
    }

    let markdown = render_catalog(&catalog);
    write_markdown(&output, &markdown, append)?;
    if !quiet {
        eprintln!(
            "OK: {} patches {} -> {}",
            catalog.len(),
            if append { "appended" } else { "written" },
            output.display()
        );
    }
    Ok(())
}

fn cmd_batch(
    dir: PathBuf,
    output: PathBuf,
    extract_to: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    if !dir.is_dir() {
        return Err(CliError::new(
            format!("not a directory: {}", dir.display()),
            Some("pass the directory holding the .dn2pst files".to_string()),
        ));
    }
    let mut presets = Vec::new();
    for entry in fs::read_dir(&dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            .path();
        if path.is_file() && ContainerKind::from_path(&path) == Some(ContainerKind::Dn2Pst) {
            presets.push(path);
        }
    }
    presets.sort();
    if presets.is_empty() {
        return Err(CliError::new(
            format!("no .dn2pst files found in {}", dir.display()),
            Some("check the directory path".to_string()),
        ));
    }

    let mut markdown = String::new();
    let mut summarised = 0usize;
    let mut skipped = Vec::new();
    for path in &presets {
        let file = match load_preset(path) {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable preset");
                skipped.push(err);
                continue;
            }
        };
        summarised += 1;
        let stem = file.stem();
        markdown.push_str(&patch_block(&stem, &file.tags().join(", "), &file.binary));

        if let Some(target_dir) = extract_to.as_ref() {
            fs::create_dir_all(target_dir).with_context(|| {
                format!("Failed to create output directory: {}", target_dir.display())
            })?;
            let binary_path = target_dir.join(&stem);
            fs::write(&binary_path, &file.binary)
                .with_context(|| format!("Failed to write: {}", binary_path.display()))?;
            if let Some(text) = file.text.as_ref() {
                let text_path = target_dir.join(format!("{stem}.txt"));
                fs::write(&text_path, text)
                    .with_context(|| format!("Failed to write: {}", text_path.display()))?;
            }
        }
    }

    if summarised == 0 {
        let first = skipped
            .first()
            .map(|err| err.to_string())
            .unwrap_or_default();
        return Err(CliError::new(
            format!("no readable .dn2pst files in {}: {first}", dir.display()),
            Some("check that the presets are intact Digitone exports".to_string()),
        ));
    }

    write_markdown(&output, &markdown, false)?;
    if !quiet {
        eprintln!(
            "OK: {} presets summarised, {} skipped -> {}",
            summarised,
            skipped.len(),
            output.display()
        );
    }
    Ok(())
}

fn write_markdown(output: &Path, markdown: &str, append: bool) -> Result<(), CliError> {
    create_parent(output)?;
    if append {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(output)
            .with_context(|| format!("Failed to open output: {}", output.display()))?;
        file.write_all(markdown.as_bytes())
            .with_context(|| format!("Failed to append output: {}", output.display()))?;
    } else {
        fs::write(output, markdown)
            .with_context(|| format!("Failed to write output: {}", output.display()))?;
    }
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

/// Entry names come from the archive; keep them inside `dir`.
fn section_path(dir: &Path, name: &str) -> Result<PathBuf, CliError> {
    let relative = Path::new(name);
    let safe = relative
        .components()
        .all(|component| matches!(component, std::path::Component::Normal(_)));
    if !safe {
        return Err(CliError::new(
            format!("refusing to extract entry '{}' outside the target directory", name),
            None,
        ));
    }
    Ok(dir.join(relative))
}

fn ensure_distinct(input: &Path, output: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    if let Ok(output_abs) = fs::canonicalize(output) {
        if output_abs == input_abs {
            return Err(CliError::new(
                format!("output path must differ from input: {}", output.display()),
                Some("choose a different output path".to_string()),
            ));
        }
    }
    Ok(())
}

fn resolve_single(input: &Path) -> Result<PathBuf, CliError> {
    let mut matches = resolve_inputs(std::slice::from_ref(&input.to_path_buf()))?;
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                input.display(),
                matches.len(),
                listed,
                if matches.len() > 3 { ", ..." } else { "" }
            ),
            Some("pass a single file, or run once per file".to_string()),
        ));
    }
    let path = matches.remove(0);
    if !path.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", path.display()),
            Some("use a .dn2pst, .dn2prj or .syx file".to_string()),
        ));
    }
    Ok(path)
}

/// Expands glob patterns; plain paths pass through unchanged.
fn resolve_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
    let mut resolved = Vec::new();
    for input in inputs {
        let pattern = input.to_string_lossy();
        if !is_glob_pattern(&pattern) {
            resolved.push(input.clone());
            continue;
        }

        let paths = glob(&pattern).map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err.msg)),
            )
        })?;
        let before = resolved.len();
        for entry in paths {
            let path = entry.map_err(|err| {
                CliError::new(
                    format!("invalid input pattern '{}'", pattern),
                    Some(format!("pattern error: {}", err)),
                )
            })?;
            if path.is_file() {
                resolved.push(path);
            }
        }
        if resolved.len() == before {
            return Err(CliError::new(
                format!("no files match pattern '{}'", pattern),
                Some("check the path or quote the pattern".to_string()),
            ));
        }
    }
    Ok(resolved)
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
