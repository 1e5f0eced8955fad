use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use docicon::{
    AssetCache, BackgroundChoice, BatchManifest, ExternalPackager, GeneratorProfile, IcnsPackager,
    Packager, TextRendererKind,
};

#[derive(Parser, Debug)]
#[command(name = "docicon", version, about = "Generate macOS document icons")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one icon per --text value (or a single generic icon).
    Make(MakeArgs),
    /// Generate every icon listed in a manifest JSON file.
    Batch(BatchArgs),
}

#[derive(Parser, Debug)]
struct PackagerArgs {
    /// Package with the makeicns tool at this path.
    #[arg(long, conflicts_with_all = ["iconutil", "builtin"])]
    makeicns: Option<PathBuf>,

    /// Package with the system iconutil tool.
    #[arg(long, conflicts_with = "builtin")]
    iconutil: bool,

    /// Write the .icns container in-process. This is the default.
    #[arg(long)]
    builtin: bool,
}

impl PackagerArgs {
    fn packager(&self) -> Box<dyn Packager> {
        match (&self.makeicns, self.iconutil) {
            (Some(path), _) => Box::new(ExternalPackager::makeicns(path)),
            (None, true) => Box::new(ExternalPackager::iconutil()),
            (None, false) => Box::new(IcnsPackager),
        }
    }
}

#[derive(Parser, Debug)]
struct MakeArgs {
    /// Base settings as JSON; flags below override it.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// `default-split`, `default-unsplit` or a path to an image or .icns.
    #[arg(long, visible_alias = "bg")]
    background: Option<String>,

    /// App icon drawn on the page.
    #[arg(long = "appicon")]
    app_icon: Option<PathBuf>,

    /// Caption list such as "PYTHON,PY"; repeat for several icons.
    #[arg(long)]
    text: Vec<String>,

    /// Comma separated pixel sizes, e.g. 512,128,32,16.
    #[arg(long, value_delimiter = ',')]
    sizes: Vec<u32>,

    /// Also write each size as PNG; `%d` is replaced by the size.
    #[arg(long = "debug")]
    debug_pattern: Option<String>,

    /// Output file. Ignored when more than one --text is given.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory for derived output names.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Font file to register; may be repeated.
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Directory of font files to register; may be repeated.
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,

    /// Caption font family in order of preference; may be repeated.
    #[arg(long = "font-family")]
    font_families: Vec<String>,

    #[arg(long, value_enum)]
    text_renderer: Option<TextRendererChoice>,

    #[command(flatten)]
    packager: PackagerArgs,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Manifest JSON.
    manifest: PathBuf,

    #[command(flatten)]
    packager: PackagerArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TextRendererChoice {
    Standard,
    Office,
}

impl From<TextRendererChoice> for TextRendererKind {
    fn from(choice: TextRendererChoice) -> Self {
        match choice {
            TextRendererChoice::Standard => TextRendererKind::Standard,
            TextRendererChoice::Office => TextRendererKind::Office,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Make(args) => cmd_make(args),
        Command::Batch(args) => cmd_batch(args),
    }
}

fn build_profile(args: &MakeArgs) -> anyhow::Result<GeneratorProfile> {
    let mut profile = match &args.profile {
        Some(path) => GeneratorProfile::load(path)
            .with_context(|| format!("load profile '{}'", path.display()))?,
        None => GeneratorProfile::new(),
    };

    if let Some(background) = &args.background {
        profile.background = BackgroundChoice::from(background.clone());
    }
    if let Some(app_icon) = &args.app_icon {
        profile.app_icon = Some(app_icon.clone());
    }
    if !args.text.is_empty() {
        profile.text = args.text.clone();
    }
    if !args.sizes.is_empty() {
        profile.sizes = Some(args.sizes.clone());
    }
    if let Some(pattern) = &args.debug_pattern {
        profile.debug_pattern = Some(pattern.clone());
    }
    if let Some(out) = &args.out {
        profile.output = Some(out.clone());
    }
    if let Some(dir) = &args.out_dir {
        profile.output_dir = Some(dir.clone());
    }
    profile.font_files.extend(args.fonts.iter().cloned());
    profile.font_dirs.extend(args.font_dirs.iter().cloned());
    if !args.font_families.is_empty() {
        profile.font_families = args.font_families.clone();
    }
    if let Some(choice) = args.text_renderer {
        profile.text_renderer = choice.into();
    }
    Ok(profile)
}

fn cmd_make(args: MakeArgs) -> anyhow::Result<()> {
    let profile = build_profile(&args)?;
    let packager = args.packager.packager();
    let cache = AssetCache::new();

    let written = docicon::make_document_icons(&profile, &cache, packager.as_ref())
        .context("generate document icon")?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_batch(args: BatchArgs) -> anyhow::Result<()> {
    let manifest = BatchManifest::load(&args.manifest)
        .with_context(|| format!("load manifest '{}'", args.manifest.display()))?;
    let packager = args.packager.packager();
    let cache = AssetCache::new();

    let summary = docicon::run_batch(&manifest, &cache, packager.as_ref())
        .with_context(|| format!("run batch '{}'", args.manifest.display()))?;

    println!(
        "generated {}, linked {}, failed {}{}",
        summary.generated.len(),
        summary.linked.len(),
        summary.failed.len(),
        if summary.degraded { " (stock icon fallback)" } else { "" }
    );
    for (name, err) in &summary.failed {
        eprintln!("{name}: {err}");
    }
    if !summary.failed.is_empty() {
        anyhow::bail!("{} icon(s) failed", summary.failed.len());
    }
    Ok(())
}
