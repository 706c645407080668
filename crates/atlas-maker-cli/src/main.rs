use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use atlas_maker_core::prelude::*;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "atlas-maker",
    about = "Incrementally build sprite atlases from selected images",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile the selection with the atlas and rebuild it
    Build(BuildArgs),
    /// Show what a build would do (Include/Add/Update/Delete/Ignore) without writing anything
    Plan(PlanArgs),
    /// Print an atlas, or look up a single region
    Show(ShowArgs),
    /// Create an atlas from an existing sprite sheet and its `.sheet.json` sidecar
    Import(ImportArgs),
}

#[derive(Parser, Debug, Clone)]
struct SelectionArgs {
    /// Input files or directories
    #[arg(help_heading = "Input/Output")]
    inputs: Vec<PathBuf>,
    /// Atlas asset file (created when missing)
    #[arg(short, long, help_heading = "Input/Output")]
    atlas: PathBuf,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// Remove a region from the atlas (repeatable)
    #[arg(long = "delete", value_name = "NAME", help_heading = "Input/Output")]
    delete: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
struct LayoutArgs {
    /// YAML config file path
    #[arg(long, help_heading = "Layout")]
    config: Option<PathBuf>,
    /// Transparent pixels between regions [default: 2]
    #[arg(long, help_heading = "Layout")]
    padding: Option<u32>,
    /// Grow the raster to a square [default: true]
    #[arg(long, action=ArgAction::Set, help_heading = "Layout")]
    squared: Option<bool>,
    /// Maximum raster width/height [default: 2048]
    #[arg(long, help_heading = "Layout")]
    max_dimension: Option<u32>,
    /// MaxRects heuristic: baf|bssf|blsf|bl|cp [default: baf]
    #[arg(long, help_heading = "Layout")]
    heuristic: Option<String>,
    /// Refuse to write the atlas outside this directory
    #[arg(long, help_heading = "Layout")]
    asset_root: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
struct BuildArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    #[command(flatten)]
    layout: LayoutArgs,
    /// Rebuild even when no entry changed
    #[arg(long, default_value_t = false, help_heading = "Export")]
    force: bool,
    /// Export build report (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
}

#[derive(Parser, Debug, Clone)]
struct PlanArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Print entries as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug, Clone)]
struct ShowArgs {
    /// Atlas asset file
    atlas: PathBuf,
    /// Look up a single region by name
    #[arg(long)]
    name: Option<String>,
    /// Print as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug, Clone)]
struct ImportArgs {
    /// Sprite sheet image with a `.sheet.json` sidecar
    sheet: PathBuf,
    /// Atlas asset file to create
    #[arg(short, long)]
    atlas: PathBuf,
    /// Overwrite an existing atlas file
    #[arg(long, default_value_t = false)]
    force: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Build(args) => run_build(args, cli.progress && !cli.quiet),
        Commands::Plan(args) => run_plan(args),
        Commands::Show(args) => run_show(args),
        Commands::Import(args) => run_import(args),
    }
}

fn run_build(args: &BuildArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = resolve_config(&args.layout)?;
    if args.print_config {
        match args.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }
    cfg.validate()?;

    let catalog = SheetCatalog::new();
    let atlas_path = &args.selection.atlas;
    let mut atlas = AtlasAsset::open_or_new(atlas_path)
        .with_context(|| format!("open atlas {}", atlas_path.display()))?;
    let reconciler = reconcile_selection(&args.selection, &atlas, &catalog)?;
    let counts = reconciler.counts();
    info!(
        include = counts.include,
        add = counts.add,
        update = counts.update,
        delete = counts.delete,
        ignore = counts.ignore,
        "reconciled selection"
    );
    if !reconciler.has_changes() && !args.force {
        info!(atlas = %atlas_path.display(), "atlas is up to date, nothing to do");
        return Ok(());
    }

    let mut progress = BarProgress::new(show_progress);
    let start = Instant::now();
    let report = rebuild_atlas(&mut atlas, reconciler.entries(), &cfg, &catalog, &mut progress)
        .with_context(|| format!("rebuild {}", atlas_path.display()))?;
    info!(
        raster = %report.raster_path.display(),
        created = report.created,
        time = %fmt_dur(start.elapsed()),
        "atlas written"
    );
    println!("{}", report.stats.summary());

    if let Some(path) = &args.export_stats {
        let text = serde_json::to_string_pretty(&report)?;
        fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}

fn run_plan(args: &PlanArgs) -> anyhow::Result<()> {
    let catalog = SheetCatalog::new();
    let atlas = AtlasAsset::open_or_new(&args.selection.atlas)
        .with_context(|| format!("open atlas {}", args.selection.atlas.display()))?;
    let reconciler = reconcile_selection(&args.selection, &atlas, &catalog)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(reconciler.entries())?);
        return Ok(());
    }

    let width = reconciler
        .entries()
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(0)
        .max(4);
    println!("{:<8} {:<width$} SOURCE", "ACTION", "NAME", width = width);
    for e in reconciler.entries() {
        let source = e
            .source_for_packing()
            .map(|s| s.path().display().to_string())
            .unwrap_or_default();
        println!(
            "{:<8} {:<width$} {}",
            e.action().to_string(),
            e.name,
            source,
            width = width
        );
    }
    let c = reconciler.counts();
    println!(
        "include={} add={} update={} delete={} ignore={} changed={}",
        c.include,
        c.add,
        c.update,
        c.delete,
        c.ignore,
        reconciler.has_changes()
    );
    Ok(())
}

fn run_show(args: &ShowArgs) -> anyhow::Result<()> {
    let atlas =
        AtlasAsset::open(&args.atlas).with_context(|| format!("open atlas {}", args.atlas.display()))?;
    if let Some(name) = &args.name {
        let Some(region) = atlas.get_region(name) else {
            anyhow::bail!("no region named '{}' in {}", name, args.atlas.display());
        };
        if args.json {
            println!("{}", serde_json::to_string_pretty(region)?);
        } else {
            print_region(region);
        }
        return Ok(());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&atlas.to_file())?);
        return Ok(());
    }

    match atlas.raster() {
        Some(r) => println!("raster: {} ({}x{})", r.file, r.width, r.height),
        None => println!("raster: <none>"),
    }
    let meta = atlas.meta();
    println!(
        "padding={} squared={} max_dimension={}",
        meta.padding, meta.squared, meta.max_dimension
    );
    for region in atlas.regions() {
        print_region(region);
    }
    println!("{}", atlas.stats().summary());
    Ok(())
}

fn run_import(args: &ImportArgs) -> anyhow::Result<()> {
    if args.atlas.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.atlas.display()
        );
    }
    let catalog = SheetCatalog::new();
    let atlas = AtlasAsset::from_sheet(&args.atlas, &args.sheet, &catalog)
        .with_context(|| format!("import {}", args.sheet.display()))?;
    if let Some(dir) = args.atlas.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    atlas
        .save()
        .with_context(|| format!("write {}", args.atlas.display()))?;
    info!(atlas = %args.atlas.display(), regions = atlas.len(), "imported sprite sheet");
    println!("{}", atlas.stats().summary());
    Ok(())
}

fn print_region(r: &Region) {
    println!(
        "{}: x={} y={} w={} h={} border=({},{},{},{}) pivot=({:.3},{:.3})",
        r.name,
        r.rect.x,
        r.rect.y,
        r.rect.w,
        r.rect.h,
        r.border.left,
        r.border.top,
        r.border.right,
        r.border.bottom,
        r.pivot.x,
        r.pivot.y
    );
}

/// Gather the selection, reconcile it against `atlas` and apply `--delete` flags.
fn reconcile_selection(
    args: &SelectionArgs,
    atlas: &AtlasAsset,
    catalog: &dyn AssetCatalog,
) -> anyhow::Result<Reconciler> {
    let mut selection = Vec::new();
    for input in &args.inputs {
        if !input.exists() {
            anyhow::bail!("input {} does not exist", input.display());
        }
        let paths = gather_paths(input, &args.include, &args.exclude)?;
        selection.extend(paths.into_iter().map(SourceImage::file));
    }
    info!(count = selection.len(), "gathered selection");

    let mut reconciler = Reconciler::new();
    reconciler.reconcile(&selection, Some(atlas), catalog);
    for name in &args.delete {
        if !reconciler.set_delete(name, true) {
            warn!(%name, "--delete names no entry");
        }
    }
    Ok(reconciler)
}

/// Defaults, then the YAML file, then explicit command-line options.
fn resolve_config(args: &LayoutArgs) -> anyhow::Result<AtlasConfig> {
    let mut cfg = AtlasConfig::default();
    if let Some(path) = &args.config {
        let file = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        cfg = y.into_atlas_config(cfg)?;
    }
    if let Some(v) = args.padding {
        cfg.padding = v;
    }
    if let Some(v) = args.squared {
        cfg.squared = v;
    }
    if let Some(v) = args.max_dimension {
        cfg.max_dimension = v;
    }
    if let Some(v) = &args.heuristic {
        cfg.heuristic = parse_heuristic(v)?;
    }
    if let Some(v) = &args.asset_root {
        cfg.asset_root = Some(v.clone());
    }
    Ok(cfg)
}

fn parse_heuristic(s: &str) -> anyhow::Result<MaxRectsHeuristic> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown heuristic: {} (expected baf|bssf|blsf|bl|cp)", s))
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    padding: Option<u32>,
    squared: Option<bool>,
    max_dimension: Option<u32>,
    heuristic: Option<String>,
    asset_root: Option<PathBuf>,
}

impl YamlConfig {
    fn into_atlas_config(self, mut cfg: AtlasConfig) -> anyhow::Result<AtlasConfig> {
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.squared {
            cfg.squared = v;
        }
        if let Some(v) = self.max_dimension {
            cfg.max_dimension = v;
        }
        if let Some(v) = self.heuristic {
            cfg.heuristic = parse_heuristic(&v)?;
        }
        if let Some(v) = self.asset_root {
            cfg.asset_root = Some(v);
        }
        Ok(cfg)
    }
}

/// Progress bar shown while a rebuild pass runs; removed when the pass ends.
struct BarProgress {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl BarProgress {
    fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }
}

impl Progress for BarProgress {
    fn update(&mut self, stage: BuildStage, detail: &str, fraction: f32) {
        if !self.enabled {
            return;
        }
        let bar = self.bar.get_or_insert_with(|| {
            let b = ProgressBar::new(100);
            b.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {prefix} [{bar:30}] [{elapsed_precise}] {wide_msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            b
        });
        bar.set_prefix(stage.to_string());
        bar.set_message(detail.to_string());
        bar.set_position((fraction.clamp(0.0, 1.0) * 100.0) as u64);
    }

    fn clear(&mut self) {
        if let Some(b) = self.bar.take() {
            b.finish_and_clear();
        }
    }
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    // Build glob matchers
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg")
    )
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_then_flags_override_defaults() {
        let y: YamlConfig =
            serde_yaml::from_str("padding: 4\nsquared: false\nheuristic: bssf\n").expect("yaml");
        let cfg = y.into_atlas_config(AtlasConfig::default()).expect("merge");
        assert_eq!(cfg.padding, 4);
        assert!(!cfg.squared);
        assert_eq!(cfg.max_dimension, 2048);
        assert_eq!(cfg.heuristic, MaxRectsHeuristic::BestShortSideFit);

        let args = LayoutArgs {
            config: None,
            padding: Some(1),
            squared: None,
            max_dimension: Some(512),
            heuristic: Some("cp".into()),
            asset_root: None,
        };
        let cfg = resolve_config(&args).expect("resolve");
        assert_eq!((cfg.padding, cfg.max_dimension), (1, 512));
        assert!(cfg.squared);
        assert_eq!(cfg.heuristic, MaxRectsHeuristic::ContactPoint);
    }

    #[test]
    fn unknown_heuristic_is_an_error() {
        assert!(parse_heuristic("skyline").is_err());
    }

    #[test]
    fn image_extensions() {
        assert!(is_image(Path::new("a/b.PNG")));
        assert!(is_image(Path::new("c.jpeg")));
        assert!(!is_image(Path::new("hero.sheet.json")));
    }

    #[test]
    fn exclude_beats_include() {
        let mut inc = GlobSetBuilder::new();
        inc.add(Glob::new("**/*.png").expect("glob"));
        let inc = inc.build().expect("set");
        let mut exc = GlobSetBuilder::new();
        exc.add(Glob::new("**/skip/**").expect("glob"));
        let exc = exc.build().expect("set");
        assert!(should_skip(Path::new("a/skip/x.png"), Some(&inc), Some(&exc)));
        assert!(!should_skip(Path::new("a/keep/x.png"), Some(&inc), Some(&exc)));
        assert!(should_skip(Path::new("a/keep/x.jpg"), Some(&inc), Some(&exc)));
    }
}
