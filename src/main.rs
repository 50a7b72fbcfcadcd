//! yt-grab - pick a format, download it, cancel cleanly
//!
//! A terminal front-end for yt-dlp: inspect formats, build a selector or
//! apply a preset, and follow the download with a live progress bar.

use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use yt_grab::core::args::{download_args, output_template_in, split_args};
use yt_grab::core::formats::{
    FormatFilter, KindFilter, distinct_extensions, distinct_protocols, distinct_resolutions,
    sort_by_resolution,
};
use yt_grab::core::process::supports_tree_kill;
use yt_grab::core::selector::{self, EntryOptions, MediaKind, MultiMode, MultiSelection, SimpleSelection};
use yt_grab::core::thumbnail::{fetch_thumbnail, image_extension};
use yt_grab::core::{OperationKind, OperationSlot, YtDlp};
use yt_grab::error::GrabError;
use yt_grab::storage::config;
use yt_grab::types::{BEST, Config, DEFAULT_OUTPUT_TEMPLATE, DownloadRequest, FormatEntry, MediaInfo, PresetStore};
use yt_grab::ui::progress::DownloadView;
use yt_grab::ui::selector::{Selector, format_menu, preset_menu};
use yt_grab::utils::paths::get_presets_path;

/// Exit code used when the user cancels with Ctrl-C
const EXIT_CANCELLED: i32 = 130;

/// Download media with yt-dlp. Pick formats, use presets, cancel cleanly.
#[derive(Parser, Debug)]
#[command(name = "yt-grab")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Media URL
    url: String,

    /// yt-dlp executable (overrides config)
    #[arg(long)]
    tool: Option<String>,

    /// Output directory (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Raw yt-dlp format selector
    #[arg(short, long, conflicts_with_all = ["pick", "preset", "formats"])]
    format: Option<String>,

    /// Choose formats interactively from the available list
    #[arg(long, conflicts_with_all = ["preset", "formats"])]
    pick: bool,

    /// Use a saved preset; without a name, choose one from a menu
    #[arg(long, num_args = 0..=1, default_missing_value = "", conflicts_with = "formats")]
    preset: Option<String>,

    /// Format ids to download, comma separated
    #[arg(long, value_delimiter = ',')]
    formats: Vec<String>,

    /// Download several formats as separate files instead of merging
    #[arg(long)]
    separate: bool,

    /// Media kind for simple selection
    #[arg(long, value_enum, default_value_t = Kind::Video)]
    kind: Kind,

    /// Container, e.g. mp4 or webm
    #[arg(long, default_value = BEST)]
    ext: String,

    /// Maximum quality, e.g. 1080p
    #[arg(long, default_value = BEST)]
    quality: String,

    /// Audio container for merged downloads (overrides config)
    #[arg(long)]
    audio_ext: Option<String>,

    /// Do not pair video-only streams with audio
    #[arg(long)]
    no_merge: bool,

    /// Subtitle languages, comma separated
    #[arg(long, value_delimiter = ',')]
    subs: Vec<String>,

    /// Format sort spec passed to -S
    #[arg(long)]
    sort: Option<String>,

    /// Pass --ignore-config to yt-dlp
    #[arg(long)]
    ignore_config: bool,

    /// Show metadata and formats, then exit
    #[arg(long)]
    info: bool,

    /// Print the yt-dlp command instead of running it
    #[arg(long)]
    print_command: bool,

    /// Save the thumbnail next to the download
    #[arg(long)]
    thumbnail: bool,

    /// Echo yt-dlp's other output lines
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Video,
    Audio,
}

/// What to hand yt-dlp besides the URL
struct Plan {
    request: DownloadRequest,
    label: String,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "yt_grab=warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Fold CLI overrides into the loaded config
fn apply_overrides(mut cfg: Config, cli: &Cli) -> Config {
    if let Some(tool) = &cli.tool {
        cfg.tool_path = tool.clone();
    }
    if let Some(dir) = &cli.output {
        cfg.download_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(audio_ext) = &cli.audio_ext {
        cfg.audio_ext = audio_ext.clone();
    }
    if cli.no_merge {
        cfg.auto_merge = false;
    }
    if cli.ignore_config {
        cfg.ignore_config = true;
    }
    if !cli.subs.is_empty() {
        cfg.sub_langs = cli.subs.clone();
    }
    if cli.sort.is_some() {
        cfg.sort = cli.sort.clone();
    }
    cfg
}

fn needs_metadata(cli: &Cli) -> bool {
    cli.info || cli.pick || cli.thumbnail || !cli.formats.is_empty()
}

fn entry_options(cfg: &Config) -> EntryOptions {
    EntryOptions {
        auto_merge: cfg.auto_merge,
        audio_ext: Some(cfg.audio_ext.clone()),
    }
}

/// Selector for one or more picked entries
fn selection_for(entries: &[&FormatEntry], separate: bool, cfg: &Config) -> anyhow::Result<(String, Option<MultiSelection>)> {
    match entries {
        [single] => Ok((selector::for_entry(single, &entry_options(cfg)), None)),
        _ => {
            let mode = if separate { MultiMode::Separate } else { MultiMode::Merge };
            let multi = MultiSelection::new(entries, mode)?;
            Ok((multi.selector.clone(), Some(multi)))
        }
    }
}

async fn build_plan(
    cli: &Cli,
    cfg: &Config,
    info: Option<&MediaInfo>,
    ui: &Selector,
    out_dir: &Path,
) -> anyhow::Result<Option<Plan>> {
    let mut template = DEFAULT_OUTPUT_TEMPLATE;
    let base = DownloadRequest::new(cli.url.trim())
        .ignore_config(cfg.ignore_config)
        .sort(cfg.sort.clone())
        .subtitles(cfg.sub_langs.clone());

    if let Some(name) = &cli.preset {
        let path = get_presets_path();
        let store = PresetStore::load(&path).await?;
        let name = if name.trim().is_empty() {
            let default_name = store.default_preset().map(|p| p.name.clone());
            match ui.select(&preset_menu(&store.items), "Select preset") {
                Some(picked) => {
                    if default_name.as_deref() != Some(picked.as_str()) {
                        PresetStore::update(&path, |s| s.mark_default(&picked)).await?;
                    }
                    picked
                }
                None => return Ok(None),
            }
        } else {
            name.clone()
        };
        let preset = store
            .find(&name)
            .ok_or_else(|| GrabError::InvalidArgument(format!("no preset named '{}'", name)))?;
        let request = base
            .output_template(output_template_in(out_dir, template))
            .extra_args(split_args(&preset.args));
        return Ok(Some(Plan {
            request,
            label: format!("preset {}", preset.name),
        }));
    }

    let mut multi = None;
    let format_expr = if let Some(expr) = &cli.format {
        if expr.trim().is_empty() {
            return Err(GrabError::InvalidArgument("format selector is empty".into()).into());
        }
        selector::custom(expr)
    } else if !cli.formats.is_empty() {
        let info = info.ok_or(GrabError::EmptyResult)?;
        let entries = cli
            .formats
            .iter()
            .map(|id| {
                info.find_format(id.trim())
                    .ok_or_else(|| GrabError::InvalidArgument(format!("unknown format id '{}'", id)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let (sel, m) = selection_for(&entries, cli.separate, cfg)?;
        multi = m;
        sel
    } else if cli.pick {
        let info = info.ok_or(GrabError::EmptyResult)?;
        let mut formats = info.formats.clone();
        sort_by_resolution(&mut formats);
        let filter = FormatFilter {
            kind: match cli.kind {
                Kind::Video => None,
                Kind::Audio => Some(KindFilter::Audio),
            },
            ext: (!cli.ext.eq_ignore_ascii_case(BEST)).then(|| cli.ext.clone()),
            ..FormatFilter::default()
        };
        let shown = filter.apply(&formats);
        let picked_ids = ui.select_many(&format_menu(&shown), "Select formats (space to mark)");
        if picked_ids.is_empty() {
            return Ok(None);
        }
        let entries: Vec<&FormatEntry> = shown
            .iter()
            .copied()
            .filter(|f| picked_ids.contains(&f.format_id))
            .collect();
        let (sel, m) = selection_for(&entries, cli.separate, cfg)?;
        multi = m;
        sel
    } else {
        selector::simple(&SimpleSelection {
            kind: match cli.kind {
                Kind::Video => MediaKind::Video,
                Kind::Audio => MediaKind::Audio,
            },
            ext: cli.ext.clone(),
            quality: cli.quality.clone(),
            audio_ext: cfg.audio_ext.clone(),
            auto_merge: cfg.auto_merge,
            custom: String::new(),
        })
    };

    let mut request = base.selector(format_expr.clone());
    if let Some(multi) = &multi {
        template = multi.output_template;
        request = request.multistreams(multi.video_multistreams, multi.audio_multistreams);
    }
    Ok(Some(Plan {
        request: request.output_template(output_template_in(out_dir, template)),
        label: format_expr,
    }))
}

fn print_info(info: &MediaInfo) {
    println!("{}", info.title.as_deref().unwrap_or("(untitled)").bold());
    if let Some(url) = &info.webpage_url {
        println!("{}", url.dimmed());
    }
    let mut formats = info.formats.clone();
    sort_by_resolution(&mut formats);
    println!();
    for f in &formats {
        println!("  {}", f.display_label());
    }
    println!();
    println!("{} {}", "Containers:".green(), distinct_extensions(&info.formats).join(", "));
    println!("{} {}", "Protocols:".green(), distinct_protocols(&info.formats).join(", "));
    println!("{} {}", "Resolutions:".green(), distinct_resolutions(&info.formats).join(", "));
    let langs = info.subtitle_languages();
    if !langs.is_empty() {
        println!();
        println!("{} {}", "Subtitles:".green(), langs.join(", "));
    }
}

/// Best effort: a missing preview never fails the run
async fn save_thumbnail(info: &MediaInfo, out_dir: &Path) {
    let Some(url) = info.thumbnail.as_deref() else {
        println!("{}", "No thumbnail available.".yellow());
        return;
    };
    match fetch_thumbnail(url).await {
        Ok(bytes) => {
            let stem = info.id.as_deref().unwrap_or("thumbnail");
            let path = out_dir.join(format!("{}.{}", stem, image_extension(&bytes)));
            match tokio::fs::write(&path, &bytes).await {
                Ok(()) => println!("{} {}", "Thumbnail:".green(), path.display()),
                Err(e) => tracing::warn!("could not save thumbnail: {}", e),
            }
        }
        Err(e) => tracing::warn!("thumbnail unavailable: {}", e),
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    if cli.url.trim().is_empty() {
        return Err(GrabError::InvalidArgument("URL is empty".into()).into());
    }

    let cfg = apply_overrides(config::load_config().await?, &cli);
    let tool = YtDlp::from_config(&cfg);
    let out_dir = config::download_dir(&cfg);
    let ui = Selector::new();

    if !cli.print_command {
        let version = tool.check_available().await?;
        tracing::debug!(%version, program = %tool.program().display(), "yt-dlp found");
    }
    if !supports_tree_kill() {
        tracing::warn!("cannot kill process trees here; cancel stops yt-dlp only");
    }

    let slot = OperationSlot::new();
    {
        let slot = slot.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !slot.cancel() {
                    std::process::exit(EXIT_CANCELLED);
                }
            }
        });
    }

    let info = if needs_metadata(&cli) {
        println!("{}", "Fetching formats...".dimmed());
        let guard = slot.begin(OperationKind::Metadata)?;
        match tool.fetch_metadata(&cli.url, cfg.ignore_config, &guard.token()).await {
            Ok(info) => Some(info),
            Err(GrabError::Cancelled) => return Ok(EXIT_CANCELLED),
            Err(GrabError::Tool { code, stderr }) => {
                eprintln!("{} yt-dlp exited with code {}", "Error:".red(), code);
                if !stderr.is_empty() {
                    eprintln!("{}", stderr.dimmed());
                }
                return Ok(code);
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        None
    };

    if cli.info {
        if let Some(info) = &info {
            print_info(info);
        }
        return Ok(0);
    }

    if !cli.print_command {
        tokio::fs::create_dir_all(&out_dir).await?;
    }
    if cli.thumbnail {
        if let Some(info) = &info {
            save_thumbnail(info, &out_dir).await;
        }
    }

    let Some(plan) = build_plan(&cli, &cfg, info.as_ref(), &ui, &out_dir).await? else {
        println!("{}", "Nothing selected.".yellow());
        return Ok(0);
    };

    if cli.print_command {
        println!("{}", tool.command_line(&download_args(&plan.request)));
        return Ok(0);
    }

    println!("{} {}", "Downloading:".dimmed(), plan.label);
    let guard = slot.begin(OperationKind::Download)?;
    let view = if std::io::stderr().is_terminal() {
        DownloadView::new(cli.verbose)
    } else {
        DownloadView::hidden()
    };
    let result = tool
        .download(&plan.request, |event| view.update(&event), &guard.token())
        .await;

    match result {
        Ok(report) if report.success() => {
            let message = match report.final_destination() {
                Some(dest) => format!("{} {}", "✓ Download complete:".green(), dest.display()),
                None => format!("{}", "✓ Download complete!".green()),
            };
            view.finish(&message);
            Ok(0)
        }
        Ok(report) => {
            view.abandon();
            eprintln!("{} yt-dlp exited with code {}", "Error:".red(), report.exit_code);
            Ok(report.exit_code)
        }
        Err(GrabError::Cancelled) => {
            view.abandon();
            println!("{}", "Cancelled; partial files removed.".yellow());
            Ok(EXIT_CANCELLED)
        }
        Err(e) => {
            view.abandon();
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let code = run(cli).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
