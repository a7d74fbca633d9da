//! readalong - sentence anchors and media overlays for read-aloud ebooks

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use readalong::overlay::{self, SentenceRange};
use readalong::{
    Chapter, MemoryChapter, SentenceCache, SentenceRecord, TagOptions, TerminalPunctuation,
    tag_chapter,
};

#[derive(Parser)]
#[command(name = "readalong")]
#[command(version, about = "Sentence anchors and EPUB 3 media overlays", long_about = None)]
#[command(after_help = "EXAMPLES:
    readalong tag ch1.xhtml -o ch1.tagged.xhtml --sentences ch1.json
    readalong overlay --base book --chapter ch1.xhtml --audio ch1.mp3 ranges.json -o ch1.smil
    readalong inspect ch1.smil")]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wrap every sentence of an XHTML chapter in an anchored span
    Tag {
        /// Chapter to tag
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Where to write the tagged chapter (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Id of the first sentence span
        #[arg(long, default_value_t = 0)]
        start_id: u32,

        /// Text inserted between sentence spans
        #[arg(long, default_value = " ")]
        separator: String,

        /// Write the sentences as JSON (id, text) for an aligner
        #[arg(long, value_name = "FILE")]
        sentences: Option<PathBuf>,
    },

    /// Build a SMIL media overlay from sentence timings
    Overlay {
        /// Overlay base name, used for the seq id
        #[arg(long)]
        base: String,

        /// Chapter file name referenced by the overlay
        #[arg(long)]
        chapter: String,

        /// Audio file name referenced by the overlay
        #[arg(long)]
        audio: String,

        /// JSON array of {"id", "start", "end"} ranges in seconds
        #[arg(value_name = "RANGES")]
        ranges: PathBuf,

        /// Where to write the overlay (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tagged chapter to check the sentence anchors against
        #[arg(long, value_name = "CHAPTER")]
        check: Option<PathBuf>,
    },

    /// List the pars of a media overlay
    Inspect {
        #[arg(value_name = "OVERLAY")]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.quiet) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Tag {
            input,
            output,
            start_id,
            separator,
            sentences,
        } => tag(&input, output.as_deref(), start_id, separator, sentences.as_deref()),
        Command::Overlay {
            base,
            chapter,
            audio,
            ranges,
            output,
            check,
        } => build_overlay(&base, &chapter, &audio, &ranges, output.as_deref(), check.as_deref()),
        Command::Inspect { input } => inspect(&input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(quiet: bool) -> Result<(), String> {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .map_err(|e| format!("build log filter: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("initialize logging: {e}"))
}

fn tag(
    input: &Path,
    output: Option<&Path>,
    start_id: u32,
    separator: String,
    sentences: Option<&Path>,
) -> Result<(), String> {
    let mut chapter = MemoryChapter::open(input).map_err(|e| format!("{}: {e}", input.display()))?;
    let options = TagOptions::default()
        .with_start_id(start_id)
        .with_separator(separator);
    let mut cache = SentenceCache::new();

    let tagged = tag_chapter(&mut chapter, &TerminalPunctuation, &mut cache, &options)
        .map_err(|e| format!("{}: {e}", input.display()))?;

    write_output(output, chapter.content())?;

    if let Some(path) = sentences {
        let records: Vec<SentenceRecord> = tagged.sentences().collect();
        let json = serde_json::to_vec_pretty(&records).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| format!("{}: {e}", path.display()))?;
        info!("wrote {} sentences to {}", records.len(), path.display());
    }

    info!("{}: {} spans", chapter.file_name(), tagged.spans.len());
    match next_id_line(output, tagged.next_id) {
        Some(line) => println!("{line}"),
        None => info!("next id: {}", tagged.next_id),
    }
    Ok(())
}

/// The next free sentence id goes to stdout only when stdout is not
/// already carrying the tagged markup.
fn next_id_line(output: Option<&Path>, next_id: u32) -> Option<String> {
    output.map(|_| next_id.to_string())
}

fn build_overlay(
    base: &str,
    chapter: &str,
    audio: &str,
    ranges: &Path,
    output: Option<&Path>,
    check: Option<&Path>,
) -> Result<(), String> {
    let json = std::fs::read(ranges).map_err(|e| format!("{}: {e}", ranges.display()))?;
    let ranges: Vec<SentenceRange> =
        serde_json::from_slice(&json).map_err(|e| format!("{}: {e}", ranges.display()))?;

    if let Some(path) = check {
        let markup = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let missing = overlay::validate_anchors(&markup, &ranges);
        if !missing.is_empty() {
            tracing::warn!("{}: {} missing anchors", path.display(), missing.len());
        }
    }

    let smil = overlay::create_media_overlay(base, chapter, audio, &ranges)
        .map_err(|e| e.to_string())?;
    write_output(output, &smil)?;
    info!("{} pars for {chapter}", ranges.len());
    Ok(())
}

fn inspect(path: &Path) -> Result<(), String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let overlay = overlay::parse_media_overlay(&bytes).map_err(|e| e.to_string())?;

    println!("File: {}", path.display());
    if let Some(id) = &overlay.id {
        println!("Seq: {id}");
    }
    if let Some(text_ref) = &overlay.text_ref {
        println!("Text: {text_ref}");
    }
    println!("Pars: {}", overlay.pars.len());

    for par in &overlay.pars {
        let id = par.id.as_deref().unwrap_or("-");
        match &par.audio {
            Some(audio) => {
                let end = audio
                    .clip_end
                    .map(|e| format!("{e:.3}"))
                    .unwrap_or_else(|| "end".to_string());
                println!(
                    "  {id}\t{}\t{} [{:.3} - {end}]",
                    par.text_src, audio.src, audio.clip_begin
                );
            }
            None => println!("  {id}\t{}", par.text_src),
        }
    }

    Ok(())
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), String> {
    match path {
        Some(path) => std::fs::write(path, bytes).map_err(|e| format!("{}: {e}", path.display())),
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(bytes)
                .map_err(|e| e.to_string())
        }
    }
}
