//! Command-line front end.
//!
//!  ❯ flowtts --voice M1 --text "Hello from Rust!"
//!  ❯ flowtts --model-dir assets/onnx --voice assets/voice_styles/F1.json \
//!        --text "First voice." --voice assets/voice_styles/M1.json --text "Second voice." --batch

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowtts::{download, load_voice_styles, Acceleration, SynthesisOptions, Synthesizer};

/// CLI switches.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Local directory holding `tts.json`, `unicode_indexer.json` and the ONNX models.
    #[arg(long, conflicts_with = "repo")]
    model_dir: Option<PathBuf>,

    /// HuggingFace repository to download the models from.
    #[arg(long, default_value = download::DEFAULT_REPO)]
    repo: String,

    /// Voice style: a JSON path, or a name fetched from the repository. Repeatable.
    #[arg(long = "voice", default_value = "M1")]
    voices: Vec<String>,

    /// Text to speak. Repeatable; one output file per text.
    #[arg(long = "text", required = true)]
    texts: Vec<String>,

    /// Denoising steps.
    #[arg(long, default_value_t = 5)]
    steps: usize,

    /// Speech rate (higher is faster).
    #[arg(long, default_value_t = 1.05)]
    speed: f32,

    /// Seconds of silence between chunks.
    #[arg(long, default_value_t = 0.3)]
    silence: f32,

    /// Maximum characters per chunk.
    #[arg(long, default_value_t = 300)]
    max_chunk_len: usize,

    /// Noise seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Synthesize all texts in one batch (one voice per text, no chunking).
    #[arg(long)]
    batch: bool,

    /// Directory the WAV files are written to.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
}

impl Args {
    fn options(&self) -> SynthesisOptions {
        let options = SynthesisOptions::default()
            .with_steps(self.steps)
            .with_speed(self.speed)
            .with_silence(self.silence)
            .with_max_chunk_len(self.max_chunk_len);
        match self.seed {
            Some(seed) => options.with_seed(seed),
            None => options,
        }
    }

    /// Local path for every `--voice`, downloading names that are not files.
    fn voice_paths(&self) -> Result<Vec<PathBuf>> {
        self.voices
            .iter()
            .map(|v| {
                let path = Path::new(v);
                if path.is_file() {
                    Ok(path.to_path_buf())
                } else {
                    download::fetch_voice(&self.repo, v)
                        .with_context(|| format!("Voice '{v}' is neither a file nor in {}", self.repo))
                }
            })
            .collect()
    }
}

fn output_name(index: usize, voice: &Path) -> String {
    let stem = voice.file_stem().and_then(|s| s.to_str()).unwrap_or("voice");
    format!("{index:02}_{stem}.wav")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let model_dir = match &args.model_dir {
        Some(dir) => dir.clone(),
        None => download::fetch_model_dir(&args.repo)?,
    };
    let voices = args.voice_paths()?;
    let options = args.options();

    let tts = Synthesizer::load(&model_dir, Acceleration::Cpu)?;
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Cannot create {}", args.output_dir.display()))?;

    if args.batch {
        if voices.len() != args.texts.len() {
            bail!("--batch needs one --voice per --text ({} voices, {} texts)", voices.len(), args.texts.len());
        }
        let results = tts.synthesize_batch(&args.texts, &voices, &options)?;
        for (i, (audio, voice)) in results.iter().zip(&voices).enumerate() {
            audio.write_wav(&args.output_dir.join(output_name(i, voice)))?;
        }
    } else {
        for (i, text) in args.texts.iter().enumerate() {
            // A single --voice is shared by every text.
            let voice = &voices[i.min(voices.len() - 1)];
            let style = load_voice_styles(std::slice::from_ref(voice))?;
            let audio = tts.synthesize(text, &style, &options)?;
            audio.write_wav(&args.output_dir.join(output_name(i, voice)))?;
        }
    }

    info!(files = args.texts.len(), dir = %args.output_dir.display(), "done");
    Ok(())
}
