//! Download the default model, synthesise a two-paragraph text and write it
//! to a WAV file.
//!
//!   cargo run --example basic -- --voice F1 --seed 7 --silence 0.5
//!
//! The first run needs network access; the hub cache serves later runs.

use std::path::PathBuf;

use anyhow::Context;
use flowtts::{download, load_voice_styles, SynthesisOptions};

const DEFAULT_TEXT: &str = "This model runs on a plain CPU in a few denoising steps.\n\n\
                            A blank line starts a new paragraph, and each paragraph is spoken after a short pause.";

struct Args {
    repo: String,
    voice: String,
    text: String,
    output: PathBuf,
    options: SynthesisOptions,
}

/// `--name value` pairs; unknown flags are an error.
fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        repo: download::DEFAULT_REPO.to_string(),
        voice: "M1".to_string(),
        text: DEFAULT_TEXT.to_string(),
        output: PathBuf::from("output.wav"),
        options: SynthesisOptions::default(),
    };

    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().with_context(|| format!("{flag} needs a value"));
        match flag.as_str() {
            "--repo" => args.repo = value()?,
            "--voice" => args.voice = value()?,
            "--text" => args.text = value()?,
            "--output" => args.output = value()?.into(),
            "--speed" => args.options = args.options.with_speed(value()?.parse()?),
            "--steps" => args.options = args.options.with_steps(value()?.parse()?),
            "--silence" => args.options = args.options.with_silence(value()?.parse()?),
            "--seed" => args.options = args.options.with_seed(value()?.parse()?),
            other => anyhow::bail!(
                "unknown flag {other}; expected --repo --voice --text --output --speed --steps --silence --seed"
            ),
        }
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let tts = download::load_from_hub(&args.repo)?;
    let style = load_voice_styles(&[download::fetch_voice(&args.repo, &args.voice)?])?;

    let audio = tts.synthesize(&args.text, &style, &args.options)?;
    audio.write_wav(&args.output)?;

    println!(
        "{}: {:.2} s at {} Hz (voice {}, {} steps, seed {:?})",
        args.output.display(),
        audio.duration,
        audio.sample_rate,
        args.voice,
        args.options.steps,
        args.options.seed,
    );
    Ok(())
}
