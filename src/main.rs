use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use linguify::shell::Shell;
use linguify::voice::{
    AudioCapture, AudioPlayback, SAMPLE_RATE, Speaker, SpeechToText, StopSignal, calculate_energy,
    samples_to_wav,
};
use linguify::{Config, Language, Translator, is_translation_error, spawn_blocking_background};

/// Linguify - practice pronunciation and translation from the terminal
#[derive(Parser)]
#[command(name = "linguify", version, about)]
struct Cli {
    /// Language to practice (name or `DeepL` code, e.g. "French" or "FR")
    #[arg(short, long, global = true)]
    language: Option<Language>,

    /// Config file to read and write instead of the standard location
    #[arg(short, long, global = true, env = "LINGUIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Translate text into the practice language
    Translate {
        /// Text to translate
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Speak text in the practice language
    Say {
        /// Text to speak
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List the built-in practice phrases
    Phrases,
    /// Capture one phrase from the microphone
    TestMic {
        /// Also transcribe the phrase with Whisper (needs an `OpenAI` key)
        #[arg(short, long)]
        transcribe: bool,
    },
    /// Test speaker output and speech synthesis
    TestSpeaker,
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,linguify=info",
        1 => "info,linguify=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Command::Setup) = cli.command {
        return linguify::setup::run_setup(cli.config.as_deref());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(Some(path.as_path()))?,
        None => Config::load()?,
    };
    if let Some(language) = cli.language {
        config.language = language;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Translate { text }) => translate(&config, &text.join(" ")).await,
        Some(Command::Say { text }) => say(&config, &text.join(" ")).await,
        Some(Command::Phrases) => {
            phrases(config.language);
            Ok(())
        }
        Some(Command::TestMic { transcribe }) => test_mic(&config, transcribe).await,
        Some(Command::TestSpeaker) => test_speaker(&config).await,
        Some(Command::Setup) => Ok(()),
        None => {
            tracing::info!(language = %config.language, "starting linguify");
            Shell::from_config(config)?.run().await
        }
    }
}

/// Translate text and print the result
async fn translate(config: &Config, text: &str) -> anyhow::Result<()> {
    let translator = Translator::from_config(config)?;
    let translation = translator.translate(text, config.language).await;

    if is_translation_error(&translation) {
        anyhow::bail!("{translation}");
    }

    println!("{translation}");
    Ok(())
}

/// Speak text through the configured TTS provider
async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    let speaker = Speaker::from_config(config)?;
    println!("Speaking {} text: \"{text}\"", config.language);

    let report = speaker.speak(text, config.language).await;
    // Let deferred artifact deletion finish before the runtime exits
    speaker.finish_cleanup().await;
    println!("{report}");

    if report.was_heard() {
        Ok(())
    } else {
        anyhow::bail!("speech did not play")
    }
}

/// Print the built-in phrases for a language
fn phrases(language: Language) {
    println!("{language} practice phrases:");
    for (i, phrase) in language.phrases().iter().enumerate() {
        println!("  {}. {phrase}", i + 1);
    }
}

/// Capture one phrase the way practice does and report what was heard
#[allow(clippy::cast_precision_loss)]
async fn test_mic(config: &Config, transcribe: bool) -> anyhow::Result<()> {
    let language = config.language;
    if let Some(phrase) = language.phrases().first() {
        println!("Say a {language} phrase, for example: {phrase}");
    }
    println!(
        "Listening for up to {}s...",
        config.voice.listen_timeout.as_secs()
    );

    let voice = config.voice.clone();
    let captured = spawn_blocking_background("test-mic", move || {
        let mut capture = AudioCapture::new()?;
        capture.listen(&voice)
    })
    .wait()
    .await??;

    let Some(samples) = captured else {
        println!("No speech detected before the listen timeout.");
        println!("Run with -vv to see the calibrated noise threshold.");
        return Ok(());
    };

    let seconds = samples.len() as f32 / SAMPLE_RATE as f32;
    println!(
        "Captured {seconds:.1}s of speech (RMS {:.4})",
        calculate_energy(&samples)
    );

    if transcribe {
        let stt = SpeechToText::new_whisper(
            config.api_keys.clone().openai,
            config.voice.stt_model.clone(),
            config,
        )?;
        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        let text = stt.transcribe(&wav, Some(language)).await?;
        println!("Heard: {text}");
    }

    Ok(())
}

/// Check the output device with a tone, then the full speech path
async fn test_speaker(config: &Config) -> anyhow::Result<()> {
    let sample_rate = 24_000_u32;
    let frequency = 440.0_f32;

    #[allow(clippy::cast_precision_loss)]
    let tone: Vec<f32> = (0..sample_rate)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing a one second {frequency} Hz tone...");
    let ceiling = config.voice.playback_ceiling;
    let end = spawn_blocking_background("test-tone", move || {
        AudioPlayback::new().play_samples(&tone, sample_rate, ceiling, &StopSignal::new())
    })
    .wait()
    .await??;
    tracing::debug!(?end, "test tone done");

    let language = config.language;
    let Some(phrase) = language.phrases().first() else {
        return Ok(());
    };
    println!("Speaking a {language} phrase: {phrase}");

    let speaker = Speaker::from_config(config)?;
    let report = speaker.speak(phrase, language).await;
    speaker.finish_cleanup().await;
    println!("{report}");

    if !report.was_heard() {
        println!("The tone played but speech did not; check the TTS provider with `linguify -vv say`.");
    }
    Ok(())
}
