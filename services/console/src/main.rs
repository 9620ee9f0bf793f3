//! Terminal front end for the JARVIS assistant.
//!
//! Reads commands from stdin, routes them through the assistant against a
//! running API service, and prints the transcript. Commands typed while a
//! request is in flight interrupt it; `/resume` and `/dismiss` act on the
//! paused request.

mod speech;

use anyhow::Result;
use clap::Parser;
use jarvis_core::{
    assistant::{Assistant, AssistantEvent},
    backend::HttpBackend,
    controller::{Input, Status},
    dispatcher::Dispatcher,
    narrator::{Narrator, SpeechSynthesizer},
    transcript::{Message, Role},
    wire::UserLocation,
};
use speech::{CommandSpeech, SilentSpeech};
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "jarvis", version, about = "Talk to JARVIS from the terminal", long_about = None)]
struct Args {
    /// Base URL of the API service.
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Program used to read replies aloud, e.g. `say` or `espeak -v en-gb`.
    #[arg(long)]
    tts_command: Option<String>,

    /// Latitude used for "weather outside" questions.
    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Longitude used for "weather outside" questions.
    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// City name reported with the coordinates.
    #[arg(long)]
    city: Option<String>,
}

impl Args {
    fn location(&self) -> Option<UserLocation> {
        Some(UserLocation {
            latitude: self.latitude?,
            longitude: self.longitude?,
            city: self.city.clone(),
            country: None,
        })
    }
}

/// What a line typed at the prompt asks for.
#[derive(Debug)]
enum Line {
    Empty,
    Quit,
    Input(Input),
}

fn parse_line(line: &str) -> Line {
    match line.trim() {
        "" => Line::Empty,
        "/quit" | "/exit" => Line::Quit,
        "/resume" => Line::Input(Input::Resume),
        "/dismiss" => Line::Input(Input::DismissPaused),
        text => Line::Input(Input::Submit(text.to_string())),
    }
}

fn render_message(message: &Message) -> String {
    let speaker = match message.role {
        Role::User => "You",
        Role::Assistant => "JARVIS",
    };
    let mut rendered = format!("{}: {}", speaker, message.text);
    if let Some(download) = &message.attachments.download {
        rendered.push_str(&format!("\n  [download] {} ({})", download.file_name, download.url));
    }
    for source in &message.attachments.sources {
        rendered.push_str(&format!("\n  [source] {} - {}", source.title, source.url));
    }
    rendered
}

fn render_status(status: &Status) -> Option<String> {
    let paused = status.paused.as_ref()?;
    Some(format!(
        "  [paused] \"{}\" (type /resume or /dismiss)",
        paused.command
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the conversation; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let synth: Arc<dyn SpeechSynthesizer> =
        match args.tts_command.as_deref().and_then(CommandSpeech::parse) {
            Some(speech) => Arc::new(speech),
            None => Arc::new(SilentSpeech),
        };

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(HttpBackend::new(
        args.server.clone(),
    ))));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut assistant = Assistant::new(dispatcher, Narrator::new(synth), events_tx);
    assistant.set_location(args.location());

    info!(server = %args.server, "JARVIS console ready");
    println!("Good day, Sir. JARVIS at your service. Type /quit to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = ?e, "Failed to read from stdin");
                        break;
                    }
                };
                match parse_line(&line) {
                    Line::Empty => {}
                    Line::Quit => break,
                    Line::Input(input) => assistant.handle(input).await,
                }
            },
            input = assistant.next_completion() => assistant.handle(input).await,
            Some(event) = events_rx.recv() => match event {
                AssistantEvent::Message(message) => println!("{}", render_message(&message)),
                AssistantEvent::Status(status) => {
                    if let Some(line) = render_status(&status) {
                        println!("{}", line);
                    }
                }
            },
        }
    }

    info!(messages = assistant.transcript().len(), "Goodbye");
    Ok(())
}
