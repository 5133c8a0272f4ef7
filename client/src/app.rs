//! The interactive chat loop.

use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::Arc;

use chat_core::message::NullView;
use chat_core::status::{check_status, watch_status};
use chat_core::{
    ChatClient, ChatSession, ImageAttachment, MessageRecord, MessageView, RejectReason,
    SendOutcome, ServerStatus,
};
use speech_core::{ChannelSource, RemoteTts, Speaker, VoiceInput};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::{self, Command, HELP};
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::terminal::TerminalView;
use crate::transcript::TranscriptView;
use crate::validation::{validate_base_url, validate_language_code, validate_message};

/// Renders into several views at once.
struct Fanout<'a>(Vec<&'a mut dyn MessageView>);

impl MessageView for Fanout<'_> {
    fn render(&mut self, message: &MessageRecord) {
        for view in self.0.iter_mut() {
            view.render(message);
        }
    }
}

pub struct App<W = io::Stdout> {
    config: ClientConfig,
    session: ChatSession,
    speaker: Speaker,
    voice_input: VoiceInput<ChannelSource>,
    terminal: TerminalView<W>,
    transcript: Option<TranscriptView>,
}

impl App<io::Stdout> {
    /// Run against the process's stdin and stdout.
    pub async fn run_stdin(self) -> anyhow::Result<()> {
        let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
        self.run(lines).await
    }
}

impl<W: Write + Send> App<W> {
    pub fn new(config: ClientConfig, out: W) -> Result<Self, AppError> {
        validate_base_url(&config.api_url)?;
        let client = ChatClient::with_connect_timeout(&config.api_url, config.connect_timeout())?;
        let session = ChatSession::new(client);
        info!("Session {} against {}", session.id(), config.api_url);

        let speaker = match &config.tts_url {
            Some(url) => {
                validate_base_url(url)?;
                let mut engine = RemoteTts::new(url, &config.speech_output_dir);
                let language = config.tts_language.clone();
                if let Some(language) = &language {
                    validate_language_code(language)?;
                    engine = engine.with_default_language(language.clone());
                }
                let speaker = Speaker::new(Arc::new(engine));
                match language {
                    Some(language) => speaker.with_language(language),
                    None => speaker,
                }
            }
            None => {
                debug!("No TTS_URL configured, voice output disabled");
                Speaker::unsupported()
            }
        };

        let transcript = config
            .transcript_path
            .as_ref()
            .map(TranscriptView::create)
            .transpose()?;

        let mut app = Self {
            config,
            session,
            speaker,
            voice_input: VoiceInput::unsupported(),
            terminal: TerminalView::new(out),
            transcript,
        };
        if app.config.voice_output {
            if let Err(e) = app.set_voice(true) {
                warn!("{}", e.notice());
            }
        }
        Ok(app)
    }

    /// Use a recognizer fed by the host for `/listen`.
    pub fn with_voice_input(mut self, input: VoiceInput<ChannelSource>) -> Self {
        self.voice_input = input;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Read commands from `lines` until `/quit` or end of input.
    pub async fn run<S>(mut self, mut lines: S) -> anyhow::Result<()>
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        let status = check_status(self.session.client()).await;
        self.terminal.notice(&format!(
            "{}. Type /help for commands.",
            status.describe()
        ));
        let watcher = spawn_status_watch(self.session.client().clone(), self.config.clone(), status);

        loop {
            self.terminal.prompt();
            let Some(line) = lines.next().await else {
                break;
            };
            let command = match commands::parse(&line?) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(msg) => {
                    self.terminal.notice(&msg);
                    continue;
                }
            };
            match self.handle(command, &mut lines).await {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => break,
                Err(e) => self.terminal.notice(&e.notice()),
            }
        }

        watcher.abort();
        self.speaker.cancel();
        info!("Chat session {} ended", self.session.id());
        Ok(())
    }

    async fn handle<S>(&mut self, command: Command, lines: &mut S) -> Result<ControlFlow<()>, AppError>
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        match command {
            Command::Send(text) => return self.send(text, lines).await,
            Command::AttachImage(path) => {
                let image = ImageAttachment::from_path(&path).await?;
                self.terminal.notice(&format!(
                    "Attached {} ({:.1} KB)",
                    image.file_name,
                    image.len() as f64 / 1024.0
                ));
                self.session.attach_image(image);
            }
            Command::RemoveImage => match self.session.remove_image() {
                Some(image) => self.terminal.notice(&format!("Removed {}", image.file_name)),
                None => self.terminal.notice("No image attached"),
            },
            Command::ToggleVoice => {
                let enabled = !self.session.voice_output();
                self.set_voice(enabled)?;
                self.terminal
                    .notice(if enabled { "Voice output on" } else { "Voice output off" });
            }
            Command::Listen => return self.listen(lines).await,
            Command::Stop => {
                // Replies finish before the next prompt, so nothing is running here.
                self.terminal.notice("Nothing to stop");
            }
            Command::Status => {
                let status = check_status(self.session.client()).await;
                self.terminal.notice(status.describe());
            }
            Command::Clear => {
                self.speaker.cancel();
                self.session.clear().await;
                self.terminal.notice("Chat cleared");
            }
            Command::Help => self.terminal.notice(HELP),
            Command::Quit => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    fn set_voice(&mut self, enabled: bool) -> Result<(), AppError> {
        self.speaker.set_enabled(enabled)?;
        self.session.set_voice_output(enabled);
        Ok(())
    }

    /// Stream one reply. Input typed meanwhile is only checked for `/stop`
    /// and `/quit`; anything else is rejected by the session.
    async fn send<S>(&mut self, text: String, lines: &mut S) -> Result<ControlFlow<()>, AppError>
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        validate_message(&text)?;

        let Self {
            session,
            speaker,
            terminal,
            transcript,
            ..
        } = self;

        let (outcome, quit, ignored) = {
            let mut views: Vec<&mut dyn MessageView> = vec![&mut *terminal];
            if let Some(transcript) = transcript.as_mut() {
                views.push(transcript);
            }
            let mut fanout = Fanout(views);

            let send = session.send(&text, &mut fanout);
            tokio::pin!(send);

            let mut input_open = true;
            let mut quit = false;
            let mut ignored = 0usize;
            let outcome = loop {
                tokio::select! {
                    outcome = &mut send => break outcome,
                    line = lines.next(), if input_open => match line {
                        Some(Ok(line)) => match commands::parse(&line) {
                            Ok(Some(Command::Stop)) => {
                                session.cancel_in_flight();
                            }
                            Ok(Some(Command::Quit)) => {
                                quit = true;
                                session.cancel_in_flight();
                            }
                            Ok(Some(Command::Send(extra))) => {
                                let rejected = session.send(&extra, &mut NullView).await;
                                debug!("Send while generating: {rejected:?}");
                                ignored += 1;
                            }
                            Ok(None) => {}
                            Ok(Some(_)) | Err(_) => ignored += 1,
                        },
                        Some(Err(e)) => {
                            warn!("Failed to read input: {e}");
                            input_open = false;
                        }
                        None => input_open = false,
                    },
                }
            };
            (outcome, quit, ignored)
        };

        if ignored > 0 {
            terminal.notice(&format!(
                "Ignored {ignored} line(s) typed while the reply was generating"
            ));
        }

        match &outcome {
            SendOutcome::Rejected(RejectReason::InFlight) => {
                terminal.notice("A reply is still being generated");
            }
            SendOutcome::Rejected(RejectReason::EmptyMessage) => {}
            SendOutcome::Finished(finished) => {
                debug!("Reply finished: {finished:?}");
                if let Some(reply) = outcome.completed_text() {
                    if session.voice_output() {
                        speaker.speak(reply).await;
                    }
                }
            }
        }

        Ok(if quit {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        })
    }

    /// Dictate a message; any input line stops listening.
    async fn listen<S>(&mut self, lines: &mut S) -> Result<ControlFlow<()>, AppError>
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        let token = CancellationToken::new();
        let mut text = String::new();
        {
            let updates = self.voice_input.listen(token.clone())?;
            tokio::pin!(updates);
            self.terminal.notice("Listening... press Enter to stop");
            loop {
                tokio::select! {
                    update = updates.next() => match update {
                        Some(update) => {
                            text.push_str(&update.final_text);
                            if !update.interim.is_empty() {
                                debug!("Interim transcript: {}", update.interim);
                            }
                        }
                        None => break,
                    },
                    _ = lines.next(), if !token.is_cancelled() => token.cancel(),
                }
            }
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            self.terminal.notice("Nothing was recognized");
            return Ok(ControlFlow::Continue(()));
        }
        self.terminal.notice(&format!("You said: {text}"));
        self.send(text, lines).await
    }
}

fn spawn_status_watch(client: ChatClient, config: ClientConfig, initial: ServerStatus) -> JoinHandle<()> {
    tokio::spawn(async move {
        let updates = watch_status(client, config.status_interval());
        tokio::pin!(updates);
        let mut last = initial;
        while let Some(status) = updates.next().await {
            if status == last {
                continue;
            }
            match status {
                ServerStatus::Connected { .. } => info!("{}", status.describe()),
                _ => warn!("{}", status.describe()),
            }
            last = status;
        }
    })
}
