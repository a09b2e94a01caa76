//! Interactive terminal chat.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::chat_stream::HttpChatGateway;
use crate::core::config::Config;
use crate::core::gateway::{ChatGateway, GatewayError, GenerationParams};
use crate::core::persona::PersonaStore;
use crate::core::session::{Session, TurnError};
use crate::core::transcript::{SaveError, TranscriptWriter};

const PROMPT: &str = "You: ";
const ASSISTANT_LABEL: &str = "Goblin";

/// What the user picked on the command line, after config defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub personas: Vec<String>,
    pub params: GenerationParams,
}

/// How the read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The user typed `exit` or `quit`.
    Quit,
    /// Standard input was closed.
    EndOfInput,
    /// Ctrl-C arrived while waiting for input or for a reply.
    Interrupted,
}

fn is_exit_command(text: &str) -> bool {
    text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit")
}

pub async fn run_chat(config: &Config, options: ChatOptions) -> Result<(), Box<dyn Error>> {
    let gateway = HttpChatGateway::new(
        config.base_url(),
        config.api_key_env(),
        config.stream(),
        config.request_timeout(),
    )?;
    let store = PersonaStore::new(config.personas_dir());
    let writer = TranscriptWriter::new(config.log_dir(), store.root());

    let mut session = Session::start(options.model, options.personas, &store)?
        .with_window(Some(config.max_turns()));

    let interrupt = CancellationToken::new();
    let watcher = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            watcher.cancel();
        }
    });

    let mut stdout = io::stdout();
    let outcome = chat_loop(
        &mut session,
        &gateway,
        options.params,
        BufReader::new(tokio::io::stdin()),
        &mut stdout,
        &interrupt,
    )
    .await;

    let mut session = session.end();
    save_on_exit(&writer, &mut session, &mut stdout)?;

    let exit = outcome?;
    debug!(?exit, "chat finished");
    Ok(())
}

/// Read lines and run one turn per non-blank line until the user leaves.
///
/// Turn errors are printed and the loop continues; the failed message is
/// already rolled back by the session.
pub async fn chat_loop<R, W>(
    session: &mut Session,
    gateway: &dyn ChatGateway,
    params: GenerationParams,
    mut input: R,
    out: &mut W,
    interrupt: &CancellationToken,
) -> io::Result<LoopExit>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut raw = Vec::new();
    writeln!(out, "Goblin chat ready. Type 'exit' to quit.\n")?;

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        raw.clear();
        let read = tokio::select! {
            biased;
            _ = interrupt.cancelled() => {
                writeln!(out, "\n[Info] Session interrupted.")?;
                return Ok(LoopExit::Interrupted);
            }
            read = input.read_until(b'\n', &mut raw) => read?,
        };

        if read == 0 {
            writeln!(out, "\n[Info] Session interrupted.")?;
            return Ok(LoopExit::EndOfInput);
        }

        // bytes are read raw so one undecodable line cannot end the session
        let Ok(line) = std::str::from_utf8(&raw) else {
            warn!(bytes = raw.len(), "ignoring input line that is not valid UTF-8");
            writeln!(out, "[Error] Input is not valid UTF-8; line ignored.\n")?;
            continue;
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if is_exit_command(text) {
            writeln!(out, "Bye.")?;
            return Ok(LoopExit::Quit);
        }

        match session.submit_turn(gateway, params, text, interrupt).await {
            Ok(reply) => writeln!(out, "{ASSISTANT_LABEL}: {reply}\n")?,
            Err(TurnError::TurnFailed(GatewayError::Cancelled)) => {
                writeln!(out, "\n[Info] Session interrupted.")?;
                return Ok(LoopExit::Interrupted);
            }
            Err(e) => {
                warn!(error = %e, "turn failed");
                writeln!(out, "[Error] {e}\n")?;
            }
        }
    }
}

/// Save the transcript of an ended session and report the outcome.
pub fn save_on_exit<W: Write>(
    writer: &TranscriptWriter,
    session: &mut Session,
    out: &mut W,
) -> io::Result<Option<PathBuf>> {
    match writer.save(session) {
        Ok(path) => {
            writeln!(out, "[Saved] Dialogue saved to: {}", path.display())?;
            Ok(Some(path))
        }
        Err(SaveError::NothingToSave) => {
            writeln!(out, "[Info] No dialogue to save.")?;
            Ok(None)
        }
        Err(SaveError::AlreadySaved) => Ok(None),
        Err(e) => {
            writeln!(out, "[Save Error] {e}")?;
            Ok(None)
        }
    }
}
