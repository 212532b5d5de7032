//! Terminal chat: one session, stdin in, stdout out.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::session::{Concierge, ConversationSession, SessionError};

/// Input line that ends the session.
pub const QUIT_COMMAND: &str = "/quit";

/// Run an interactive chat until EOF or [`QUIT_COMMAND`].
///
/// Model failures are printed as `Error: ...` and the loop keeps going.
/// Blank lines are ignored.
///
/// # Errors
///
/// Returns an error only when reading input or writing output fails.
pub async fn run_chat<R, W>(
    concierge: &Concierge,
    mut session: ConversationSession,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let assistant = concierge.prompts().assistant_name().to_owned();
    let welcome = session.welcome().clone();
    output
        .write_all(
            format!(
                "{}\n{}\n({}, {} to leave)\n\n",
                welcome.heading, welcome.greeting, welcome.input_placeholder, QUIT_COMMAND
            )
            .as_bytes(),
        )
        .await?;
    output.flush().await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed == QUIT_COMMAND {
            break;
        }
        if trimmed.is_empty() {
            continue;
        }

        let rendered = match concierge.send_message(&mut session, &line).await {
            Ok(reply) => format!("{assistant}: {}\n\n", reply.text),
            Err(SessionError::EmptyMessage) => continue,
            Err(e) => format!("Error: {e}\n\n"),
        };
        output.write_all(rendered.as_bytes()).await?;
        output.flush().await?;
    }

    info!(
        session_id = %session.id(),
        turns = session.turns().len(),
        "terminal session ended"
    );
    Ok(())
}
