//! Terminal front end: a read-eval-print loop over one conversation

use crate::chat::{ChatEngine, ChatHistory};
use crate::error::Result;
use crate::turn::{with_instruction, Turn, CLI_INSTRUCTION, FAREWELL, GREETING};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

pub const PROMPT: &str = "Enter your question: ";

/// Run the loop until the sentinel or end of input
///
/// Engine errors end the loop and propagate to the caller.
pub async fn run_repl<R, W>(engine: &dyn ChatEngine, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut history = ChatHistory::new();
    let mut lines = input.lines();

    output.write_all(format!("{}\n", GREETING).as_bytes()).await?;

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            debug!("End of input, leaving chat");
            output.write_all(b"\n").await?;
            break;
        };

        match Turn::classify(&line) {
            Turn::End => {
                output.write_all(format!("{}\n", FAREWELL).as_bytes()).await?;
                history.clear();
                break;
            }
            Turn::Ask(query) => {
                let message = with_instruction(&query, CLI_INSTRUCTION);
                let reply = engine.chat(&mut history, &message).await?;
                output
                    .write_all(format!("{}\n\n", reply.response).as_bytes())
                    .await?;
            }
        }
    }

    output.flush().await?;
    Ok(())
}
