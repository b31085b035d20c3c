//! Answer credential requests from a terminal.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::credentials::CredentialPrompts;

/// Print a prompt for each request and answer it with one line of `reader`.
///
/// Returns when the handler closes its prompts, or with the IO error that
/// stopped it. End of input drops the pending request, which the handler sees
/// as closed input.
pub async fn run_prompts<R, W>(
    mut prompts: CredentialPrompts,
    mut reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(request) = prompts.next().await {
        let prompt = match request.hint() {
            Some(hint) => format!("Enter {} ({hint}): ", request.kind()),
            None => format!("Enter {}: ", request.kind()),
        };
        writer.write_all(prompt.as_bytes()).await?;
        writer.flush().await?;

        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            tracing::debug!(credential = %request.kind(), "input ended before an answer");
            return Ok(());
        }
        if !request.respond(line.trim()) {
            tracing::debug!("handler stopped waiting for input");
        }
    }
    Ok(())
}

/// [`run_prompts`] over stdin and stdout.
pub async fn run_terminal_prompts(prompts: CredentialPrompts) -> std::io::Result<()> {
    run_prompts(
        prompts,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}
