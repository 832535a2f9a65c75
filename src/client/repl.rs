//! Read-prompt-send-print loop.

use crate::context::ChatContext;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

const PROMPT: &str = "> ";

const HELP: &str = "Commands:
  /login   log in again with the configured credentials
  /logout  forget the current session
  /help    show this help
  /quit    exit (also /exit or Ctrl+D)
Anything else is sent to the model.
";

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Login,
    Logout,
    Help,
    Quit,
    Prompt(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Input::Empty,
            "/login" => Input::Login,
            "/logout" => Input::Logout,
            "/help" => Input::Help,
            "/quit" | "/exit" => Input::Quit,
            prompt => Input::Prompt(prompt),
        }
    }
}

/// Run the loop until `/quit` or end of input, then end the context.
/// Errors from individual turns are printed and the loop continues. The
/// context is ended even when reading input or writing output fails.
pub async fn run_repl<R, W>(ctx: &mut ChatContext, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = repl_loop(ctx, input, output).await;
    ctx.end();
    result
}

async fn repl_loop<R, W>(ctx: &mut ChatContext, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };

        let reply: Vec<u8> = match Input::parse(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => HELP.as_bytes().to_vec(),
            Input::Logout => match ctx.logout() {
                Ok(()) => b"Logged out.\n".to_vec(),
                Err(e) => format!("Error: {}\n", e).into_bytes(),
            },
            Input::Login => match ctx.login().await {
                Ok(()) => b"Logged in.\n".to_vec(),
                Err(e) => format!("Error: {}\n", e).into_bytes(),
            },
            Input::Prompt(prompt) => {
                debug!("Prompt: {} bytes", prompt.len());
                match ctx.send(prompt).await {
                    Ok(response) => {
                        debug!("Response {}: {}", response.status(), response.body_text());
                        let mut out = response.body().to_vec();
                        out.push(b'\n');
                        out
                    }
                    Err(e) => format!("Error: {}\n", e).into_bytes(),
                }
            }
        };

        output.write_all(&reply).await?;
        output.flush().await?;
    }

    Ok(())
}
