//! Operator prompts.

use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Print `prompt` and block until the operator presses Enter (or stdin closes).
pub async fn wait_for_enter(prompt: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    skip_line(&mut io::stdin()).await
}

/// Consume bytes up to and including the next newline.
///
/// Reads one byte at a time so nothing past the newline is taken from
/// `reader`; the next prompt sees the operator's following line intact.
async fn skip_line<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<()> {
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte).await? == 0 || byte[0] == b'\n' {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_leaves_following_lines_unread() {
        let mut input: &[u8] = b"first\nsecond\n";

        skip_line(&mut input).await.unwrap();
        assert_eq!(input, b"second\n");

        skip_line(&mut input).await.unwrap();
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn test_returns_at_end_of_input() {
        let mut input: &[u8] = b"no newline";
        skip_line(&mut input).await.unwrap();
        assert!(input.is_empty());

        skip_line(&mut input).await.unwrap();
    }
}
