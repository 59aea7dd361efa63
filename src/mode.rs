use std::str::FromStr;

use strum::{Display, EnumString};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

/// How candidate passwords are generated for the lifetime of a run.
#[derive(EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum Mode {
    /// Strong random passwords.
    #[strum(to_string = "random", serialize = "1")]
    Random,
    /// A dictionary word followed by a four digit number.
    #[strum(to_string = "real", serialize = "dictionary", serialize = "2")]
    Real,
    /// A name followed by a four digit number.
    #[strum(to_string = "names", serialize = "3")]
    Names,
}

impl Mode {
    /// Parses a user's selection, defaulting to [`Mode::Random`] if it isn't recognised.
    pub fn from_selection(selection: &str) -> Self {
        let selection = selection.trim();

        if let Ok(mode) = Self::from_str(selection) {
            mode
        } else {
            warn!(selection, "Invalid option, defaulting to random mode");
            Self::Random
        }
    }
}

const MENU: &str = "Choose password generation mode:
1 - random (strong random passwords)
2 - real (passwords based on dictionary words)
3 - names (passwords based on names)
Enter 1, 2, or 3: ";

/// Presents the mode menu on `output` and reads the selection from a single line of `input`.
pub async fn prompt<R, W>(mut input: R, mut output: W) -> std::io::Result<Mode>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(MENU.as_bytes()).await?;
    output.flush().await?;

    let mut line = String::new();
    input.read_line(&mut line).await?;

    let mode = Mode::from_selection(&line);
    info!(%mode, "Mode selected");

    Ok(mode)
}
