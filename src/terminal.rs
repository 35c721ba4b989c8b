use std::io::Write;

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use crate::playback::{PlaybackStatus, Presenter};

/// Splits `word` around its middle character, the reader's fixation point.
/// Words of one character or less have no pivot.
pub fn pivot_split(word: &str) -> Option<(&str, &str, &str)> {
    let count = word.chars().count();
    if count <= 1 {
        return None;
    }

    let mut indices = word.char_indices().skip(count / 2);
    let (start, _) = indices.next()?;
    let end = indices.next().map(|(idx, _)| idx).unwrap_or(word.len());
    Some((&word[..start], &word[start..end], &word[end..]))
}

/// Draws each word on a single rewritten terminal line.
pub struct TerminalPresenter<W: Write> {
    out: W,
    word: String,
    percent: u8,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            word: String::new(),
            percent: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn redraw(&mut self) {
        // Terminal write failures only cost a frame.
        let _ = self.draw_frame();
    }

    fn draw_frame(&mut self) -> std::io::Result<()> {
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(format!("{:>3}%  ", self.percent))
        )?;
        match pivot_split(&self.word) {
            Some((head, pivot, tail)) => queue!(
                self.out,
                Print(head),
                SetForegroundColor(Color::Red),
                Print(pivot),
                ResetColor,
                Print(tail)
            )?,
            None => queue!(self.out, Print(&self.word))?,
        }
        self.out.flush()
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn on_word(&mut self, _index: usize, token: &str) {
        self.word.clear();
        self.word.push_str(token);
        self.redraw();
    }

    fn on_progress(&mut self, percent: u8) {
        self.percent = percent;
        self.redraw();
    }

    fn on_finished(&mut self, status: PlaybackStatus, next_index: usize) {
        let label = match status {
            PlaybackStatus::Completed => "finished",
            _ => "stopped",
        };
        let _ = writeln!(self.out, "\n{label} before word {next_index}");
        let _ = self.out.flush();
    }
}
