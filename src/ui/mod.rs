use crate::app::grid::{render_grid, render_output};
use crate::app::{AppController, Phase, SnippetLog, SnippetSource, UiEvent, View, ViewState};
use anyhow::{Context, Result};
use dialoguer::{Input, Select, theme::ColorfulTheme};
use std::io::Write;

const DEFAULT_WIDTH: usize = 100;

/// Menu entries of the terminal window, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    Generate,
    ViewHistory,
    Quit,
}

impl WindowAction {
    pub const ALL: [Self; 3] = [Self::Generate, Self::ViewHistory, Self::Quit];

    pub fn label(self) -> &'static str {
        match self {
            Self::Generate => "Generate Code Snippet",
            Self::ViewHistory => "View Stored Snippets",
            Self::Quit => "Quit",
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(Self::Quit)
    }
}

pub struct TerminalView<W> {
    out: W,
    width: usize,
}

impl TerminalView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), terminal_width())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self { out, width }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> View for TerminalView<W> {
    fn render(&mut self, state: &ViewState) -> Result<()> {
        writeln!(self.out, "{}", frame(state, self.width)).context("Failed to draw window")?;
        self.out.flush().context("Failed to draw window")
    }
}

/// Text drawn for one window refresh: output pane, then the history grid.
pub fn frame(state: &ViewState, width: usize) -> String {
    let output = match state.phase {
        Phase::AwaitingResult => "Generating...".to_string(),
        _ if state.output.is_empty() => "(no output yet)".to_string(),
        _ => render_output(&state.output),
    };

    format!(
        "\nGenerated Code\n{output}\n\nStored Snippets\n{}\n",
        render_grid(&state.grid, width)
    )
}

/// Interactive window loop; returns when the user picks Quit or presses Esc.
pub fn run_window<G: SnippetSource, S: SnippetLog>(
    controller: &mut AppController<G, S>,
) -> Result<()> {
    let theme = ColorfulTheme::default();
    let mut view = TerminalView::stdout();
    let labels = WindowAction::ALL.map(WindowAction::label);

    println!("──────────────────────────────────────────");
    println!("  CodeSnip: Code Snippet Generator");
    println!("──────────────────────────────────────────");

    loop {
        let selection = Select::with_theme(&theme)
            .with_prompt("Choose an action")
            .default(0)
            .items(&labels)
            .interact_opt()
            .context("Failed to read menu selection")?;

        let event = match selection.map(WindowAction::from_index) {
            Some(WindowAction::Generate) => {
                let task: String = Input::with_theme(&theme)
                    .with_prompt("Enter Programming Task")
                    .allow_empty(true)
                    .interact_text()
                    .context("Failed to read task")?;

                if !task.trim().is_empty() {
                    println!("Generating...");
                }
                UiEvent::generate(task)
            }
            Some(WindowAction::ViewHistory) => UiEvent::ViewHistory,
            Some(WindowAction::Quit) | None => break,
        };

        controller.handle(event, &mut view)?;
    }

    Ok(())
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|width| *width >= 40)
        .unwrap_or(DEFAULT_WIDTH)
}
