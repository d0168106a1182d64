//! Line-oriented front end for a [`ReviewSession`].

use std::io::{self, BufRead, Write};

use tracing::debug;
use trail_review::{
    CatalogStore, Command, DiagnosticRenderer, Extension, ImageCommand, MaskGenerator, Point, RasterStore, ReviewError,
    ReviewMode, ReviewSession, TrailCommand, UndoOutcome,
    commands::{parse_extension, parse_image_index, parse_point},
    editor::parse_width,
};

const UNKNOWN_COMMAND: &str = "That command does not do anything...yet...";

/// Extension, unbinned start and end points, and width of a trail to add.
type NewTrailInput = (Extension, Point, Point, f64);

enum Flow {
    Continue,
    Quit,
}

/// Reads commands from `input` and writes prompts and state to `output`.
pub struct ReviewConsole<I, O> {
    input: I,
    output: O,
}

impl<I: BufRead, O: Write> ReviewConsole<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> O {
        self.output
    }

    /// Runs until the analyst quits, input ends, or every image has been reviewed.
    pub fn run<S, G, R>(&mut self, session: &mut ReviewSession<S, G, R>) -> io::Result<()>
    where
        S: CatalogStore + RasterStore,
        G: MaskGenerator,
        R: DiagnosticRenderer,
    {
        loop {
            let mode = session.mode();
            if mode == ReviewMode::Ended {
                writeln!(self.output, "All images have been reviewed.")?;
                session.quit();
                return Ok(());
            }

            self.show(session)?;
            let Some(line) = self.prompt("> ")? else {
                session.quit();
                return Ok(());
            };
            let command = match Command::parse(mode, &line) {
                Ok(command) => command,
                Err(err) => {
                    debug!("{}", err);
                    writeln!(self.output, "{UNKNOWN_COMMAND}")?;
                    continue;
                }
            };

            if let Flow::Quit = self.execute(session, command)? {
                session.quit();
                return Ok(());
            }
        }
    }

    fn execute<S, G, R>(&mut self, session: &mut ReviewSession<S, G, R>, command: Command) -> io::Result<Flow>
    where
        S: CatalogStore + RasterStore,
        G: MaskGenerator,
        R: DiagnosticRenderer,
    {
        let result = match command {
            Command::Trail(TrailCommand::SaveAndNext) => session.advance(),
            Command::Trail(TrailCommand::Save) => session.save(),
            Command::Trail(TrailCommand::ChangeWidth) => match self.prompt("New width: ")? {
                Some(line) => session.resize_width(&line),
                None => return Ok(Flow::Quit),
            },
            Command::Trail(TrailCommand::Reject) => session.reject(),
            Command::Trail(TrailCommand::Accept) => session.accept(),
            Command::Trail(TrailCommand::Undo) => match session.undo() {
                Ok(UndoOutcome::NothingToUndo) => {
                    writeln!(self.output, "Nothing to undo")?;
                    Ok(())
                }
                other => other.map(|_| ()),
            },
            Command::Image(ImageCommand::NextImage) => session.advance_image(),
            Command::Image(ImageCommand::AddTrail) => match self.read_new_trail()? {
                Some(Ok((extension, start, end, width))) => {
                    session.add_trail(extension, start, end, width).map(|_| ())
                }
                Some(Err(err)) => Err(err),
                None => return Ok(Flow::Quit),
            },
            Command::Image(ImageCommand::Reexamine) => session.reexamine(),
            Command::Trail(TrailCommand::OpenViewer) | Command::Image(ImageCommand::OpenViewer) => {
                session.open_viewer()
            }
            Command::Trail(TrailCommand::JumpToImage) | Command::Image(ImageCommand::JumpToImage) => {
                for (index, image) in session.images().iter().enumerate() {
                    writeln!(self.output, "  {index}: {image}")?;
                }
                match self.prompt("Image number: ")? {
                    Some(line) => {
                        parse_image_index(&line, session.images().len()).and_then(|index| session.jump_to_image(index))
                    }
                    None => return Ok(Flow::Quit),
                }
            }
            Command::Trail(TrailCommand::ToggleFilter) | Command::Image(ImageCommand::ToggleFilter) => {
                session.toggle_filter()
            }
            Command::Trail(TrailCommand::Quit) | Command::Image(ImageCommand::Quit) => return Ok(Flow::Quit),
        };

        if let Err(err) = result {
            self.report(&err)?;
        }
        Ok(Flow::Continue)
    }

    /// Asks for extension, endpoints and width of a new trail. `None` means input ended.
    fn read_new_trail(&mut self) -> io::Result<Option<Result<NewTrailInput, ReviewError>>> {
        let Some(extension) = self.prompt("Extension (4 or 1): ")? else {
            return Ok(None);
        };
        let Some(start) = self.prompt("Start point, unbinned pixels (x y): ")? else {
            return Ok(None);
        };
        let Some(end) = self.prompt("End point, unbinned pixels (x y): ")? else {
            return Ok(None);
        };
        let Some(width) = self.prompt("Width: ")? else {
            return Ok(None);
        };

        let parsed = parse_extension(extension.trim()).and_then(|extension| {
            Ok((extension, parse_point(&start)?, parse_point(&end)?, parse_width(&width)?))
        });
        Ok(Some(parsed))
    }

    fn show<S, G, R>(&mut self, session: &ReviewSession<S, G, R>) -> io::Result<()>
    where
        S: CatalogStore + RasterStore,
        G: MaskGenerator,
        R: DiagnosticRenderer,
    {
        let image = session.current_image().unwrap_or("-");
        let extension = session.cursor().extension;
        writeln!(self.output)?;
        match session.current_trail() {
            Some(trail) => writeln!(
                self.output,
                "{image} ext {extension}: trail {} [{}], width {:.2}",
                trail.id, trail.status, trail.width
            )?,
            None => writeln!(self.output, "{image} ext {extension}: no more trails, whole image shown")?,
        }
        if session.is_dirty() {
            writeln!(self.output, "(unsaved changes)")?;
        }
        if let Some(path) = session.current_diagnostic() {
            writeln!(self.output, "Diagnostic: {}", path.display())?;
        }

        writeln!(self.output, "Reviewing {} trails. Options:", session.filter())?;
        for (key, description) in Command::menu(session.mode()) {
            let key = if key.is_empty() { "ENTER" } else { key };
            writeln!(self.output, "  {key:>5}  {description}")?;
        }
        Ok(())
    }

    fn report(&mut self, err: &ReviewError) -> io::Result<()> {
        if err.is_validation() {
            writeln!(self.output, "{err}")
        } else {
            writeln!(self.output, "Error: {err}")
        }
    }

    /// One trimmed line of input, `None` at end of input.
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{message}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
