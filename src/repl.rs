use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::client::SearchService;
use crate::controller::SearchController;
use crate::data_models::{Category, UnknownCategory};
use crate::pagination::Direction;
use crate::query::DATE_FORMAT;
use crate::terminal::TerminalView;

pub const HELP: &str = "\
commands:
  keyword <text>     set the search keyword (empty clears it)
  title <text>       filter by magazine title
  author <text>      filter by author
  from <YYYY-MM-DD>  earliest publication date, '-' clears
  to <YYYY-MM-DD>    latest publication date, '-' clears
  toggle <category>  select or unselect a category
  all | none         select or unselect every category
  clear              reset keyword and all filters
  filters            show the current keyword and filters
  search | s         search from the first page
  next | n           next page
  prev | p           previous page
  show               show the current page again
  help               this text
  quit | q           leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Keyword(String),
    Title(String),
    Author(String),
    From(Option<NaiveDate>),
    To(Option<NaiveDate>),
    Toggle(Category),
    SelectAll,
    DeselectAll,
    Clear,
    Filters,
    Search,
    Navigate(Direction),
    Show,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}, type 'help' for the list")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid date {value:?}, expected YYYY-MM-DD: {source}")]
    InvalidDate {
        value: String,
        source: chrono::ParseError,
    },

    #[error(transparent)]
    Category(#[from] UnknownCategory),
}

fn parse_date(value: &str) -> Result<Option<NaiveDate>, CommandError> {
    if value.is_empty() || value == "-" {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|source| CommandError::InvalidDate {
            value: value.to_string(),
            source,
        })
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "keyword" | "k" => Command::Keyword(rest.to_string()),
            "title" => Command::Title(rest.to_string()),
            "author" => Command::Author(rest.to_string()),
            "from" => Command::From(parse_date(rest)?),
            "to" => Command::To(parse_date(rest)?),
            "toggle" | "t" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("toggle"));
                }
                Command::Toggle(rest.parse()?)
            }
            "all" => Command::SelectAll,
            "none" => Command::DeselectAll,
            "clear" => Command::Clear,
            "filters" | "f" => Command::Filters,
            "search" | "s" => Command::Search,
            "next" | "n" => Command::Navigate(Direction::Next),
            "prev" | "p" => Command::Navigate(Direction::Prev),
            "show" => Command::Show,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Applies one command. Filter edits go through even while a search is in
/// flight; searches and page moves the session refuses are reported.
pub fn apply<S, W>(
    controller: &mut SearchController<S, TerminalView<W>>,
    command: Command,
) -> Flow
where
    S: SearchService + ?Sized + 'static,
    W: Write,
{
    match command {
        Command::Keyword(keyword) => controller.set_keyword(keyword),
        Command::Title(title) => controller.filters_mut().title = title,
        Command::Author(author) => controller.filters_mut().author = author,
        Command::From(date) => controller.filters_mut().min_date = date,
        Command::To(date) => controller.filters_mut().max_date = date,
        Command::Toggle(category) => {
            let selected = controller.filters_mut().toggle_category(category);
            let state = if selected { "selected" } else { "unselected" };
            controller.view_mut().note(&format!("{category} {state}"));
        }
        Command::SelectAll => controller.filters_mut().select_all_categories(),
        Command::DeselectAll => controller.filters_mut().deselect_all_categories(),
        Command::Clear => {
            controller.set_keyword("");
            controller.filters_mut().clear();
        }
        Command::Filters => {
            let session = controller.session();
            let text = crate::terminal::describe_criteria(session.keyword(), session.filters());
            controller.view_mut().note(&text);
        }
        Command::Search => {
            if let Err(e) = controller.submit() {
                controller.view_mut().note(&e.to_string());
            }
        }
        Command::Navigate(direction) => {
            if let Err(e) = controller.navigate(direction) {
                controller.view_mut().note(&e.to_string());
            }
        }
        Command::Show => {
            if controller.session().last_response().is_some() {
                controller.rerender();
            } else {
                controller.view_mut().note("nothing to show yet, type 'search'");
            }
        }
        Command::Help => controller.view_mut().note(HELP),
        Command::Quit => return Flow::Quit,
    }
    Flow::Continue
}

pub async fn run<S>(service: Arc<S>, ansi: bool) -> Result<()>
where
    S: SearchService + ?Sized + 'static,
{
    let input = BufReader::new(tokio::io::stdin());
    drive(service, input, TerminalView::stdout(ansi)).await?;
    Ok(())
}

/// Reads commands from `input` and fetch completions from the controller, one
/// event at a time, until `quit` or end of input. A search still running at
/// end of input is waited for and shown before returning.
pub async fn drive<S, R, W>(
    service: Arc<S>,
    input: R,
    view: TerminalView<W>,
) -> Result<TerminalView<W>>
where
    S: SearchService + ?Sized + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (mut controller, mut completions) = SearchController::new(service, view);
    controller.view_mut().note(HELP);

    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    controller.settle_next(&mut completions).await;
                    break;
                };
                match line.parse::<Command>() {
                    Ok(command) => {
                        if apply(&mut controller, command) == Flow::Quit {
                            break;
                        }
                    }
                    Err(CommandError::Empty) => {}
                    Err(e) => controller.view_mut().note(&e.to_string()),
                }
            }
            Some(completion) = completions.recv() => {
                controller.settle(completion);
            }
        }
    }

    Ok(controller.into_view())
}
