use std::io::{self, Write};

use crate::controller::SessionView;
use crate::data_models::{Category, FilterState, ResultItem};
use crate::query::DATE_FORMAT;
use crate::session::{SearchSession, SessionState};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const RULE: &str = "------------------------------------------------------------";

/// Plain-text rendering of a session onto any writer.
pub struct TerminalView<W: Write> {
    out: W,
    ansi: bool,
    scroll_pending: bool,
}

impl TerminalView<io::Stdout> {
    pub fn stdout(ansi: bool) -> Self {
        Self::new(io::stdout(), ansi)
    }
}

impl<W: Write> TerminalView<W> {
    /// With `ansi` set, scrolling to the top clears the screen; otherwise a
    /// rule is printed above the new page.
    pub fn new(out: W, ansi: bool) -> Self {
        Self {
            out,
            ansi,
            scroll_pending: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn note(&mut self, message: &str) {
        self.write(|out| writeln!(out, "{message}"));
    }

    /// Writes are best-effort; a broken terminal is logged, not propagated.
    fn write(&mut self, f: impl FnOnce(&mut W) -> io::Result<()>) {
        if let Err(e) = f(&mut self.out).and_then(|_| self.out.flush()) {
            log::error!("failed to write to terminal: {e}");
        }
    }

    fn render_page(out: &mut W, session: &SearchSession) -> io::Result<()> {
        let Some(response) = session.last_response() else {
            return Ok(());
        };

        writeln!(out, "Total results: {}", response.total)?;
        if let Some(window) = session.page_window() {
            writeln!(out, "{window}")?;
        }
        writeln!(out)?;

        for (i, item) in response.contents.iter().enumerate() {
            let position = session.offset() + i as u64 + 1;
            write_item(out, position, item)?;
        }

        let prev = if session.can_go_previous() { "prev" } else { "----" };
        let next = if session.can_go_next() { "next" } else { "----" };
        writeln!(out, "[{prev}] [{next}]")
    }
}

fn write_item<W: Write>(out: &mut W, position: u64, item: &ResultItem) -> io::Result<()> {
    writeln!(out, "{position}. {}", item.title)?;
    for line in item.content.split('\n') {
        if line.is_empty() {
            writeln!(out)?;
        } else {
            writeln!(out, "   {line}")?;
        }
    }
    writeln!(
        out,
        "   [{}] Magazine: {} | Author: {} | Published: {}",
        item.metadata.category,
        item.metadata.title,
        item.metadata.author,
        item.metadata.publication_date
    )?;
    writeln!(out)
}

impl<W: Write> SessionView for TerminalView<W> {
    fn render(&mut self, session: &SearchSession) {
        let clear = std::mem::take(&mut self.scroll_pending);
        let ansi = self.ansi;
        self.write(|out| {
            if clear {
                if ansi {
                    write!(out, "{CLEAR_SCREEN}")?;
                } else {
                    writeln!(out, "{RULE}")?;
                }
            }
            match session.state() {
                SessionState::Idle => Ok(()),
                SessionState::Loading => writeln!(out, "Searching..."),
                SessionState::Loaded => Self::render_page(out, session),
                SessionState::Failed(_) => {
                    if session.last_response().is_some() {
                        writeln!(out, "(showing previous results)")?;
                    }
                    Self::render_page(out, session)
                }
            }
        });
    }

    fn scroll_to_top(&mut self) {
        self.scroll_pending = true;
    }

    fn alert(&mut self, message: &str) {
        self.write(|out| {
            writeln!(out, "{RULE}")?;
            writeln!(out, "!! {message}")?;
            writeln!(out, "{RULE}")
        });
    }
}

/// The page on screen in the service's JSON shape. Writes nothing before the
/// first successful search.
pub fn write_json<W: Write>(out: &mut W, session: &SearchSession) -> io::Result<()> {
    let Some(response) = session.last_response() else {
        return Ok(());
    };
    serde_json::to_writer_pretty(&mut *out, response)?;
    writeln!(out)
}

/// One-line-per-dimension summary of keyword and filters.
pub fn describe_criteria(keyword: &str, filters: &FilterState) -> String {
    let or_any = |s: &str| {
        if s.is_empty() {
            "(any)".to_string()
        } else {
            s.to_string()
        }
    };
    let date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "(any)".to_string())
    };
    let categories = Category::ALL
        .iter()
        .map(|c| {
            let mark = if filters.is_selected(*c) { 'x' } else { ' ' };
            format!("[{mark}] {c}")
        })
        .collect::<Vec<_>>()
        .join("  ");

    format!(
        "keyword:    {}\ntitle:      {}\nauthor:     {}\n\
         from:       {}\nto:         {}\ncategories: {}",
        or_any(keyword),
        or_any(&filters.title),
        or_any(&filters.author),
        date(filters.min_date),
        date(filters.max_date),
        categories
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FetchError;
    use crate::data_models::{ResultMetadata, SearchResponse};

    fn output(view: TerminalView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    fn loaded_session() -> SearchSession {
        let mut session = SearchSession::new();
        let pending = session.begin_submit().unwrap();
        session.settle(
            pending.id,
            Ok(SearchResponse {
                total: 12,
                contents: vec![ResultItem {
                    title: "Deep sea".to_string(),
                    content: "first\nsecond".to_string(),
                    metadata: ResultMetadata {
                        title: "Ocean Monthly".to_string(),
                        author: "K. Ito".to_string(),
                        publication_date: "2020-05-05".to_string(),
                        category: Category::Science,
                    },
                }],
            }),
        );
        session
    }

    #[test]
    fn test_render_preserves_content_lines() {
        let mut view = TerminalView::new(Vec::new(), false);
        view.render(&loaded_session());
        let text = output(view);

        assert!(text.contains("Total results: 12"));
        assert!(text.contains("1. Deep sea"));
        assert!(text.contains("   first\n   second\n"));
        assert!(text.contains("[SCIENCE] Magazine: Ocean Monthly | Author: K. Ito"));
        assert!(text.contains("[----] [next]"));
    }

    #[test]
    fn test_render_keeps_blank_and_trailing_lines() {
        let mut session = SearchSession::new();
        let pending = session.begin_submit().unwrap();
        let mut response = loaded_session().last_response().cloned().unwrap();
        response.contents[0].content = "one\r\n\ntwo\n".to_string();
        session.settle(pending.id, Ok(response));

        let mut view = TerminalView::new(Vec::new(), false);
        view.render(&session);
        assert!(output(view).contains("1. Deep sea\n   one\r\n\n   two\n\n   [SCIENCE]"));
    }

    #[test]
    fn test_write_json_matches_wire_shape() {
        let mut out = Vec::new();
        write_json(&mut out, &loaded_session()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["total"], 12);
        assert_eq!(value["contents"][0]["content"], "first\nsecond");
        assert_eq!(value["contents"][0]["metadata"]["category"], "SCIENCE");

        let mut out = Vec::new();
        write_json(&mut out, &SearchSession::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_scroll_to_top_applies_to_next_render_only() {
        let mut view = TerminalView::new(Vec::new(), true);
        let session = loaded_session();
        view.scroll_to_top();
        view.render(&session);
        view.render(&session);
        assert_eq!(output(view).matches(CLEAR_SCREEN).count(), 1);
    }

    #[test]
    fn test_failed_render_marks_stale_results() {
        let mut session = loaded_session();
        let pending = session.begin_submit().unwrap();
        session.settle(
            pending.id,
            Err(FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)),
        );

        let mut view = TerminalView::new(Vec::new(), false);
        view.render(&session);
        view.alert("Search failed.");
        let text = output(view);
        assert!(text.contains("(showing previous results)"));
        assert!(text.contains("Deep sea"));
        assert!(text.contains("!! Search failed."));
    }

    #[test]
    fn test_describe_criteria() {
        let mut filters = FilterState::new();
        filters.author = "Ito".to_string();
        filters.toggle_category(Category::Food);
        let text = describe_criteria("", &filters);
        assert!(text.contains("keyword:    (any)"));
        assert!(text.contains("author:     Ito"));
        assert!(text.contains("[x] FOOD"));
        assert!(text.contains("[ ] FASHION"));
    }
}
