use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Prev => "prev",
            Direction::Next => "next",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction: {0} (expected \"prev\" or \"next\")")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prev" => Ok(Direction::Prev),
            "next" => Ok(Direction::Next),
            other => Err(UnknownDirection(other.to_string())),
        }
    }
}

pub fn can_go_previous(offset: u64) -> bool {
    offset > 0
}

pub fn can_go_next(total: u64, offset: u64, limit: u64) -> bool {
    total > offset + limit
}

/// Offset of the neighbouring page. Does not check `can_go_*`; callers gate.
pub fn next_offset(offset: u64, limit: u64, direction: Direction) -> u64 {
    match direction {
        Direction::Prev => offset.saturating_sub(limit),
        Direction::Next => offset + limit,
    }
}

pub fn can_go(direction: Direction, total: u64, offset: u64, limit: u64) -> bool {
    match direction {
        Direction::Prev => can_go_previous(offset),
        Direction::Next => can_go_next(total, offset, limit),
    }
}

/// The slice of the match set a page covers, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based index of the first shown result, 0 when nothing is shown.
    pub first: u64,
    /// 1-based index of the last shown result.
    pub last: u64,
    pub total: u64,
    pub page: u64,
    pub page_count: u64,
}

impl PageWindow {
    pub fn new(total: u64, offset: u64, limit: u64, shown: usize) -> Self {
        let shown = shown as u64;
        let limit = limit.max(1);
        let (first, last) = if shown == 0 {
            (0, 0)
        } else {
            (offset + 1, offset + shown)
        };

        PageWindow {
            first,
            last,
            total,
            page: offset / limit + 1,
            page_count: total.div_ceil(limit).max(1),
        }
    }
}

impl fmt::Display for PageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == 0 {
            write!(f, "No results on this page ({} total)", self.total)
        } else {
            write!(
                f,
                "Results {}-{} of {}, page {} of {}",
                self.first, self.last, self.total, self.page, self.page_count
            )
        }
    }
}

#[test]
fn test_pagination_bounds() {
    assert!(can_go_previous(10));
    assert!(can_go_next(25, 10, 10));

    assert!(can_go_previous(20));
    assert!(!can_go_next(25, 20, 10));

    assert!(!can_go_previous(0));
    assert!(!can_go_next(10, 0, 10));
    assert!(can_go_next(11, 0, 10));
}

#[test]
fn test_next_offset() {
    assert_eq!(next_offset(5, 10, Direction::Prev), 0);
    assert_eq!(next_offset(0, 10, Direction::Prev), 0);
    assert_eq!(next_offset(30, 10, Direction::Prev), 20);
    assert_eq!(next_offset(0, 10, Direction::Next), 10);
    // ungated: past the end is still computed
    assert_eq!(next_offset(40, 10, Direction::Next), 50);
}

#[test]
fn test_direction_parsing() {
    assert_eq!("prev".parse::<Direction>(), Ok(Direction::Prev));
    assert_eq!("next".parse::<Direction>(), Ok(Direction::Next));
    assert!("forward".parse::<Direction>().is_err());
}

#[test]
fn test_page_window() {
    let window = PageWindow::new(25, 10, 10, 10);
    assert_eq!((window.first, window.last), (11, 20));
    assert_eq!((window.page, window.page_count), (2, 3));
    assert_eq!(window.to_string(), "Results 11-20 of 25, page 2 of 3");

    let last = PageWindow::new(25, 20, 10, 5);
    assert_eq!((last.first, last.last, last.page), (21, 25, 3));

    let empty = PageWindow::new(0, 0, 10, 0);
    assert_eq!((empty.first, empty.page_count), (0, 1));
    assert_eq!(empty.to_string(), "No results on this page (0 total)");
}
