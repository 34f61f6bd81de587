use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read};
use std::time::Duration;

use anyhow::Result;

use crate::clock::{Clock, Shutdown};
use crate::display::{Canvas, Display, PixelColor};
use crate::error::{FlightError, FlightResult};
use crate::net::{Endpoints, Transport};

#[derive(Debug)]
pub struct RecordingDisplay {
    pub canvas: Canvas,
    pub frames: Vec<Canvas>,
    pub calls: usize,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::with_canvas(Canvas::panel())
    }

    pub fn with_canvas(canvas: Canvas) -> Self {
        Self {
            canvas,
            frames: Vec::new(),
            calls: 0,
        }
    }

    pub fn last_frame(&self) -> Option<&Canvas> {
        self.frames.last()
    }
}

impl Display for RecordingDisplay {
    fn clear(&mut self) -> Result<()> {
        self.calls += 1;
        self.canvas.clear()
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<()> {
        self.calls += 1;
        self.canvas.draw_text(text, x, y)
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: PixelColor) -> Result<()> {
        self.calls += 1;
        self.canvas.fill_rect(x, y, w, h, color)
    }

    fn commit(&mut self) -> Result<()> {
        self.calls += 1;
        self.frames.push(self.canvas.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeClock {
    pub sleeps: Vec<Duration>,
    stop_after: Option<usize>,
    shutdown: Shutdown,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopping_after(sleeps: usize, shutdown: Shutdown) -> Self {
        Self {
            sleeps: Vec::new(),
            stop_after: Some(sleeps),
            shutdown,
        }
    }
}

impl Clock for FakeClock {
    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
        if self.stop_after.is_some_and(|n| self.sleeps.len() >= n) {
            self.shutdown.request();
        }
    }
}

pub const TEST_SEARCH_BASE: &str = "http://feed.test/search?bounds=";
pub const TEST_DETAILS_BASE: &str = "http://feed.test/details?flight=";

pub fn test_endpoints() -> Endpoints {
    Endpoints::new(TEST_SEARCH_BASE, "51.6,51.4,-0.3,-0.1", "&limit=1", TEST_DETAILS_BASE)
}

#[derive(Clone, Debug)]
pub enum Reply {
    Body(String),
    Fail,
}

impl Reply {
    pub fn body(text: &str) -> Self {
        Reply::Body(text.to_string())
    }
}

#[derive(Debug)]
pub struct FakeTransport {
    searches: VecDeque<Reply>,
    details: HashMap<String, Reply>,
    pub requests: Vec<String>,
    pub connected: bool,
    pub reconnects: usize,
    heal_after: usize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            searches: VecDeque::new(),
            details: HashMap::new(),
            requests: Vec::new(),
            connected: true,
            reconnects: 0,
            heal_after: 1,
        }
    }

    pub fn offline(heal_after: usize) -> Self {
        Self {
            connected: false,
            heal_after,
            ..Self::new()
        }
    }

    pub fn push_search(&mut self, reply: Reply) {
        self.searches.push_back(reply);
    }

    pub fn set_details(&mut self, flight_id: &str, reply: Reply) {
        self.details.insert(flight_id.to_string(), reply);
    }

    pub fn detail_requests(&self) -> usize {
        self.requests
            .iter()
            .filter(|url| url.starts_with(TEST_DETAILS_BASE))
            .count()
    }
}

impl Transport for FakeTransport {
    fn get(&mut self, url: &str, _headers: &[(&str, &str)]) -> FlightResult<Box<dyn Read + '_>> {
        self.requests.push(url.to_string());
        let reply = match url.strip_prefix(TEST_DETAILS_BASE) {
            Some(id) => self.details.get(id).cloned().unwrap_or(Reply::Fail),
            None => self.searches.pop_front().unwrap_or(Reply::Fail),
        };
        match reply {
            Reply::Body(text) => Ok(Box::new(Cursor::new(text.into_bytes()))),
            Reply::Fail => {
                self.connected = false;
                Err(FlightError::Transport("connection refused".to_string()))
            }
        }
    }

    fn is_connected(&mut self) -> bool {
        self.connected
    }

    fn reconnect(&mut self) -> FlightResult<()> {
        self.reconnects += 1;
        if self.reconnects >= self.heal_after {
            self.connected = true;
            Ok(())
        } else {
            Err(FlightError::Transport("still offline".to_string()))
        }
    }
}
