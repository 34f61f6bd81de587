use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::clock::{Clock, Shutdown};
use crate::display::Display;
use crate::extract::{BoundedExtractor, DEFAULT_CAPACITY, DEFAULT_CHUNK_SIZE};
use crate::model::{FlightRecord, TrackedFlight};
use crate::net::{
    fetch_details, fetch_search, recover_connection, Endpoints, RequestHeaders, Transport,
    DEFAULT_DETAILS_BASE, DEFAULT_SEARCH_BASE, DEFAULT_SEARCH_TAIL,
};
use crate::render::{Geometry, RenderOutcome, ScrollRenderer, Timing};
use crate::selector::select_flight;

pub const DEFAULT_MIN_SUMMARY_FIELDS: usize = 13;
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
const WAIT_SLICE: Duration = Duration::from_secs(5);
const BOOT_HOLD: Duration = Duration::from_secs(2);
const BOOT_TEXT: &str = "Booting up ^";
const RECONNECT_TEXT: &str = "Reconnecting...";

#[derive(Clone, Debug)]
pub struct LoopOptions {
    pub endpoints: Endpoints,
    pub headers: RequestHeaders,
    pub geometry: Geometry,
    pub timing: Timing,
    pub min_summary_fields: usize,
    pub reconnect_attempts: u32,
    pub poll_interval: Duration,
    pub buffer_capacity: usize,
    pub chunk_size: usize,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::new(
                DEFAULT_SEARCH_BASE,
                "",
                DEFAULT_SEARCH_TAIL,
                DEFAULT_DETAILS_BASE,
            ),
            headers: RequestHeaders::default(),
            geometry: Geometry::default(),
            timing: Timing::default(),
            min_summary_fields: DEFAULT_MIN_SUMMARY_FIELDS,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer_capacity: DEFAULT_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub tracked: Option<TrackedFlight>,
    pub record: Option<FlightRecord>,
    pub blank: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Idle,
    Holding,
    Displayed,
    FetchFailed,
    Interrupted,
}

pub struct PollLoop<T, D, C> {
    transport: T,
    display: D,
    clock: C,
    shutdown: Shutdown,
    endpoints: Endpoints,
    headers: RequestHeaders,
    extractor: BoundedExtractor,
    renderer: ScrollRenderer,
    min_summary_fields: usize,
    reconnect_attempts: u32,
    poll_interval: Duration,
    state: AppState,
}

impl<T, D, C> PollLoop<T, D, C>
where
    T: Transport,
    D: Display,
    C: Clock,
{
    pub fn new(transport: T, display: D, clock: C, shutdown: Shutdown, options: LoopOptions) -> Self {
        Self {
            transport,
            display,
            clock,
            shutdown,
            endpoints: options.endpoints,
            headers: options.headers,
            extractor: BoundedExtractor::new(options.buffer_capacity, options.chunk_size),
            renderer: ScrollRenderer::new(options.geometry, options.timing),
            min_summary_fields: options.min_summary_fields,
            reconnect_attempts: options.reconnect_attempts,
            poll_interval: options.poll_interval,
            state: AppState {
                blank: true,
                ..AppState::default()
            },
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[cfg(test)]
    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn run(&mut self) -> Result<()> {
        self.boot()?;
        while !self.shutdown.is_requested() {
            if self.run_cycle()? == CycleOutcome::Interrupted {
                break;
            }
            self.wait();
        }
        info!("shutdown requested, clearing display");
        self.display.clear()?;
        self.display.commit()?;
        self.state.blank = true;
        Ok(())
    }

    pub fn boot(&mut self) -> Result<()> {
        let y = self.renderer.geometry().row_y(1);
        self.show_text(BOOT_TEXT, y)?;
        self.clock.sleep(BOOT_HOLD);
        self.check_connection()?;
        self.blank()
    }

    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let outcome = match self.search()? {
            None => {
                info!("no flights found, clear display");
                self.state.tracked = None;
                self.state.record = None;
                CycleOutcome::Idle
            }
            Some(id)
                if self
                    .state
                    .tracked
                    .as_ref()
                    .is_some_and(|tracked| tracked.is(&id)) =>
            {
                debug!("same flight {id} found, keep showing it");
                return Ok(CycleOutcome::Holding);
            }
            Some(id) => {
                info!("new flight {id} found, clear display");
                self.state.record = None;
                self.blank()?;
                self.show_flight(&id)?
            }
        };
        self.blank()?;
        Ok(outcome)
    }

    fn search(&mut self) -> Result<Option<String>> {
        match fetch_search(&mut self.transport, &self.endpoints, &self.headers) {
            Ok(response) => Ok(select_flight(&response, self.min_summary_fields)),
            Err(err) => {
                warn!("error getting a flight: {err}");
                if err.is_transport() {
                    self.check_connection()?;
                }
                Ok(None)
            }
        }
    }

    fn show_flight(&mut self, id: &str) -> Result<CycleOutcome> {
        self.state.tracked = Some(TrackedFlight::new(id));
        let record = match fetch_details(
            &mut self.transport,
            &self.endpoints,
            &self.headers,
            id,
            &mut self.extractor,
        ) {
            Ok(record) => record,
            Err(err) => {
                warn!("error loading details for {id}, skip displaying this flight: {err}");
                if err.is_transport() {
                    self.check_connection()?;
                }
                return Ok(CycleOutcome::FetchFailed);
            }
        };

        if record.has_identity() {
            info!(
                "flight is called by number: {}, or call sign: {}",
                record.flight_number, record.callsign
            );
        } else {
            info!("no number or callsign for this flight");
        }

        self.state.blank = false;
        let outcome = self.renderer.render_cycle(
            &mut self.display,
            &mut self.clock,
            &self.shutdown,
            id,
            &record,
        )?;
        self.state.record = Some(record);
        Ok(match outcome {
            RenderOutcome::Completed => CycleOutcome::Displayed,
            RenderOutcome::Interrupted => CycleOutcome::Interrupted,
        })
    }

    fn check_connection(&mut self) -> Result<bool> {
        if self.transport.is_connected() {
            return Ok(true);
        }
        let y = self.renderer.geometry().row_y(1);
        self.show_text(RECONNECT_TEXT, y)?;
        Ok(recover_connection(
            &mut self.transport,
            self.reconnect_attempts,
        ))
    }

    fn show_text(&mut self, text: &str, y: i32) -> Result<()> {
        self.display.clear()?;
        self.display.draw_text(text, 0, y)?;
        self.display.commit()?;
        self.state.blank = false;
        Ok(())
    }

    fn blank(&mut self) -> Result<()> {
        if self.state.blank {
            return Ok(());
        }
        self.display.clear()?;
        self.display.commit()?;
        self.state.blank = true;
        Ok(())
    }

    fn wait(&mut self) {
        debug!("going to sleep for {:?}", self.poll_interval);
        let mut left = self.poll_interval;
        while !left.is_zero() && !self.shutdown.is_requested() {
            let slice = left.min(WAIT_SLICE);
            self.clock.sleep(slice);
            left -= slice;
        }
    }
}
