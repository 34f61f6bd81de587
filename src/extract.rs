use std::io::{ErrorKind, Read};

use serde_json::Value;
use tracing::debug;

use crate::error::{FlightError, FlightResult};
use crate::model::FlightRecord;

pub const DEFAULT_CAPACITY: usize = 14336;
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const TRAIL_MARKER: &[u8] = b"\"trail\":";
const ARRAY_CLOSE: &[u8] = b"]}";

#[derive(Debug)]
pub struct ExtractBuffer {
    bytes: Box<[u8]>,
    len: usize,
}

impl ExtractBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    pub fn reset(&mut self) {
        self.bytes.fill(0);
        self.len = 0;
    }

    pub fn append(&mut self, chunk: &[u8]) -> FlightResult<()> {
        if chunk.len() > self.remaining() {
            return Err(FlightError::BufferOverflow {
                capacity: self.capacity(),
            });
        }
        self.bytes[self.len..self.len + chunk.len()].copy_from_slice(chunk);
        self.len += chunk.len();
        Ok(())
    }

    pub fn truncate_at(&mut self, offset: usize) {
        let offset = offset.min(self.len);
        self.bytes[offset..self.len].fill(0);
        self.len = offset;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[cfg(test)]
    fn is_zeroed(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cut {
    offset: usize,
    suffix: &'static [u8],
}

#[derive(Clone, Copy, Debug)]
enum Scan {
    Marker {
        from: usize,
    },
    Value {
        pos: usize,
        container: Option<u8>,
        depth: u32,
        in_string: bool,
        escaped: bool,
    },
}

impl Scan {
    fn start() -> Self {
        Scan::Marker { from: 0 }
    }

    fn advance(&mut self, bytes: &[u8]) -> Option<Cut> {
        if let Scan::Marker { from } = *self {
            match find(&bytes[from..], TRAIL_MARKER) {
                Some(idx) => {
                    let pos = from + idx + TRAIL_MARKER.len();
                    debug!("trail marker at byte {}", from + idx);
                    *self = Scan::Value {
                        pos,
                        container: None,
                        depth: 0,
                        in_string: false,
                        escaped: false,
                    };
                }
                None => {
                    // Keep a marker split across two chunks findable.
                    let keep = TRAIL_MARKER.len() - 1;
                    *self = Scan::Marker {
                        from: bytes.len().saturating_sub(keep).max(from),
                    };
                    return None;
                }
            }
        }

        let Scan::Value {
            pos,
            container,
            depth,
            in_string,
            escaped,
        } = self
        else {
            return None;
        };

        while *pos < bytes.len() {
            let i = *pos;
            let b = bytes[i];
            *pos += 1;

            if *in_string {
                if *escaped {
                    *escaped = false;
                } else if b == b'\\' {
                    *escaped = true;
                } else if b == b'"' {
                    *in_string = false;
                }
                continue;
            }
            if container.is_none() && !b.is_ascii_whitespace() {
                *container = Some(b);
            }

            match b {
                b'"' => *in_string = true,
                b'{' | b'[' => *depth += 1,
                b'}' | b']' => {
                    if *depth == 0 {
                        // Enclosing object closed; the trail was a scalar.
                        return Some(Cut {
                            offset: i + 1,
                            suffix: b"",
                        });
                    }
                    *depth -= 1;
                    if *container == Some(b'[') {
                        if *depth == 1 && b == b'}' {
                            return Some(Cut {
                                offset: i + 1,
                                suffix: ARRAY_CLOSE,
                            });
                        }
                        if *depth == 0 {
                            return Some(Cut {
                                offset: i,
                                suffix: ARRAY_CLOSE,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[derive(Debug)]
pub struct BoundedExtractor {
    buffer: ExtractBuffer,
    chunk: Vec<u8>,
}

impl BoundedExtractor {
    pub fn new(capacity: usize, chunk_size: usize) -> Self {
        Self {
            buffer: ExtractBuffer::with_capacity(capacity.max(ARRAY_CLOSE.len())),
            chunk: vec![0u8; chunk_size.max(1)],
        }
    }

    #[cfg(test)]
    pub fn buffer(&self) -> &ExtractBuffer {
        &self.buffer
    }

    pub fn read_document<R: Read>(&mut self, reader: R) -> FlightResult<&[u8]> {
        self.buffer.reset();
        match self.fill(reader) {
            Ok(()) => Ok(self.buffer.as_bytes()),
            Err(err) => {
                self.buffer.reset();
                Err(err)
            }
        }
    }

    pub fn extract<R: Read>(&mut self, reader: R) -> FlightResult<FlightRecord> {
        let document = self.read_document(reader)?;
        parse_flight(document)
    }

    fn fill<R: Read>(&mut self, mut reader: R) -> FlightResult<()> {
        let capacity = self.buffer.capacity();
        let mut scan = Scan::start();
        loop {
            let want = self.chunk.len();
            let read = match reader.read(&mut self.chunk[..want]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FlightError::Transport(err.to_string())),
            };
            if read == 0 {
                return self.finish_unterminated();
            }

            let take = read.min(self.buffer.remaining());
            if take == 0 {
                return Err(FlightError::BufferOverflow { capacity });
            }
            self.buffer.append(&self.chunk[..take])?;

            if let Some(cut) = scan.advance(self.buffer.as_bytes()) {
                if cut.offset + cut.suffix.len() > capacity {
                    return Err(FlightError::BufferOverflow { capacity });
                }
                self.buffer.truncate_at(cut.offset);
                self.buffer.append(cut.suffix)?;
                debug!("detail document bounded at {} bytes", self.buffer.len());
                return Ok(());
            }

            if take < read {
                return Err(FlightError::BufferOverflow { capacity });
            }
        }
    }

    fn finish_unterminated(&mut self) -> FlightResult<()> {
        let complete =
            serde_json::from_slice::<serde::de::IgnoredAny>(self.buffer.as_bytes()).is_ok();
        if complete {
            debug!(
                "detail document complete without truncation ({} bytes)",
                self.buffer.len()
            );
            Ok(())
        } else {
            Err(FlightError::TruncationNotFound)
        }
    }
}

impl Default for BoundedExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_CHUNK_SIZE)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightField {
    FlightNumber,
    Callsign,
    AircraftCode,
    AircraftModel,
    AirlineName,
    OriginName,
    OriginIata,
    DestinationName,
    DestinationIata,
}

#[derive(Clone, Copy, Debug)]
enum Normalize {
    Verbatim,
    AirportName,
}

impl Normalize {
    fn apply(self, text: &str) -> String {
        match self {
            Normalize::Verbatim => text.to_string(),
            Normalize::AirportName => text.replace(" Airport", ""),
        }
    }
}

struct FieldSpec {
    field: FlightField,
    path: &'static [&'static str],
    default: &'static str,
    normalize: Normalize,
}

const FIELDS: [FieldSpec; 9] = [
    FieldSpec {
        field: FlightField::FlightNumber,
        path: &["identification", "number", "default"],
        default: "",
        normalize: Normalize::Verbatim,
    },
    FieldSpec {
        field: FlightField::Callsign,
        path: &["identification", "callsign"],
        default: "",
        normalize: Normalize::Verbatim,
    },
    FieldSpec {
        field: FlightField::AircraftCode,
        path: &["aircraft", "model", "code"],
        default: "",
        normalize: Normalize::Verbatim,
    },
    FieldSpec {
        field: FlightField::AircraftModel,
        path: &["aircraft", "model", "text"],
        default: "",
        normalize: Normalize::Verbatim,
    },
    FieldSpec {
        field: FlightField::AirlineName,
        path: &["airline", "name"],
        default: "",
        normalize: Normalize::Verbatim,
    },
    FieldSpec {
        field: FlightField::OriginName,
        path: &["airport", "origin", "name"],
        default: "",
        normalize: Normalize::AirportName,
    },
    FieldSpec {
        field: FlightField::OriginIata,
        path: &["airport", "origin", "code", "iata"],
        default: "",
        normalize: Normalize::Verbatim,
    },
    FieldSpec {
        field: FlightField::DestinationName,
        path: &["airport", "destination", "name"],
        default: "",
        normalize: Normalize::AirportName,
    },
    FieldSpec {
        field: FlightField::DestinationIata,
        path: &["airport", "destination", "code", "iata"],
        default: "",
        normalize: Normalize::Verbatim,
    },
];

fn slot(record: &mut FlightRecord, field: FlightField) -> &mut String {
    match field {
        FlightField::FlightNumber => &mut record.flight_number,
        FlightField::Callsign => &mut record.callsign,
        FlightField::AircraftCode => &mut record.aircraft_code,
        FlightField::AircraftModel => &mut record.aircraft_model,
        FlightField::AirlineName => &mut record.airline_name,
        FlightField::OriginName => &mut record.origin_name,
        FlightField::OriginIata => &mut record.origin_iata,
        FlightField::DestinationName => &mut record.destination_name,
        FlightField::DestinationIata => &mut record.destination_iata,
    }
}

pub fn text_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(root, |node, key| node.get(*key))
        .and_then(Value::as_str)
}

pub fn parse_flight(document: &[u8]) -> FlightResult<FlightRecord> {
    let root: Value =
        serde_json::from_slice(document).map_err(|err| FlightError::Parse(err.to_string()))?;
    if !root.is_object() {
        return Err(FlightError::Parse(
            "detail response is not a JSON object".to_string(),
        ));
    }

    let mut record = FlightRecord::default();
    for spec in FIELDS.iter() {
        let value = text_at(&root, spec.path)
            .map(|text| spec.normalize.apply(text))
            .unwrap_or_else(|| spec.default.to_string());
        *slot(&mut record, spec.field) = value;
    }
    Ok(record)
}
