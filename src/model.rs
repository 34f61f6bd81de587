use serde::Serialize;
use serde_json::{Map, Value};

pub type SearchResponse = Map<String, Value>;

pub const META_VERSION: &str = "version";
pub const META_FULL_COUNT: &str = "full_count";

pub fn is_metadata_key(key: &str) -> bool {
    key == META_VERSION || key == META_FULL_COUNT
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FlightRecord {
    pub flight_number: String,
    pub callsign: String,
    pub aircraft_code: String,
    pub aircraft_model: String,
    pub airline_name: String,
    pub origin_name: String,
    pub origin_iata: String,
    pub destination_name: String,
    pub destination_iata: String,
}

impl FlightRecord {
    pub fn has_identity(&self) -> bool {
        !self.flight_number.is_empty() || !self.callsign.is_empty()
    }

    pub fn lines(&self) -> DisplayLines {
        let line1 = if self.flight_number.is_empty() {
            self.callsign.clone()
        } else {
            self.flight_number.clone()
        };
        DisplayLines {
            rows: [
                RowText {
                    short: line1,
                    long: format!("{} - {}", self.airline_name, self.callsign),
                },
                RowText {
                    short: format!("{} - {}", self.origin_iata, self.destination_iata),
                    long: format!("{} - {}", self.origin_name, self.destination_name),
                },
                RowText {
                    short: self.aircraft_code.clone(),
                    long: self.aircraft_model.clone(),
                },
            ],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowText {
    pub short: String,
    pub long: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayLines {
    pub rows: [RowText; 3],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedFlight {
    pub id: String,
}

impl TrackedFlight {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn is(&self, id: &str) -> bool {
        self.id == id
    }
}

#[cfg(test)]
mod tests {
    use super::{is_metadata_key, FlightRecord, TrackedFlight};

    fn sample() -> FlightRecord {
        FlightRecord {
            flight_number: "BA123".to_string(),
            callsign: "SPEEDBIRD1".to_string(),
            aircraft_code: "A320".to_string(),
            aircraft_model: "Airbus A320".to_string(),
            airline_name: "British Airways".to_string(),
            origin_name: "Heathrow".to_string(),
            origin_iata: "LHR".to_string(),
            destination_name: "Charles de Gaulle".to_string(),
            destination_iata: "CDG".to_string(),
        }
    }

    #[test]
    fn lines_follow_field_mapping() {
        let lines = sample().lines();
        assert_eq!(lines.rows[0].short, "BA123");
        assert_eq!(lines.rows[0].long, "British Airways - SPEEDBIRD1");
        assert_eq!(lines.rows[1].short, "LHR - CDG");
        assert_eq!(lines.rows[1].long, "Heathrow - Charles de Gaulle");
        assert_eq!(lines.rows[2].short, "A320");
        assert_eq!(lines.rows[2].long, "Airbus A320");
    }

    #[test]
    fn line1_falls_back_to_callsign() {
        let mut record = sample();
        record.flight_number.clear();
        assert_eq!(record.lines().rows[0].short, "SPEEDBIRD1");
        assert!(record.has_identity());

        record.callsign.clear();
        assert_eq!(record.lines().rows[0].short, "");
        assert!(!record.has_identity());
    }

    #[test]
    fn empty_record_keeps_separators() {
        let lines = FlightRecord::default().lines();
        assert_eq!(lines.rows[1].short, " - ");
        assert_eq!(lines.rows[2].long, "");
    }

    #[test]
    fn metadata_keys_and_tracking() {
        assert!(is_metadata_key("version"));
        assert!(is_metadata_key("full_count"));
        assert!(!is_metadata_key("abc123"));
        assert!(TrackedFlight::new("abc123").is("abc123"));
        assert!(!TrackedFlight::new("abc123").is("abc124"));
    }
}
