use crate::model::{is_metadata_key, SearchResponse};

pub const EXPECTED_ENTRIES: usize = 3;

pub fn select_flight(response: &SearchResponse, min_fields: usize) -> Option<String> {
    if response.len() != EXPECTED_ENTRIES {
        return None;
    }
    response
        .iter()
        .filter(|(key, _)| !is_metadata_key(key))
        .find(|(_, value)| {
            value
                .as_array()
                .is_some_and(|fields| fields.len() > min_fields)
        })
        .map(|(key, _)| key.clone())
}
