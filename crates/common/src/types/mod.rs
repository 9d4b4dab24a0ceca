use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Response body shape shared by every object route: the payload sits under `data`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self { Self { data } }
}
