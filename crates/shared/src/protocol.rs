use serde::{Deserialize, Serialize};

/// Body of `POST /setKv` and `POST /updateKv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValueBody {
    pub key: String,
    pub value: String,
}

/// Body of `POST /deleteKv` and `POST /searchKv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBody {
    pub key: String,
}

pub fn set_kv_route() -> &'static str {
    "/setKv"
}

pub fn update_kv_route() -> &'static str {
    "/updateKv"
}

pub fn delete_kv_route() -> &'static str {
    "/deleteKv"
}

pub fn search_kv_route() -> &'static str {
    "/searchKv"
}

pub fn get_all_route() -> &'static str {
    "/api/getAll"
}
