use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::EventRecord, db::mem::DbDocument},
};

impl DbDocument for EventRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("eid".to_string(), json!(self.eid.clone()));
        map.insert("nid".to_string(), json!(self.nid.clone()));
        map.insert("name".to_string(), json!(self.name.clone()));
        map.insert("timestamp".to_string(), json!(self.timestamp));
        Ok(map)
    }
}
