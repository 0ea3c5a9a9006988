use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// User-scoped secret consumed by executors that call external providers.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Credential {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub value: String,
    pub timestamp: i64,
}

impl DbCollectionIden for Credential {
    fn iden() -> StoreIden {
        StoreIden::Credentials
    }
}
