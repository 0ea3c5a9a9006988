use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};

use serde_json::Value as JsonValue;

use crate::{
    FlowbaseError, Result, ShareLock,
    store::{DbCollection, PageData, query::Query},
};

use super::DbDocument;

/// One in-memory collection keyed by record id.
pub struct Collect<T> {
    name: String,
    rows: ShareLock<HashMap<String, T>>,
}

impl<T> fmt::Debug for Collect<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Collect").field("name", &self.name).finish()
    }
}

impl<T> Collect<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument + Clone + Send + Sync,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        let rows = self.rows.read().unwrap();
        Ok(rows.contains_key(id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        let rows = self.rows.read().unwrap();
        rows.get(id)
            .cloned()
            .ok_or_else(|| FlowbaseError::Store(format!("cannot find {} by id {}", self.name, id)))
    }

    fn query(
        &self,
        q: &Query,
    ) -> Result<PageData<Self::Item>> {
        let rows = self.rows.read().unwrap();

        let mut matched: Vec<(T, HashMap<String, JsonValue>)> = Vec::new();
        for row in rows.values() {
            let doc = row.doc()?;
            let hit = q.filters().iter().all(|(key, value)| doc.get(key) == Some(value));
            if hit {
                matched.push((row.clone(), doc));
            }
        }

        // Stable order even without an explicit order_by.
        matched.sort_by(|(a, da), (b, db)| {
            for (key, rev) in q.order_by() {
                let ord = cmp_json(da.get(key), db.get(key));
                let ord = if *rev { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.id().cmp(b.id())
        });

        let count = matched.len();
        let page_count = count.div_ceil(q.limit());
        let page_num = q.offset() / q.limit() + 1;
        let rows = matched.into_iter().skip(q.offset()).take(q.limit()).map(|(row, _)| row).collect();

        Ok(PageData {
            count,
            page_num,
            page_count,
            page_size: q.limit(),
            rows,
        })
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let mut rows = self.rows.write().unwrap();
        if rows.contains_key(data.id()) {
            return Err(FlowbaseError::Store(format!("{} id {} already exists", self.name, data.id())));
        }
        rows.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let mut rows = self.rows.write().unwrap();
        if !rows.contains_key(data.id()) {
            return Err(FlowbaseError::Store(format!("cannot find {} by id {}", self.name, data.id())));
        }
        rows.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        let mut rows = self.rows.write().unwrap();
        Ok(rows.remove(id).is_some())
    }
}

fn cmp_json(
    a: Option<&JsonValue>,
    b: Option<&JsonValue>,
) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
