use std::{
    any::Any,
    collections::HashMap,
    convert::AsRef,
    sync::{Arc, RwLock},
};

use tracing::trace;

use crate::{FlowbaseError, Result, ShareLock, model::WorkflowModel, utils};

use super::{DbCollection, DbCollectionIden, DbStore, StoreIden, data::*, db::MemStore};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

/// Typed registry of storage collections.
///
/// Backends register their collections at init; callers get typed handles
/// through the named accessors.
pub struct Store {
    collections: ShareLock<HashMap<StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// An in-memory store with all collections registered.
    pub fn mem() -> Self {
        let store = Self::new();
        MemStore::new().init(&store);
        store
    }

    pub fn collection<DATA>(&self) -> Arc<dyn DbCollection<Item = DATA>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().unwrap();

        #[allow(clippy::expect_fun_call)]
        let collection = collections.get(&DATA::iden()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()));

        #[allow(clippy::expect_fun_call)]
        collection.downcast_ref::<DynDbSetRef<DATA>>().map(|v| v.0.clone()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()))
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) where
        DATA: DbCollectionIden + 'static,
    {
        let mut collections = self.collections.write().unwrap();
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
    }

    pub fn workflows(&self) -> Arc<dyn DbCollection<Item = Workflow>> {
        self.collection()
    }

    pub fn executions(&self) -> Arc<dyn DbCollection<Item = Execution>> {
        self.collection()
    }

    pub fn node_runs(&self) -> Arc<dyn DbCollection<Item = NodeRun>> {
        self.collection()
    }

    pub fn steps(&self) -> Arc<dyn DbCollection<Item = StepResult>> {
        self.collection()
    }

    pub fn credentials(&self) -> Arc<dyn DbCollection<Item = Credential>> {
        self.collection()
    }

    pub fn events(&self) -> Arc<dyn DbCollection<Item = EventRecord>> {
        self.collection()
    }

    /// Create or update the stored definition of a workflow.
    pub fn deploy(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<bool> {
        trace!("store::deploy({})", workflow.id);
        if workflow.id.is_empty() {
            return Err(FlowbaseError::Workflow("missing id in workflow".into()));
        }
        let workflows = self.workflows();
        match workflows.find(&workflow.id) {
            Ok(m) => {
                let text = serde_json::to_string(workflow)?;
                let data = Workflow {
                    id: workflow.id.clone(),
                    name: workflow.name.clone(),
                    user_id: workflow.user_id.clone(),
                    data: text,
                    create_time: m.create_time,
                    update_time: utils::time::time_millis(),
                };
                workflows.update(&data)
            }
            Err(_) => {
                let text = serde_json::to_string(workflow)?;
                let data = Workflow {
                    id: workflow.id.clone(),
                    name: workflow.name.clone(),
                    user_id: workflow.user_id.clone(),
                    data: text,
                    create_time: utils::time::time_millis(),
                    update_time: 0,
                };
                workflows.create(&data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkflowModel;

    #[test]
    fn test_deploy_creates_then_updates() {
        let store = Store::mem();
        let mut model = WorkflowModel {
            id: "w1".to_string(),
            name: "first".to_string(),
            user_id: "u1".to_string(),
            nodes: vec![],
            connections: vec![],
        };

        assert!(store.deploy(&model).unwrap());
        let row = store.workflows().find("w1").unwrap();
        assert_eq!(row.name, "first");
        assert_eq!(row.update_time, 0);

        model.name = "second".to_string();
        assert!(store.deploy(&model).unwrap());
        let row = store.workflows().find("w1").unwrap();
        assert_eq!(row.name, "second");
        assert!(row.update_time > 0);
    }

    #[test]
    fn test_deploy_rejects_missing_id() {
        let store = Store::mem();
        let model = WorkflowModel::default();
        assert!(store.deploy(&model).is_err());
    }
}
