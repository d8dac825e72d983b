use std::sync::Arc;

use prov_provider::Provider;
use prov_store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub provider: Arc<dyn Provider>,
    pub auth_token: Arc<String>,
}
