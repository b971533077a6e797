use std::sync::Arc;

use axum::extract::FromRef;
use lectern_collab::{Classroom, MediaStore};

use crate::gateway::Gateway;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub classroom: Arc<Classroom>,
    pub gateway: Arc<Gateway>,
    pub media: Arc<dyn MediaStore>,
}
