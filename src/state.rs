use std::sync::Arc;

use sqlx::PgPool;

use crate::accounts::AccountRegistry;
use crate::attachments::AttachmentStager;
use crate::config::Config;
use crate::dispatch::DispatchEngine;
use crate::resolver::ConfigResolver;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub registry: AccountRegistry,
    pub resolver: ConfigResolver,
    pub stager: AttachmentStager,
    pub engine: DispatchEngine,
}
