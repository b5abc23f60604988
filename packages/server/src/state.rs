use std::sync::Arc;

use mq::TaskPublisher;

use crate::battle::BattleService;
use crate::config::AppConfig;
use crate::consumers::LocalJudge;
use crate::relay::Relay;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub relay: Arc<Relay>,
    pub battles: BattleService,
    /// Job queue publisher. `None` means judging runs in-process.
    pub mq: Option<Arc<dyn TaskPublisher>>,
    pub local_judge: Arc<LocalJudge>,
    pub config: Arc<AppConfig>,
}
