use std::sync::Arc;

use application::ChatService;
use domain::repositories::UserRepository;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn new(chat_service: Arc<ChatService>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            chat_service,
            users,
        }
    }
}
