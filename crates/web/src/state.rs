use arena_storage::Arena;

use crate::middleware::auth::ApiKeys;

#[derive(Clone)]
pub struct AppState {
    pub arena: Arena,
    pub api_keys: ApiKeys,
}

impl AppState {
    pub fn new(arena: Arena, api_keys: ApiKeys) -> Self {
        Self { arena, api_keys }
    }
}
