use crate::config::Config;

/// Who is using the timer. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub user_id: String,
    pub display_name: String,
    pub auth_token: String,
}

impl UserContext {
    pub fn from_config(config: &Config) -> Self {
        UserContext {
            user_id: config.user_id.clone(),
            display_name: config.user_name.clone(),
            auth_token: config.api_token.clone(),
        }
    }
}
