use std::fmt;

use services::AppServices;

#[derive(Clone)]
pub struct ApiState {
    pub services: AppServices,
}

impl ApiState {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState").finish_non_exhaustive()
    }
}
