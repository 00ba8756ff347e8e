use std::sync::Arc;

use resdesk_core::ReservationRepository;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn ReservationRepository>,
    pub default_page_size: u32,
}

impl AppState {
    pub fn new(repository: Arc<dyn ReservationRepository>, default_page_size: u32) -> Self {
        Self {
            repository,
            default_page_size,
        }
    }
}
