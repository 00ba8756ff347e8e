pub mod app_config;
pub mod dto;
pub mod http_repo;
pub mod mapping;
pub mod memory_repo;
pub mod seed;
pub mod transport;

use std::sync::Arc;

use resdesk_core::{ReservationError, ReservationRepository, ReservationResult};

pub use app_config::{Config, RepositoryConfig, RepositoryMode};
pub use http_repo::HttpReservationRepository;
pub use memory_repo::InMemoryReservationRepository;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// Pick the repository implementation named by configuration.
pub fn build_repository(
    config: &RepositoryConfig,
    default_page_size: u32,
) -> ReservationResult<Arc<dyn ReservationRepository>> {
    match config.mode {
        RepositoryMode::Memory => {
            let mut repo =
                InMemoryReservationRepository::seeded().with_default_page_size(default_page_size);
            if let Some(latency) = config.latency() {
                repo = repo.with_latency(latency);
            }
            tracing::info!("Using in-memory reservation repository");
            Ok(Arc::new(repo))
        }
        RepositoryMode::Http => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                ReservationError::Validation("repository.base_url is required in http mode".to_string())
            })?;
            let transport = ReqwestTransport::new(base_url, config.request_timeout())?;
            tracing::info!(base_url, "Using admin API reservation repository");
            Ok(Arc::new(HttpReservationRepository::new(Arc::new(transport))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resdesk_core::ListParams;

    #[tokio::test]
    async fn test_build_memory_repository() {
        let config = RepositoryConfig::default();
        let repo = build_repository(&config, 2).unwrap();
        let page = repo.list(&ListParams::default()).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[test]
    fn test_http_mode_requires_base_url() {
        let config = RepositoryConfig {
            mode: RepositoryMode::Http,
            ..RepositoryConfig::default()
        };
        assert!(matches!(
            build_repository(&config, 20),
            Err(ReservationError::Validation(_))
        ));
    }
}
