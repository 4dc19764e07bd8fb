//! Control plane backed by the local config file.

use anyhow::Result;
use async_trait::async_trait;
use fibgrid_core::params::Parameters;
use fibgrid_core::traits::ControlPlane;
use fibgrid_core::types::PositionRecord;
use rust_decimal::Decimal;

/// Serves the config's `[parameters]` table and folds all feedback into the
/// process log. Stands in for a remote strategy console when running against
/// the paper venue.
pub struct LocalControlPlane {
    params: Parameters,
}

impl LocalControlPlane {
    #[must_use]
    pub fn new(params: Parameters) -> Self {
        Self { params }
    }
}

#[async_trait]
impl ControlPlane for LocalControlPlane {
    async fn fetch_enabled(&self) -> Result<bool> {
        Ok(true)
    }

    async fn fetch_parameters(&self) -> Result<Parameters> {
        Ok(self.params.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn send_log(&self, text: &str) -> Result<()> {
        tracing::info!("[operator] {}", text);
        Ok(())
    }

    async fn push_balance(&self, balance: Decimal) -> Result<()> {
        tracing::debug!("Balance feedback: {}", balance);
        Ok(())
    }

    async fn push_positions(&self, positions: &[PositionRecord]) -> Result<()> {
        tracing::debug!("Position feedback: {:?}", positions);
        Ok(())
    }
}
