use crate::Result;
use sim_client::MultirotorClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Connection, API control and arming for the lifetime of a flight.
pub struct FlightSession {
    client: Arc<dyn MultirotorClient>,
    open: AtomicBool,
}

impl FlightSession {
    pub fn open(client: Arc<dyn MultirotorClient>) -> Result<Self> {
        client.confirm_connection()?;
        client.enable_api_control(true)?;
        if !client.arm_disarm(true)? {
            warn!("vehicle did not report armed");
        }
        info!("flight session open");
        Ok(Self {
            client,
            open: AtomicBool::new(true),
        })
    }

    pub fn client(&self) -> Arc<dyn MultirotorClient> {
        Arc::clone(&self.client)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Disarm and release API control. Later calls do nothing.
    pub fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let disarmed = self.client.arm_disarm(false);
        let released = self.client.enable_api_control(false);
        info!("flight session closed");
        disarmed?;
        released?;
        Ok(())
    }
}

impl Drop for FlightSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("closing flight session: {}", e);
        }
    }
}
