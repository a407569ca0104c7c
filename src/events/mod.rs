use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{DeviceStatus, OutwardType, QcResult, SpecialistKind};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Events are emitted after the database commit, so a closed channel is
    /// logged rather than failing the request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping domain event");
        }
    }
}

/// Domain events emitted by the workstation services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Inward events
    BatchReceived {
        batch_id: Uuid,
        batch_number: String,
        device_count: usize,
    },
    PurchaseOrderCreated(Uuid),
    PurchaseOrderClosed(Uuid),

    // Device lifecycle
    DeviceStatusChanged {
        device_id: Uuid,
        from: Option<DeviceStatus>,
        to: DeviceStatus,
        action: String,
    },
    InspectionSubmitted {
        device_id: Uuid,
        inspection_id: Uuid,
        next_status: DeviceStatus,
    },

    // Repair and specialist events
    RepairJobCreated {
        job_id: Uuid,
        device_id: Uuid,
        is_rework: bool,
    },
    RepairJobCompleted {
        job_id: Uuid,
        device_id: Uuid,
    },
    SpecialistJobCreated {
        job_id: Uuid,
        kind: SpecialistKind,
    },
    SpecialistJobCompleted {
        job_id: Uuid,
        kind: SpecialistKind,
        repaired: bool,
    },

    // Paint shop
    PaintCompleted(Uuid),

    // QC
    QcSubmitted {
        device_id: Uuid,
        result: QcResult,
    },

    // Spares
    SparesIssued {
        repair_job_id: Uuid,
        lines: usize,
    },
    SpareStockChanged {
        part_id: Uuid,
        part_code: String,
        old_quantity: i32,
        new_quantity: i32,
    },
    LowStock {
        part_id: Uuid,
        part_code: String,
        current_stock: i32,
        min_stock_level: i32,
    },

    // Outward
    OutwardDispatched {
        outward_id: Uuid,
        outward_type: OutwardType,
        device_count: usize,
    },

    AttachmentUploaded {
        device_id: Uuid,
        attachment_id: Uuid,
    },

    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

/// Drains the event channel. Events are written to the log; low-stock and
/// scrap events are raised at `warn`.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStock {
                part_code,
                current_stock,
                min_stock_level,
                ..
            } => {
                warn!(
                    part_code = %part_code,
                    current_stock,
                    min_stock_level,
                    "spare part at or below minimum stock"
                );
            }
            Event::QcSubmitted {
                device_id,
                result: QcResult::FailedScrap,
            } => {
                warn!(%device_id, "device scrapped at QC");
            }
            Event::DeviceStatusChanged {
                device_id,
                from,
                to,
                action,
            } => {
                info!(
                    %device_id,
                    from = from.map(|s| s.to_string()).unwrap_or_default(),
                    to = %to,
                    action = %action,
                    "device status changed"
                );
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }

    warn!("Event processing loop has ended");
}
