//! Analytics sinks
//!
//! Telemetry is fire-and-forget: sinks never report back and a failing sink
//! only logs.

use crate::sim::TelemetryEvent;

pub trait TelemetrySink {
    fn record(&mut self, event: &TelemetryEvent);

    fn record_all(&mut self, events: &[TelemetryEvent]) {
        for event in events {
            self.record(event);
        }
    }
}

/// Writes events to the log at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn record(&mut self, event: &TelemetryEvent) {
        match serde_json::to_string(event) {
            Ok(json) => log::debug!("analytics {json}"),
            Err(e) => log::warn!("Unserializable telemetry {}: {e}", event.kind.name()),
        }
    }
}

/// Dispatches an `analytics` CustomEvent on `window` with the event as `detail`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowTelemetry;

#[cfg(target_arch = "wasm32")]
impl TelemetrySink for WindowTelemetry {
    fn record(&mut self, event: &TelemetryEvent) {
        let Ok(json) = serde_json::to_string(event) else {
            return;
        };
        let Ok(detail) = js_sys::JSON::parse(&json) else {
            return;
        };
        let init = web_sys::CustomEventInit::new();
        init.set_detail(&detail);
        let Ok(custom) = web_sys::CustomEvent::new_with_event_init_dict("analytics", &init) else {
            return;
        };
        if let Some(window) = web_sys::window() {
            let _ = window.dispatch_event(&custom);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::TelemetryKind;

    struct Collect(Vec<&'static str>);

    impl TelemetrySink for Collect {
        fn record(&mut self, event: &TelemetryEvent) {
            self.0.push(event.kind.name());
        }
    }

    #[test]
    fn test_record_all_preserves_order() {
        let events = [
            TelemetryEvent {
                timestamp: 1.0,
                kind: TelemetryKind::BoostStart { duration_ms: 5000.0 },
            },
            TelemetryEvent {
                timestamp: 2.0,
                kind: TelemetryKind::BoostEnd,
            },
        ];
        let mut sink = Collect(Vec::new());
        sink.record_all(&events);
        assert_eq!(sink.0, ["boostStart", "boostEnd"]);
        // Log sink accepts everything without panicking
        LogTelemetry.record_all(&events);
    }
}
