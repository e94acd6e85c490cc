//! Lifecycle events emitted while typesetting.
//!
//! Events go out over an optional `mpsc::Sender`, the same channel shape the
//! site build uses for progress. The detail payload is free-form JSON so each
//! event can carry what is useful to a listener (element name, counts).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    BeforeProcessAll,
    AfterProcessAll,
    BeforeProcess,
    AfterProcess,
    BeforeRefresh,
    AfterRefresh,
    ObserverStarted,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::BeforeProcessAll => "beforeProcessAll",
            EventKind::AfterProcessAll => "afterProcessAll",
            EventKind::BeforeProcess => "beforeProcess",
            EventKind::AfterProcess => "afterProcess",
            EventKind::BeforeRefresh => "beforeRefresh",
            EventKind::AfterRefresh => "afterRefresh",
            EventKind::ObserverStarted => "observerStarted",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypographyEvent {
    pub kind: EventKind,
    pub detail: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl TypographyEvent {
    pub fn new(kind: EventKind, detail: serde_json::Value) -> Self {
        Self {
            kind,
            detail,
            timestamp: Utc::now(),
        }
    }
}

/// Send if there is a listener. A dropped receiver is not an error.
pub(crate) fn emit(
    tx: Option<&Sender<TypographyEvent>>,
    kind: EventKind,
    detail: serde_json::Value,
) {
    if let Some(tx) = tx {
        log::trace!("event {}", kind.name());
        tx.send(TypographyEvent::new(kind, detail)).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc;

    #[test]
    fn kind_names_match_serialized_form() {
        for kind in [
            EventKind::BeforeProcessAll,
            EventKind::AfterProcess,
            EventKind::ObserverStarted,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.name()));
        }
    }

    #[test]
    fn emit_delivers_and_tolerates_no_listener() {
        let (tx, rx) = mpsc::channel();
        emit(Some(&tx), EventKind::BeforeRefresh, json!({"n": 1}));
        let event = rx.recv().unwrap();
        assert_eq!(event.kind, EventKind::BeforeRefresh);
        assert_eq!(event.detail["n"], 1);

        drop(rx);
        emit(Some(&tx), EventKind::AfterRefresh, json!(null));
        emit(None, EventKind::AfterRefresh, json!(null));
    }
}
