//! Integration tests for events

#[cfg(test)]
mod tests {
    use npmirror_errors::RunError;
    use npmirror_events::*;
    use npmirror_types::RunPhase;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_emitter_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_debug("test debug");

        let first = rx.recv().await.unwrap();
        assert!(matches!(first.event, AppEvent::General(GeneralEvent::Error { .. })));
        assert_eq!(first.meta.level, EventLevel::Error);
        assert_eq!(first.meta.source, EventSource::GENERAL);

        let second = rx.recv().await.unwrap();
        assert!(matches!(second.event, AppEvent::General(GeneralEvent::DebugLog { .. })));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[tokio::test]
    async fn test_correlated_run_failure() {
        let (tx, mut rx) = channel();
        let run_id = Uuid::new_v4();
        let error = RunError::TimedOut { seconds: 30 };

        tx.emit_correlated(
            AppEvent::Run(RunEvent::Failed {
                run_id,
                phase: RunPhase::Fetching,
                failure: FailureContext::from_error(&error),
            }),
            run_id.to_string(),
        );

        let message = rx.recv().await.unwrap();
        assert_eq!(message.meta.correlation_id, Some(run_id.to_string()));
        assert_eq!(message.meta.level, EventLevel::Error);
        assert_eq!(message.meta.source, EventSource::RUN);
        assert_eq!(message.event.log_target(), "npmirror::events::run");
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = AppEvent::Schedule(ScheduleEvent::Stopped { runs: 3 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "schedule");
        assert_eq!(json["event"]["type"], "Stopped");
        assert_eq!(json["event"]["runs"], 3);
    }
}
