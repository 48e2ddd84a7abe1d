//! Incremental parsing of `claude --output-format stream-json` events.
//!
//! The CLI emits one JSON object per line: `system` (session metadata),
//! `assistant`/`user` (turn content), and a final `result` event carrying
//! cumulative cost and the session's last text answer. Only the handful
//! of fields the supervisor cares about are read; everything else in the
//! event is ignored rather than modeled.

use uuid::Uuid;

/// Running state accumulated while draining a session's event stream.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    pub cost_usd: f64,
    pub num_turns: u32,
    pub session_id: Option<Uuid>,
    pub final_text: String,
}

/// Fold one decoded JSON event into `outcome`. Unrecognized event types,
/// or events missing the fields this driver reads, are no-ops.
pub fn apply_event(outcome: &mut SessionOutcome, event: &serde_json::Value) {
    let Some(event_type) = event.get("type").and_then(|v| v.as_str()) else {
        return;
    };

    match event_type {
        "system" => {
            if outcome.session_id.is_none() {
                if let Some(id) = event.get("session_id").and_then(|v| v.as_str()) {
                    outcome.session_id = Uuid::parse_str(id).ok();
                }
            }
        }
        "assistant" => {
            outcome.num_turns += 1;
        }
        "result" => {
            if let Some(cost) = event.get("total_cost_usd").and_then(serde_json::Value::as_f64) {
                outcome.cost_usd = cost;
            }
            if let Some(turns) = event.get("num_turns").and_then(serde_json::Value::as_u64) {
                outcome.num_turns = turns as u32;
            }
            if let Some(text) = event.get("result").and_then(|v| v.as_str()) {
                outcome.final_text = text.to_string();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_events_increment_turn_count() {
        let mut outcome = SessionOutcome::default();
        apply_event(&mut outcome, &serde_json::json!({"type": "assistant"}));
        apply_event(&mut outcome, &serde_json::json!({"type": "assistant"}));
        assert_eq!(outcome.num_turns, 2);
    }

    #[test]
    fn result_event_captures_cost_and_final_text() {
        let mut outcome = SessionOutcome::default();
        apply_event(
            &mut outcome,
            &serde_json::json!({
                "type": "result",
                "total_cost_usd": 0.42,
                "num_turns": 3,
                "result": "{\"ok\":true}",
            }),
        );
        assert_eq!(outcome.cost_usd, 0.42);
        assert_eq!(outcome.num_turns, 3);
        assert_eq!(outcome.final_text, "{\"ok\":true}");
    }

    #[test]
    fn system_event_with_invalid_session_id_is_ignored() {
        let mut outcome = SessionOutcome::default();
        apply_event(&mut outcome, &serde_json::json!({"type": "system", "session_id": "not-a-uuid"}));
        assert!(outcome.session_id.is_none());
    }

    #[test]
    fn unrecognized_event_type_is_a_no_op() {
        let mut outcome = SessionOutcome::default();
        apply_event(&mut outcome, &serde_json::json!({"type": "content_block_delta"}));
        assert_eq!(outcome.num_turns, 0);
        assert_eq!(outcome.cost_usd, 0.0);
    }
}
